//! CSV ingestion/validation pipeline for bulk question upload.
//!
//! The pipeline: tokenize (quoted fields, doubled-quote escapes, embedded
//! delimiters and newlines, any of `\r\n`/`\n`/`\r` as row endings) →
//! validate required headers → map body rows by header position →
//! validate each row → produce insertable records plus a short preview.
//!
//! Uploads are all-or-nothing: any invalid row fails the whole batch and
//! nothing is inserted.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::domain::{MmiDraft, NewMmi, NewUcat, UcatDraft};

pub const REQUIRED_MMI_HEADERS: [&str; 2] = ["question", "answer"];
pub const REQUIRED_UCAT_HEADERS: [&str; 8] = [
  "question",
  "answer1",
  "answer2",
  "answer3",
  "answer4",
  "answer5",
  "correct_answer",
  "type",
];

/// How many mapped rows the upload preview includes.
const PREVIEW_ROWS: usize = 4;

/// A body row keyed by normalized header name.
pub type MappedRow = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowError {
  /// 1-based position among the body rows.
  pub row: usize,
  pub message: String,
}

#[derive(Debug, Error)]
pub enum IngestError {
  #[error("CSV file is empty.")]
  EmptyFile,
  #[error("Missing headers: {}", .0.join(", "))]
  MissingHeaders(Vec<String>),
  #[error("No data rows found.")]
  NoDataRows,
  #[error("{}", render_row_errors(.0))]
  InvalidRows(Vec<RowError>),
  #[error("Could not parse CSV: {0}")]
  Csv(#[from] csv::Error),
}

fn render_row_errors(errors: &[RowError]) -> String {
  errors
    .iter()
    .map(|e| format!("Row {}: {}", e.row, e.message))
    .collect::<Vec<_>>()
    .join("; ")
}

#[derive(Debug)]
pub struct IngestReport<T> {
  pub records: Vec<T>,
  /// First few mapped rows, shown back to the uploader.
  pub preview: Vec<MappedRow>,
}

/// Tokenize raw CSV text into trimmed rows, dropping rows whose cells are
/// all empty. The first surviving row is the header row.
pub fn parse_rows(text: &str) -> Result<Vec<Vec<String>>, IngestError> {
  let mut reader = csv::ReaderBuilder::new()
    .has_headers(false)
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(text.as_bytes());

  let mut rows = Vec::new();
  for record in reader.records() {
    let record = record?;
    let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
    if cells.iter().any(|c| !c.is_empty()) {
      rows.push(cells);
    }
  }
  Ok(rows)
}

/// Header lookup: normalized name → column index. Duplicate headers take
/// the last occurrence.
fn header_index(header_row: &[String]) -> HashMap<String, usize> {
  let mut index = HashMap::new();
  for (i, name) in header_row.iter().enumerate() {
    index.insert(name.trim().to_lowercase(), i);
  }
  index
}

fn missing_headers(index: &HashMap<String, usize>, required: &[&str]) -> Vec<String> {
  required
    .iter()
    .filter(|h| !index.contains_key(**h))
    .map(|h| h.to_string())
    .collect()
}

/// Map body rows to header-keyed records, keeping only rows with at least
/// one non-empty value. Absent cells read as empty strings.
fn map_rows(
  body: &[Vec<String>],
  index: &HashMap<String, usize>,
) -> Vec<MappedRow> {
  body
    .iter()
    .map(|cells| {
      index
        .iter()
        .map(|(header, &col)| {
          let value = cells.get(col).cloned().unwrap_or_default();
          (header.clone(), value)
        })
        .collect::<MappedRow>()
    })
    .filter(|row| row.values().any(|v| !v.trim().is_empty()))
    .collect()
}

fn get<'a>(row: &'a MappedRow, key: &str) -> &'a str {
  row.get(key).map(String::as_str).unwrap_or("")
}

/// Parse and validate an MMI CSV upload.
pub fn ingest_mmi(text: &str) -> Result<IngestReport<NewMmi>, IngestError> {
  let rows = parse_rows(text)?;
  let Some((header_row, body)) = rows.split_first() else {
    return Err(IngestError::EmptyFile);
  };

  let index = header_index(header_row);
  let missing = missing_headers(&index, &REQUIRED_MMI_HEADERS);
  if !missing.is_empty() {
    return Err(IngestError::MissingHeaders(missing));
  }

  let mapped = map_rows(body, &index);
  if mapped.is_empty() {
    return Err(IngestError::NoDataRows);
  }

  let mut records = Vec::with_capacity(mapped.len());
  let mut errors = Vec::new();
  for (i, row) in mapped.iter().enumerate() {
    let draft = MmiDraft {
      question: get(row, "question").to_string(),
      answer: get(row, "answer").to_string(),
    };
    match draft.validate() {
      Ok(record) => records.push(record),
      Err(e) => errors.push(RowError { row: i + 1, message: e.to_string() }),
    }
  }
  if !errors.is_empty() {
    return Err(IngestError::InvalidRows(errors));
  }

  let preview = mapped.into_iter().take(PREVIEW_ROWS).collect();
  Ok(IngestReport { records, preview })
}

/// Parse and validate a UCAT CSV upload.
pub fn ingest_ucat(text: &str) -> Result<IngestReport<NewUcat>, IngestError> {
  let rows = parse_rows(text)?;
  let Some((header_row, body)) = rows.split_first() else {
    return Err(IngestError::EmptyFile);
  };

  let index = header_index(header_row);
  let missing = missing_headers(&index, &REQUIRED_UCAT_HEADERS);
  if !missing.is_empty() {
    return Err(IngestError::MissingHeaders(missing));
  }

  let mapped = map_rows(body, &index);
  if mapped.is_empty() {
    return Err(IngestError::NoDataRows);
  }

  let mut records = Vec::with_capacity(mapped.len());
  let mut errors = Vec::new();
  for (i, row) in mapped.iter().enumerate() {
    match ucat_row_to_record(row) {
      Ok(record) => records.push(record),
      Err(message) => errors.push(RowError { row: i + 1, message }),
    }
  }
  if !errors.is_empty() {
    return Err(IngestError::InvalidRows(errors));
  }

  let preview = mapped.into_iter().take(PREVIEW_ROWS).collect();
  Ok(IngestReport { records, preview })
}

fn ucat_row_to_record(row: &MappedRow) -> Result<NewUcat, String> {
  let correct_raw = get(row, "correct_answer").trim();
  let correct: u8 = correct_raw
    .parse()
    .map_err(|_| "Correct answer must be a number within the options provided.".to_string())?;

  let draft = UcatDraft {
    question: get(row, "question").to_string(),
    options: (1..=5)
      .map(|n| get(row, &format!("answer{n}")).to_string())
      .collect(),
    correct_answer: correct,
    section: get(row, "type").to_string(),
  };
  draft.validate().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::UcatSection;

  #[test]
  fn tokenizer_honors_quotes_delimiters_and_newlines() {
    let text = "a,\"b,with comma\",\"line\nbreak\"\r\nnext,\"he said \"\"hi\"\"\",end\r";
    let rows = parse_rows(text).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["a", "b,with comma", "line\nbreak"]);
    assert_eq!(rows[1], vec!["next", "he said \"hi\"", "end"]);
  }

  #[test]
  fn trailing_newline_produces_no_phantom_row() {
    let rows = parse_rows("question,answer\nq1,a1\n").unwrap();
    assert_eq!(rows.len(), 2);
  }

  #[test]
  fn all_empty_rows_are_dropped() {
    let rows = parse_rows("question,answer\n,,\nq1,a1\n , \n").unwrap();
    assert_eq!(rows.len(), 2);
  }

  #[test]
  fn empty_input_is_reported() {
    assert!(matches!(ingest_mmi(""), Err(IngestError::EmptyFile)));
    assert!(matches!(ingest_mmi("\n\n"), Err(IngestError::EmptyFile)));
  }

  #[test]
  fn missing_headers_are_listed() {
    let err = ingest_ucat("question,answer1\nq,a").unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("Missing headers: "));
    assert!(msg.contains("answer2"));
    assert!(msg.contains("correct_answer"));
    assert!(msg.contains("type"));
  }

  #[test]
  fn header_only_file_has_no_data_rows() {
    assert!(matches!(
      ingest_mmi("question,answer"),
      Err(IngestError::NoDataRows)
    ));
  }

  #[test]
  fn headers_match_case_insensitively_and_extras_are_ignored() {
    let report = ingest_mmi("  Question , ANSWER ,notes\nq1,a1,ignored").unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].question, "q1");
    assert_eq!(report.records[0].answer, "a1");
  }

  #[test]
  fn mmi_rows_missing_an_answer_fail_with_row_numbers() {
    let err = ingest_mmi("question,answer\nq1,a1\nq2,\nq3,a3\n,a4").unwrap_err();
    let IngestError::InvalidRows(rows) = err else {
      panic!("expected InvalidRows");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].row, 2);
    assert_eq!(rows[1].row, 4);
    assert_eq!(rows[0].message, "Add both a question and model answer.");
  }

  #[test]
  fn valid_ucat_upload_maps_records_and_preview() {
    let text = "question,answer1,answer2,answer3,answer4,answer5,correct_answer,type\n\
                q1,a,b,c,,,2,vr\n\
                q2,yes,no,,,,1,SJT";
    let report = ingest_ucat(text).unwrap();
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].correct_answer, 2);
    assert_eq!(report.records[0].section, UcatSection::Vr);
    assert_eq!(report.records[0].answer4, None);
    assert_eq!(report.records[1].section, UcatSection::Sjt);
    assert_eq!(report.preview.len(), 2);
    assert_eq!(report.preview[0].get("question").unwrap(), "q1");
  }

  #[test]
  fn preview_caps_at_four_rows() {
    let mut text = String::from("question,answer\n");
    for i in 0..6 {
      text.push_str(&format!("q{i},a{i}\n"));
    }
    let report = ingest_mmi(&text).unwrap();
    assert_eq!(report.records.len(), 6);
    assert_eq!(report.preview.len(), 4);
  }

  #[test]
  fn invalid_ucat_rows_abort_the_whole_batch() {
    let text = "question,answer1,answer2,answer3,answer4,answer5,correct_answer,type\n\
                q1,a,b,,,,5,vr\n\
                q2,a,b,,,,not-a-number,qr\n\
                q3,a,b,,,,1,nope";
    let err = ingest_ucat(text).unwrap_err();
    let IngestError::InvalidRows(rows) = err else {
      panic!("expected InvalidRows");
    };
    assert_eq!(rows.len(), 3);
    assert_eq!(
      rows[0].message,
      "Correct answer must be a number within the options provided."
    );
    assert_eq!(
      rows[1].message,
      "Correct answer must be a number within the options provided."
    );
    assert!(rows[2].message.contains("Unknown UCAT section code"));
  }

  #[test]
  fn duplicate_headers_take_the_last_occurrence() {
    let report = ingest_mmi("question,answer,question\nignored,a1,q1").unwrap();
    assert_eq!(report.records[0].question, "q1");
  }
}
