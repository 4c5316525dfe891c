//! Domain models: question rows as stored in the bank, UCAT sections, and
//! validated submission drafts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One MMI prompt with its model answer. Columns are nullable in the store,
/// so both text fields stay optional here.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MmiQuestion {
  pub id: i64,
  pub question: Option<String>,
  pub answer: Option<String>,
}

/// The four UCAT sections. Wire codes are the upper-case short forms the
/// store and the frontend use; parsing accepts any casing.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum UcatSection {
  Vr,
  Dm,
  Qr,
  Sjt,
}

impl UcatSection {
  pub const ALL: [UcatSection; 4] = [
    UcatSection::Vr,
    UcatSection::Dm,
    UcatSection::Qr,
    UcatSection::Sjt,
  ];

  pub fn code(&self) -> &'static str {
    match self {
      UcatSection::Vr => "VR",
      UcatSection::Dm => "DM",
      UcatSection::Qr => "QR",
      UcatSection::Sjt => "SJT",
    }
  }
}

impl fmt::Display for UcatSection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

impl FromStr for UcatSection {
  type Err = DraftError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "VR" => Ok(UcatSection::Vr),
      "DM" => Ok(UcatSection::Dm),
      "QR" => Ok(UcatSection::Qr),
      "SJT" => Ok(UcatSection::Sjt),
      "" => Err(DraftError::MissingSection),
      other => Err(DraftError::UnknownSection(other.to_string())),
    }
  }
}

impl<'de> Deserialize<'de> for UcatSection {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

/// One UCAT multiple-choice question. Options live in five positional
/// columns (`answer1`..`answer5`); unused positions are null.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct UcatQuestion {
  pub id: i64,
  pub question: Option<String>,
  pub answer1: Option<String>,
  pub answer2: Option<String>,
  pub answer3: Option<String>,
  pub answer4: Option<String>,
  pub answer5: Option<String>,
  /// 1-based position of the correct option.
  pub correct_answer: Option<u8>,
  pub section: Option<UcatSection>,
}

impl UcatQuestion {
  pub fn options(&self) -> [Option<&str>; 5] {
    [
      self.answer1.as_deref(),
      self.answer2.as_deref(),
      self.answer3.as_deref(),
      self.answer4.as_deref(),
      self.answer5.as_deref(),
    ]
  }

  /// Text at the 1-based option position, if that slot holds a non-empty
  /// option.
  pub fn option_text(&self, n: u8) -> Option<&str> {
    if !(1..=5).contains(&n) {
      return None;
    }
    self.options()[(n - 1) as usize].filter(|t| !t.trim().is_empty())
  }

  fn filled_option_count(&self) -> usize {
    self
      .options()
      .iter()
      .filter(|o| o.map(|t| !t.trim().is_empty()).unwrap_or(false))
      .count()
  }

  /// A question can enter a quiz session only when it has a prompt, at
  /// least two real options, and a correct answer pointing at one of them.
  pub fn is_answerable(&self) -> bool {
    let has_prompt = self
      .question
      .as_deref()
      .map(|q| !q.trim().is_empty())
      .unwrap_or(false);
    let correct_is_real = self
      .correct_answer
      .map(|n| self.option_text(n).is_some())
      .unwrap_or(false);
    has_prompt && self.filled_option_count() >= 2 && correct_is_real
  }
}

/// Validation failures for submitted questions. Messages are the guidance
/// the submission form shows.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DraftError {
  #[error("Add both a question and model answer.")]
  MmiIncomplete,
  #[error("Add the UCAT question.")]
  MissingQuestion,
  #[error("Add at least two answer options.")]
  TooFewOptions,
  #[error("Correct answer must be a number within the options provided.")]
  CorrectAnswerInvalid,
  #[error("Select the UCAT type.")]
  MissingSection,
  #[error("Unknown UCAT section code: {0}")]
  UnknownSection(String),
}

/// A raw single-question MMI submission, not yet validated.
#[derive(Clone, Debug, Deserialize)]
pub struct MmiDraft {
  pub question: String,
  pub answer: String,
}

/// Insert payload for one MMI row (id is assigned by the store).
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct NewMmi {
  pub question: String,
  pub answer: String,
}

impl MmiDraft {
  pub fn validate(&self) -> Result<NewMmi, DraftError> {
    let question = self.question.trim();
    let answer = self.answer.trim();
    if question.is_empty() || answer.is_empty() {
      return Err(DraftError::MmiIncomplete);
    }
    Ok(NewMmi { question: question.to_string(), answer: answer.to_string() })
  }
}

/// A raw single-question UCAT submission. `section` stays a string until
/// validation so an empty selection reports the form's own message.
#[derive(Clone, Debug, Deserialize)]
pub struct UcatDraft {
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: u8,
  pub section: String,
}

/// Insert payload for one UCAT row. Empty option slots serialize as null,
/// matching the store schema.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct NewUcat {
  pub question: String,
  pub answer1: Option<String>,
  pub answer2: Option<String>,
  pub answer3: Option<String>,
  pub answer4: Option<String>,
  pub answer5: Option<String>,
  pub correct_answer: u8,
  #[serde(rename = "type")]
  pub section: UcatSection,
}

impl UcatDraft {
  pub fn validate(&self) -> Result<NewUcat, DraftError> {
    let question = self.question.trim();
    if question.is_empty() {
      return Err(DraftError::MissingQuestion);
    }
    // Five positional slots; anything past the fifth option is dropped.
    let mut slots: [Option<String>; 5] = Default::default();
    for (i, raw) in self.options.iter().take(5).enumerate() {
      let t = raw.trim();
      if !t.is_empty() {
        slots[i] = Some(t.to_string());
      }
    }
    let filled = slots.iter().filter(|s| s.is_some()).count();
    if filled < 2 {
      return Err(DraftError::TooFewOptions);
    }

    // Positional check: the 1-based index must name a non-empty slot.
    let ok = (1..=5).contains(&self.correct_answer)
      && slots[(self.correct_answer - 1) as usize].is_some();
    if !ok {
      return Err(DraftError::CorrectAnswerInvalid);
    }

    let section: UcatSection = self.section.parse()?;

    let [answer1, answer2, answer3, answer4, answer5] = slots;
    Ok(NewUcat {
      question: question.to_string(),
      answer1,
      answer2,
      answer3,
      answer4,
      answer5,
      correct_answer: self.correct_answer,
      section,
    })
  }
}
