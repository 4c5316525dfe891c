//! The question store: either the remote relational backend (reached over
//! its PostgREST-style REST dialect) or an in-memory bank seeded from
//! `seeds`. Both backends satisfy the same operation contract: rows are
//! ordered by id, indexes are zero-based over that order, and section
//! filters match the wire codes.
//!
//! Remote credentials come from SUPABASE_URL plus
//! SUPABASE_SERVICE_ROLE_KEY or SUPABASE_ANON_KEY (first match wins). With
//! no URL configured we degrade to the in-memory bank and log it.

use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::config::BankConfig;
use crate::domain::{MmiQuestion, NewMmi, NewUcat, UcatQuestion, UcatSection};
use crate::seeds::{seed_mmi, seed_ucat};
use crate::util::truncate_for_log;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("store URL is set but no API key is configured")]
  MissingCredentials,
  #[error("store request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("store replied {status}: {message}")]
  Api { status: u16, message: String },
  #[error("could not decode store response: {0}")]
  Decode(String),
  #[error("store returned an invalid row: {0}")]
  InvalidRow(String),
}

pub enum QuestionStore {
  Remote(RemoteStore),
  Memory(MemoryStore),
}

impl QuestionStore {
  /// Build from env. A configured URL without any key is an error we log
  /// before degrading, so a typo'd deployment is visible at startup.
  pub fn from_env(bank: &BankConfig) -> Self {
    match RemoteStore::from_env(bank) {
      Ok(Some(remote)) => {
        info!(target: "question_bank", base_url = %remote.base_url, mmi_table = %remote.mmi_table, ucat_table = %remote.ucat_table, "Remote question store enabled");
        QuestionStore::Remote(remote)
      }
      Ok(None) => {
        info!(target: "question_bank", "No SUPABASE_URL set; using in-memory seed bank");
        QuestionStore::Memory(MemoryStore::seeded())
      }
      Err(e) => {
        warn!(target: "question_bank", error = %e, "Remote store misconfigured; using in-memory seed bank");
        QuestionStore::Memory(MemoryStore::seeded())
      }
    }
  }

  pub fn backend_name(&self) -> &'static str {
    match self {
      QuestionStore::Remote(_) => "remote",
      QuestionStore::Memory(_) => "memory",
    }
  }

  pub async fn count_mmi(&self) -> Result<u64, StoreError> {
    match self {
      QuestionStore::Remote(s) => s.count_mmi().await,
      QuestionStore::Memory(s) => s.count_mmi().await,
    }
  }

  pub async fn mmi_by_index(&self, index: u64) -> Result<Option<MmiQuestion>, StoreError> {
    match self {
      QuestionStore::Remote(s) => s.mmi_by_index(index).await,
      QuestionStore::Memory(s) => s.mmi_by_index(index).await,
    }
  }

  /// Uniform random row, `None` on an empty bank.
  pub async fn random_mmi(&self) -> Result<Option<MmiQuestion>, StoreError> {
    let count = self.count_mmi().await?;
    if count == 0 {
      return Ok(None);
    }
    let index = rand::thread_rng().gen_range(0..count);
    self.mmi_by_index(index).await
  }

  pub async fn insert_mmi(&self, rows: &[NewMmi]) -> Result<(), StoreError> {
    match self {
      QuestionStore::Remote(s) => s.insert_mmi(rows).await,
      QuestionStore::Memory(s) => s.insert_mmi(rows).await,
    }
  }

  pub async fn insert_ucat(&self, rows: &[NewUcat]) -> Result<(), StoreError> {
    match self {
      QuestionStore::Remote(s) => s.insert_ucat(rows).await,
      QuestionStore::Memory(s) => s.insert_ucat(rows).await,
    }
  }

  /// Rows whose section is in the set, ordered by id, capped at `limit`.
  pub async fn ucat_by_sections(
    &self,
    sections: &[UcatSection],
    limit: usize,
  ) -> Result<Vec<UcatQuestion>, StoreError> {
    match self {
      QuestionStore::Remote(s) => s.ucat_by_sections(sections, limit).await,
      QuestionStore::Memory(s) => s.ucat_by_sections(sections, limit).await,
    }
  }
}

// ---------------- Remote backend ----------------

pub struct RemoteStore {
  client: reqwest::Client,
  base_url: String,
  api_key: String,
  mmi_table: String,
  ucat_table: String,
}

/// Wire row for the UCAT table. The section column is parsed strictly when
/// converting to the domain type.
#[derive(Deserialize)]
struct UcatRow {
  id: i64,
  question: Option<String>,
  answer1: Option<String>,
  answer2: Option<String>,
  answer3: Option<String>,
  answer4: Option<String>,
  answer5: Option<String>,
  correct_answer: Option<u8>,
  #[serde(rename = "type")]
  section: Option<String>,
}

impl UcatRow {
  fn into_question(self) -> Result<UcatQuestion, StoreError> {
    let section = match self.section.as_deref() {
      None => None,
      Some(code) if code.trim().is_empty() => None,
      Some(code) => Some(code.parse::<UcatSection>().map_err(|_| {
        StoreError::InvalidRow(format!("row {} has unknown section code '{}'", self.id, code))
      })?),
    };
    Ok(UcatQuestion {
      id: self.id,
      question: self.question,
      answer1: self.answer1,
      answer2: self.answer2,
      answer3: self.answer3,
      answer4: self.answer4,
      answer5: self.answer5,
      correct_answer: self.correct_answer,
      section,
    })
  }
}

impl RemoteStore {
  /// `Ok(None)` when no SUPABASE_URL is set; `MissingCredentials` when the
  /// URL is there but neither key is.
  pub fn from_env(bank: &BankConfig) -> Result<Option<Self>, StoreError> {
    let Some(base_url) = std::env::var("SUPABASE_URL").ok() else {
      return Ok(None);
    };
    let api_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .map_err(|_| StoreError::MissingCredentials)?;

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()?;

    Ok(Some(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key,
      mmi_table: bank.mmi_table.clone(),
      ucat_table: bank.ucat_table.clone(),
    }))
  }

  fn table_url(&self, table: &str) -> String {
    format!("{}/rest/v1/{}", self.base_url, table)
  }

  fn auth_headers(&self) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("medprep-backend/0.1"));
    if let Ok(v) = HeaderValue::from_str(&self.api_key) {
      headers.insert("apikey", v);
    }
    if let Ok(v) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
      headers.insert(AUTHORIZATION, v);
    }
    headers
  }

  async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if res.status().is_success() {
      return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    let message = extract_store_error(&body).unwrap_or_else(|| truncate_for_log(&body, 300));
    Err(StoreError::Api { status, message })
  }

  /// Row count via a HEAD request; PostgREST reports the total in
  /// `Content-Range` as `*/N` or `a-b/N` when asked for an exact count.
  #[instrument(level = "debug", skip(self))]
  pub async fn count_mmi(&self) -> Result<u64, StoreError> {
    let res = self
      .client
      .head(self.table_url(&self.mmi_table))
      .headers(self.auth_headers())
      .header("Prefer", "count=exact")
      .query(&[("select", "id")])
      .send()
      .await?;
    let res = Self::check_status(res).await?;

    let range = res
      .headers()
      .get("content-range")
      .and_then(|v| v.to_str().ok())
      .ok_or_else(|| StoreError::Decode("count response had no Content-Range".into()))?;
    let total = range
      .rsplit('/')
      .next()
      .and_then(|n| n.parse::<u64>().ok())
      .ok_or_else(|| StoreError::Decode(format!("unparseable Content-Range '{range}'")))?;
    Ok(total)
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn mmi_by_index(&self, index: u64) -> Result<Option<MmiQuestion>, StoreError> {
    let res = self
      .client
      .get(self.table_url(&self.mmi_table))
      .headers(self.auth_headers())
      .query(&[
        ("select", "id,question,answer"),
        ("order", "id.asc"),
        ("offset", &index.to_string()),
        ("limit", "1"),
      ])
      .send()
      .await?;
    let res = Self::check_status(res).await?;
    let rows: Vec<MmiQuestion> = res
      .json()
      .await
      .map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(rows.into_iter().next())
  }

  #[instrument(level = "debug", skip(self, rows), fields(count = rows.len()))]
  pub async fn insert_mmi(&self, rows: &[NewMmi]) -> Result<(), StoreError> {
    let res = self
      .client
      .post(self.table_url(&self.mmi_table))
      .headers(self.auth_headers())
      .header("Prefer", "return=minimal")
      .json(rows)
      .send()
      .await?;
    Self::check_status(res).await?;
    Ok(())
  }

  #[instrument(level = "debug", skip(self, rows), fields(count = rows.len()))]
  pub async fn insert_ucat(&self, rows: &[NewUcat]) -> Result<(), StoreError> {
    let res = self
      .client
      .post(self.table_url(&self.ucat_table))
      .headers(self.auth_headers())
      .header("Prefer", "return=minimal")
      .json(rows)
      .send()
      .await?;
    Self::check_status(res).await?;
    Ok(())
  }

  #[instrument(level = "debug", skip(self), fields(sections = sections.len(), limit))]
  pub async fn ucat_by_sections(
    &self,
    sections: &[UcatSection],
    limit: usize,
  ) -> Result<Vec<UcatQuestion>, StoreError> {
    let codes = sections
      .iter()
      .map(|s| s.code())
      .collect::<Vec<_>>()
      .join(",");
    let res = self
      .client
      .get(self.table_url(&self.ucat_table))
      .headers(self.auth_headers())
      .query(&[
        (
          "select",
          "id,question,answer1,answer2,answer3,answer4,answer5,correct_answer,type",
        ),
        ("type", &format!("in.({codes})")),
        ("order", "id.asc"),
        ("limit", &limit.to_string()),
      ])
      .send()
      .await?;
    let res = Self::check_status(res).await?;
    let rows: Vec<UcatRow> = res
      .json()
      .await
      .map_err(|e| StoreError::Decode(e.to_string()))?;
    rows.into_iter().map(UcatRow::into_question).collect()
  }
}

/// Pull `{"message": …}` out of the store's JSON error body when present.
fn extract_store_error(body: &str) -> Option<String> {
  let v: serde_json::Value = serde_json::from_str(body).ok()?;
  v.get("message")
    .and_then(|m| m.as_str())
    .map(|s| s.to_string())
}

// ---------------- In-memory backend ----------------

/// In-memory twin of the remote store, seeded at startup. Ids are assigned
/// sequentially on insert so index semantics match the remote ordering.
pub struct MemoryStore {
  mmi: RwLock<Vec<MmiQuestion>>,
  ucat: RwLock<Vec<UcatQuestion>>,
}

impl MemoryStore {
  pub fn seeded() -> Self {
    Self {
      mmi: RwLock::new(seed_mmi()),
      ucat: RwLock::new(seed_ucat()),
    }
  }

  pub fn empty() -> Self {
    Self {
      mmi: RwLock::new(Vec::new()),
      ucat: RwLock::new(Vec::new()),
    }
  }

  pub async fn count_mmi(&self) -> Result<u64, StoreError> {
    Ok(self.mmi.read().await.len() as u64)
  }

  pub async fn mmi_by_index(&self, index: u64) -> Result<Option<MmiQuestion>, StoreError> {
    Ok(self.mmi.read().await.get(index as usize).cloned())
  }

  pub async fn insert_mmi(&self, rows: &[NewMmi]) -> Result<(), StoreError> {
    let mut bank = self.mmi.write().await;
    let mut next_id = bank.iter().map(|q| q.id).max().unwrap_or(0) + 1;
    for row in rows {
      bank.push(MmiQuestion {
        id: next_id,
        question: Some(row.question.clone()),
        answer: Some(row.answer.clone()),
      });
      next_id += 1;
    }
    Ok(())
  }

  pub async fn insert_ucat(&self, rows: &[NewUcat]) -> Result<(), StoreError> {
    let mut bank = self.ucat.write().await;
    let mut next_id = bank.iter().map(|q| q.id).max().unwrap_or(0) + 1;
    for row in rows {
      bank.push(UcatQuestion {
        id: next_id,
        question: Some(row.question.clone()),
        answer1: row.answer1.clone(),
        answer2: row.answer2.clone(),
        answer3: row.answer3.clone(),
        answer4: row.answer4.clone(),
        answer5: row.answer5.clone(),
        correct_answer: Some(row.correct_answer),
        section: Some(row.section),
      });
      next_id += 1;
    }
    Ok(())
  }

  pub async fn ucat_by_sections(
    &self,
    sections: &[UcatSection],
    limit: usize,
  ) -> Result<Vec<UcatQuestion>, StoreError> {
    let bank = self.ucat.read().await;
    Ok(
      bank
        .iter()
        .filter(|q| q.section.map(|s| sections.contains(&s)).unwrap_or(false))
        .take(limit)
        .cloned()
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::MmiDraft;

  fn store() -> QuestionStore {
    QuestionStore::Memory(MemoryStore::seeded())
  }

  #[tokio::test]
  async fn memory_count_and_index_follow_id_order() {
    let store = store();
    let count = store.count_mmi().await.unwrap();
    assert!(count >= 4);

    let first = store.mmi_by_index(0).await.unwrap().unwrap();
    assert_eq!(first.id, 1);
    assert!(store.mmi_by_index(count).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn inserts_extend_the_bank_with_fresh_ids() {
    let store = store();
    let before = store.count_mmi().await.unwrap();

    let draft = MmiDraft {
      question: "New question?".into(),
      answer: "New answer.".into(),
    };
    store.insert_mmi(&[draft.validate().unwrap()]).await.unwrap();

    let after = store.count_mmi().await.unwrap();
    assert_eq!(after, before + 1);
    let last = store.mmi_by_index(after - 1).await.unwrap().unwrap();
    assert_eq!(last.question.as_deref(), Some("New question?"));
    assert_eq!(last.id as u64, after);
  }

  #[tokio::test]
  async fn section_filter_matches_only_requested_codes() {
    let store = store();
    let rows = store
      .ucat_by_sections(&[UcatSection::Qr], 500)
      .await
      .unwrap();
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|r| r.section == Some(UcatSection::Qr)));

    let both = store
      .ucat_by_sections(&[UcatSection::Qr, UcatSection::Sjt], 500)
      .await
      .unwrap();
    assert!(both.len() > rows.len());
  }

  #[tokio::test]
  async fn random_mmi_on_empty_bank_is_none() {
    let store = QuestionStore::Memory(MemoryStore::empty());
    assert!(store.random_mmi().await.unwrap().is_none());
  }

  #[test]
  fn ucat_row_rejects_unknown_section_codes() {
    let row = UcatRow {
      id: 9,
      question: Some("Q".into()),
      answer1: Some("a".into()),
      answer2: Some("b".into()),
      answer3: None,
      answer4: None,
      answer5: None,
      correct_answer: Some(1),
      section: Some("BOGUS".into()),
    };
    assert!(matches!(
      row.into_question(),
      Err(StoreError::InvalidRow(_))
    ));
  }

  #[test]
  fn store_error_message_extraction() {
    assert_eq!(
      extract_store_error(r#"{"message":"duplicate key"}"#).as_deref(),
      Some("duplicate key")
    );
    assert!(extract_store_error("<html>bad gateway</html>").is_none());
  }
}
