//! Reveal-streak tracking.
//!
//! `StreakLedger` holds the counters and applies the date-arithmetic
//! rules; `StreakTracker` wraps it with JSON-file persistence so the
//! ledger survives restarts. Every successful reveal is written to disk
//! before the response goes out.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StreakError {
  #[error("ledger IO failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("ledger serialization failed: {0}")]
  Json(#[from] serde_json::Error),
}

/// Persisted counters. Dates serialize as `YYYY-MM-DD`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakLedger {
  pub last_reveal: Option<NaiveDate>,
  pub current: u32,
  pub best: u32,
  pub total_reveals: u32,
  /// Reveal dates, oldest first, deduplicated, capped by the tracker.
  pub history: Vec<NaiveDate>,
}

/// One cell of the recent-days mini calendar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayCell {
  pub date: NaiveDate,
  /// Short weekday label ("Mon", "Tue", ...).
  pub label: String,
  pub revealed: bool,
}

impl StreakLedger {
  /// Apply one reveal event. Repeat reveals on an already-checked-in day
  /// leave the streak alone but still count toward the total.
  pub fn record_reveal(&mut self, today: NaiveDate, history_limit: usize) {
    let yesterday = today - Duration::days(1);
    if self.last_reveal != Some(today) {
      self.current = if self.last_reveal == Some(yesterday) {
        self.current + 1
      } else {
        1
      };
    }
    self.best = self.best.max(self.current);
    self.total_reveals += 1;

    if !self.history.contains(&today) {
      self.history.push(today);
    }
    if self.history.len() > history_limit {
      let drop = self.history.len() - history_limit;
      self.history.drain(..drop);
    }
    self.last_reveal = Some(today);
  }

  pub fn checked_in_today(&self, today: NaiveDate) -> bool {
    self.last_reveal == Some(today)
  }

  /// The last `n` calendar days ending today, oldest first, each flagged
  /// with whether a reveal happened on it.
  pub fn recent_days(&self, today: NaiveDate, n: usize) -> Vec<DayCell> {
    (0..n)
      .rev()
      .map(|back| {
        let date = today - Duration::days(back as i64);
        DayCell {
          date,
          label: date.format("%a").to_string(),
          revealed: self.history.contains(&date),
        }
      })
      .collect()
  }
}

/// Ledger plus its file home.
pub struct StreakTracker {
  path: PathBuf,
  history_limit: usize,
  ledger: StreakLedger,
}

impl StreakTracker {
  /// Load from disk. A missing or corrupt file starts a fresh ledger;
  /// corruption is logged rather than fatal.
  pub fn load(path: impl AsRef<Path>, history_limit: usize) -> Self {
    let path = path.as_ref().to_path_buf();
    let ledger = match std::fs::read_to_string(&path) {
      Ok(raw) => match serde_json::from_str::<StreakLedger>(&raw) {
        Ok(ledger) => {
          info!(target: "streak", path = %path.display(), current = ledger.current, best = ledger.best, "Loaded streak ledger");
          ledger
        }
        Err(e) => {
          warn!(target: "streak", path = %path.display(), error = %e, "Corrupt streak ledger; starting fresh");
          StreakLedger::default()
        }
      },
      Err(_) => StreakLedger::default(),
    };
    Self { path, history_limit, ledger }
  }

  pub fn ledger(&self) -> &StreakLedger {
    &self.ledger
  }

  /// Record a reveal and persist the updated ledger.
  pub fn record_reveal(&mut self, today: NaiveDate) -> Result<(), StreakError> {
    self.ledger.record_reveal(today, self.history_limit);
    self.save()
  }

  fn save(&self) -> Result<(), StreakError> {
    if let Some(parent) = self.path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }
    let raw = serde_json::to_string_pretty(&self.ledger)?;
    std::fs::write(&self.path, raw)?;
    Ok(())
  }
}
