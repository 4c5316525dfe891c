//! Loading application configuration (server paths, bank tables, streak
//! storage, timer presets) from TOML.
//!
//! Every section has sensible defaults so the service starts with no config
//! file at all; `MEDPREP_CONFIG_PATH` points at an optional override.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub bank: BankConfig,
  #[serde(default)]
  pub streak: StreakConfig,
  #[serde(default)]
  pub timers: TimerConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
  /// Directory holding the built frontend, served with SPA index fallback.
  #[serde(default = "default_static_dir")]
  pub static_dir: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BankConfig {
  /// Remote table holding MMI prompts + model answers.
  #[serde(default = "default_mmi_table")]
  pub mmi_table: String,
  /// Remote table holding UCAT multiple-choice questions.
  #[serde(default = "default_ucat_table")]
  pub ucat_table: String,
  /// Cap on rows fetched when building a quiz session pool.
  #[serde(default = "default_session_pool_limit")]
  pub session_pool_limit: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreakConfig {
  /// Where the reveal ledger is persisted between runs.
  #[serde(default = "default_streak_path")]
  pub data_path: String,
  /// How many reveal dates the ledger keeps (newest kept).
  #[serde(default = "default_history_limit")]
  pub history_limit: usize,
  /// Streak length shown as the "full ring" goal on the dashboard.
  #[serde(default = "default_goal_days")]
  pub goal_days: u32,
}

/// Timer presets mirror the choices the frontend offers. Custom values are
/// accepted within the `*_max` ranges.
#[derive(Clone, Debug, Deserialize)]
pub struct TimerConfig {
  #[serde(default = "default_ucat_minute_presets")]
  pub ucat_minute_presets: Vec<u32>,
  #[serde(default = "default_ucat_minutes_max")]
  pub ucat_minutes_max: u32,
  #[serde(default = "default_question_count_presets")]
  pub question_count_presets: Vec<usize>,
  #[serde(default = "default_question_count_max")]
  pub question_count_max: usize,
  /// MMI prep durations in seconds (default selection 120).
  #[serde(default = "default_mmi_prep_presets")]
  pub mmi_prep_presets: Vec<u32>,
  #[serde(default = "default_mmi_prep_secs")]
  pub mmi_prep_default: u32,
  /// MMI response durations in seconds (default selection 180).
  #[serde(default = "default_mmi_response_presets")]
  pub mmi_response_presets: Vec<u32>,
  #[serde(default = "default_mmi_response_secs")]
  pub mmi_response_default: u32,
}

fn default_static_dir() -> String { "./static".into() }
fn default_mmi_table() -> String { "MMI".into() }
fn default_ucat_table() -> String { "Ucat".into() }
fn default_session_pool_limit() -> usize { 500 }
fn default_streak_path() -> String { "./data/streak.json".into() }
fn default_history_limit() -> usize { 30 }
fn default_goal_days() -> u32 { 30 }
fn default_ucat_minute_presets() -> Vec<u32> { vec![5, 10, 15, 20] }
fn default_ucat_minutes_max() -> u32 { 120 }
fn default_question_count_presets() -> Vec<usize> { vec![5, 10, 20, 30] }
fn default_question_count_max() -> usize { 200 }
fn default_mmi_prep_presets() -> Vec<u32> { vec![60, 120, 180, 240] }
fn default_mmi_prep_secs() -> u32 { 120 }
fn default_mmi_response_presets() -> Vec<u32> { vec![120, 180, 240, 300] }
fn default_mmi_response_secs() -> u32 { 180 }

impl Default for ServerConfig {
  fn default() -> Self {
    Self { static_dir: default_static_dir() }
  }
}

impl Default for BankConfig {
  fn default() -> Self {
    Self {
      mmi_table: default_mmi_table(),
      ucat_table: default_ucat_table(),
      session_pool_limit: default_session_pool_limit(),
    }
  }
}

impl Default for StreakConfig {
  fn default() -> Self {
    Self {
      data_path: default_streak_path(),
      history_limit: default_history_limit(),
      goal_days: default_goal_days(),
    }
  }
}

impl Default for TimerConfig {
  fn default() -> Self {
    Self {
      ucat_minute_presets: default_ucat_minute_presets(),
      ucat_minutes_max: default_ucat_minutes_max(),
      question_count_presets: default_question_count_presets(),
      question_count_max: default_question_count_max(),
      mmi_prep_presets: default_mmi_prep_presets(),
      mmi_prep_default: default_mmi_prep_secs(),
      mmi_response_presets: default_mmi_response_presets(),
      mmi_response_default: default_mmi_response_secs(),
    }
  }
}

impl AppConfig {
  /// Attempt to load from MEDPREP_CONFIG_PATH. Any IO/parse error logs and
  /// falls back to defaults; a bad config never aborts startup.
  pub fn load_from_env() -> Self {
    let Some(path) = std::env::var("MEDPREP_CONFIG_PATH").ok() else {
      return Self::default();
    };
    match std::fs::read_to_string(&path) {
      Ok(s) => match toml::from_str::<AppConfig>(&s) {
        Ok(cfg) => {
          info!(target: "medprep_backend", %path, "Loaded config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "medprep_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
          Self::default()
        }
      },
      Err(e) => {
        error!(target: "medprep_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
        Self::default()
      }
    }
  }
}
