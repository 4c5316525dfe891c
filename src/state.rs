//! Application state shared by every handler.
//!
//! This module owns:
//!   - the question store (remote client or in-memory seed bank)
//!   - the loaded configuration
//!   - the streak tracker behind a write lock (reveals mutate + persist)
//!   - the quiz session and practice timer registries

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::session::{PracticeTimer, QuizSession};
use crate::store::QuestionStore;
use crate::streak::StreakTracker;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<QuestionStore>,
    pub config: Arc<AppConfig>,
    pub streak: Arc<RwLock<StreakTracker>>,
    pub quiz_sessions: Arc<RwLock<HashMap<Uuid, QuizSession>>>,
    pub practice_timers: Arc<RwLock<HashMap<Uuid, PracticeTimer>>>,
}

impl AppState {
    /// Build state from env: load config, pick the store backend, load the
    /// streak ledger from disk.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = AppConfig::load_from_env();
        let store = QuestionStore::from_env(&config.bank);
        let streak = StreakTracker::load(&config.streak.data_path, config.streak.history_limit);
        Self::assemble(store, config, streak)
    }

    /// Assemble from explicit parts. Tests use this with a memory store
    /// and a throwaway ledger path.
    pub fn with_parts(store: QuestionStore, config: AppConfig, streak: StreakTracker) -> Self {
        Self::assemble(store, config, streak)
    }

    fn assemble(store: QuestionStore, config: AppConfig, streak: StreakTracker) -> Self {
        info!(
            target: "medprep_backend",
            store = store.backend_name(),
            streak_path = %config.streak.data_path,
            static_dir = %config.server.static_dir,
            "Application state ready"
        );
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
            streak: Arc::new(RwLock::new(streak)),
            quiz_sessions: Arc::new(RwLock::new(HashMap::new())),
            practice_timers: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
