//! MedPrep · Exam Preparation Backend
//!
//! - Axum HTTP API (daily MMI questions, streak, UCAT quiz sessions, uploads)
//! - Optional remote question store (via environment variables)
//! - Static SPA fallback (./static/index.html by default)
//!
//! Important env variables:
//!   PORT          : u16 (default 3000)
//!   SUPABASE_URL      : enables the remote question store if present
//!   SUPABASE_SERVICE_ROLE_KEY : store API key (preferred)
//!   SUPABASE_ANON_KEY  : store API key fallback
//!   MEDPREP_CONFIG_PATH  : path to TOML config (tables, presets, streak path)
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod seeds;
mod store;
mod ingest;
mod daily;
mod streak;
mod session;
mod state;
mod protocol;
mod logic;
mod routes;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (store backend, config, streak ledger).
  let state = AppState::new();

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "medprep_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
