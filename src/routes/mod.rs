//! Router assembly: HTTP API, static frontend, CORS, and HTTP tracing.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from the configured dir with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: AppState) -> Router {
    // Static files with SPA fallback
    let static_dir = state.config.server.static_dir.clone();
    let index = format!("{static_dir}/index.html");
    let static_service = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(index));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Streak dashboard
        .route("/api/v1/streak", get(http::http_get_streak))
        // MMI daily + practice
        .route("/api/v1/mmi/daily", get(http::http_get_daily))
        .route("/api/v1/mmi/daily/reveal", post(http::http_post_reveal))
        .route("/api/v1/mmi/practice", get(http::http_get_practice))
        // Question submission + bulk upload
        .route("/api/v1/mmi/questions", post(http::http_post_mmi_question))
        .route("/api/v1/ucat/questions", post(http::http_post_ucat_question))
        .route("/api/v1/admin/upload/mmi", post(http::http_upload_mmi))
        .route("/api/v1/admin/upload/ucat", post(http::http_upload_ucat))
        // UCAT quiz sessions
        .route("/api/v1/ucat/sessions", post(http::http_create_quiz))
        .route(
            "/api/v1/ucat/sessions/:id",
            get(http::http_get_quiz).delete(http::http_delete_quiz),
        )
        .route("/api/v1/ucat/sessions/:id/answers", post(http::http_post_answer))
        // MMI practice timers
        .route("/api/v1/mmi/sessions", post(http::http_create_timer))
        .route(
            "/api/v1/mmi/sessions/:id",
            get(http::http_get_timer).delete(http::http_delete_timer),
        )
        .route("/api/v1/mmi/sessions/:id/start", post(http::http_timer_start))
        .route("/api/v1/mmi/sessions/:id/stop", post(http::http_timer_stop))
        .route("/api/v1/mmi/sessions/:id/finish", post(http::http_timer_finish))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
