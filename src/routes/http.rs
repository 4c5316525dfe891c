//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures render through `ApiError`.

use axum::{
  extract::{Path, State},
  Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::logic;
use crate::logic::TimerAction;
use crate::protocol::*;
use crate::state::AppState;
use crate::util::truncate_for_log;

#[instrument(level = "info")]
pub async fn http_health() -> Json<HealthOut> {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_streak(State(state): State<AppState>) -> Json<StreakOut> {
  Json(logic::streak_stats(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_daily(
  State(state): State<AppState>,
) -> Result<Json<DailyQuestionOut>, ApiError> {
  let q = logic::daily_question(&state).await?;
  // The answer stays hidden until the reveal endpoint records the streak.
  Ok(Json(DailyQuestionOut { id: q.id, question: q.question }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reveal(
  State(state): State<AppState>,
) -> Result<Json<RevealOut>, ApiError> {
  let out = logic::reveal_daily(&state).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_practice(
  State(state): State<AppState>,
) -> Result<Json<PracticeOut>, ApiError> {
  let q = logic::practice_question(&state).await?;
  Ok(Json(PracticeOut { id: q.id, question: q.question, answer: q.answer }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_mmi_question(
  State(state): State<AppState>,
  Json(body): Json<MmiSubmitIn>,
) -> Result<Json<SubmitOut>, ApiError> {
  logic::submit_mmi(&state, body).await?;
  Ok(Json(SubmitOut { ok: true, message: "MMI question submitted.".into() }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_ucat_question(
  State(state): State<AppState>,
  Json(body): Json<UcatSubmitIn>,
) -> Result<Json<SubmitOut>, ApiError> {
  logic::submit_ucat(&state, body).await?;
  Ok(Json(SubmitOut { ok: true, message: "UCAT question submitted.".into() }))
}

#[instrument(level = "info", skip(state, body), fields(csv_len = body.len()))]
pub async fn http_upload_mmi(
  State(state): State<AppState>,
  body: String,
) -> Result<Json<UploadOut>, ApiError> {
  let out = logic::upload_mmi_csv(&state, &body).await?;
  info!(target: "question_bank", inserted = out.inserted, head = %truncate_for_log(&body, 120), "MMI CSV upload accepted");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(csv_len = body.len()))]
pub async fn http_upload_ucat(
  State(state): State<AppState>,
  body: String,
) -> Result<Json<UploadOut>, ApiError> {
  let out = logic::upload_ucat_csv(&state, &body).await?;
  info!(target: "question_bank", inserted = out.inserted, head = %truncate_for_log(&body, 120), "UCAT CSV upload accepted");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_create_quiz(
  State(state): State<AppState>,
  Json(body): Json<QuizSessionIn>,
) -> Result<Json<QuizStateOut>, ApiError> {
  Ok(Json(logic::create_quiz_session(&state, body).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_quiz(
  State(state): State<AppState>,
  Path(id): Path<Uuid>,
) -> Result<Json<QuizStateOut>, ApiError> {
  Ok(Json(logic::quiz_session_state(&state, id).await?))
}

#[instrument(level = "info", skip(state, body), fields(%id, choice = body.choice))]
pub async fn http_post_answer(
  State(state): State<AppState>,
  Path(id): Path<Uuid>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<QuizStateOut>, ApiError> {
  Ok(Json(logic::answer_quiz(&state, id, body.choice).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_quiz(
  State(state): State<AppState>,
  Path(id): Path<Uuid>,
) -> Result<Json<OkOut>, ApiError> {
  logic::delete_quiz_session(&state, id).await?;
  Ok(Json(OkOut { ok: true }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_create_timer(
  State(state): State<AppState>,
  Json(body): Json<TimerIn>,
) -> Result<Json<TimerOut>, ApiError> {
  Ok(Json(logic::create_timer(&state, body).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_timer(
  State(state): State<AppState>,
  Path(id): Path<Uuid>,
) -> Result<Json<TimerOut>, ApiError> {
  Ok(Json(logic::timer_state(&state, id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_timer_start(
  State(state): State<AppState>,
  Path(id): Path<Uuid>,
) -> Result<Json<TimerOut>, ApiError> {
  Ok(Json(logic::timer_action(&state, id, TimerAction::Start).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_timer_stop(
  State(state): State<AppState>,
  Path(id): Path<Uuid>,
) -> Result<Json<TimerOut>, ApiError> {
  Ok(Json(logic::timer_action(&state, id, TimerAction::Stop).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_timer_finish(
  State(state): State<AppState>,
  Path(id): Path<Uuid>,
) -> Result<Json<TimerOut>, ApiError> {
  Ok(Json(logic::timer_action(&state, id, TimerAction::Finish).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_timer(
  State(state): State<AppState>,
  Path(id): Path<Uuid>,
) -> Result<Json<OkOut>, ApiError> {
  logic::delete_timer(&state, id).await?;
  Ok(Json(OkOut { ok: true }))
}
