//! Core behaviors shared by the HTTP handlers.
//!
//! This includes:
//!   - Daily-question resolution (deterministic index, random fallback)
//!   - Revealing the daily answer and recording the streak
//!   - Single-question submissions and bulk CSV uploads
//!   - UCAT quiz session and MMI practice timer operations

use chrono::Utc;
use rand::seq::SliceRandom;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::daily::{daily_index, local_today};
use crate::domain::{MmiDraft, MmiQuestion, UcatDraft, UcatSection};
use crate::error::ApiError;
use crate::ingest::{ingest_mmi, ingest_ucat};
use crate::protocol::{
  streak_out, timer_out, quiz_state_out, MmiSubmitIn, QuizSessionIn, QuizStateOut, RevealOut,
  StreakOut, TimerIn, TimerOut, UcatSubmitIn, UploadOut,
};
use crate::session::{PracticeTimer, QuizSession, SessionMode, SessionPlan};
use crate::state::AppState;

const NO_DAILY_QUESTION: &str = "No daily question available yet.";
const NO_PRACTICE_QUESTION: &str = "No practice question available yet.";

/// Resolve today's question: day-of-year index into the id-ordered bank,
/// falling back to a random row when the indexed fetch comes back empty.
#[instrument(level = "info", skip(state))]
pub async fn daily_question(state: &AppState) -> Result<MmiQuestion, ApiError> {
  let count = state.store.count_mmi().await?;
  let today = local_today();
  let Some(index) = daily_index(today, count) else {
    return Err(ApiError::NotFound(NO_DAILY_QUESTION.into()));
  };

  if let Some(q) = state.store.mmi_by_index(index).await? {
    info!(target: "question_bank", %today, index, id = q.id, "Daily question resolved");
    return Ok(q);
  }

  // The bank shrank under us; any question beats none.
  warn!(target: "question_bank", %today, index, count, "Daily index missed; falling back to random");
  state
    .store
    .random_mmi()
    .await?
    .ok_or_else(|| ApiError::NotFound(NO_DAILY_QUESTION.into()))
}

/// Reveal today's answer. This is the streak-recording event: the ledger
/// is updated and persisted before the answer is returned.
#[instrument(level = "info", skip(state))]
pub async fn reveal_daily(state: &AppState) -> Result<RevealOut, ApiError> {
  let question = daily_question(state).await?;
  let today = local_today();

  let mut tracker = state.streak.write().await;
  tracker.record_reveal(today)?;
  let ledger = tracker.ledger();
  info!(target: "streak", %today, current = ledger.current, best = ledger.best, total = ledger.total_reveals, "Daily reveal recorded");

  Ok(RevealOut {
    id: question.id,
    answer: question.answer,
    stats: streak_out(ledger, today, state.config.streak.goal_days),
  })
}

/// A random practice question, answer included; practice reveals are
/// untracked.
#[instrument(level = "info", skip(state))]
pub async fn practice_question(state: &AppState) -> Result<MmiQuestion, ApiError> {
  state
    .store
    .random_mmi()
    .await?
    .ok_or_else(|| ApiError::NotFound(NO_PRACTICE_QUESTION.into()))
}

pub async fn streak_stats(state: &AppState) -> StreakOut {
  let today = local_today();
  let tracker = state.streak.read().await;
  streak_out(tracker.ledger(), today, state.config.streak.goal_days)
}

#[instrument(level = "info", skip(state, body), fields(question_len = body.question.len()))]
pub async fn submit_mmi(state: &AppState, body: MmiSubmitIn) -> Result<(), ApiError> {
  let draft = MmiDraft { question: body.question, answer: body.answer };
  let record = draft.validate()?;
  state.store.insert_mmi(&[record]).await?;
  info!(target: "question_bank", "MMI question submitted");
  Ok(())
}

#[instrument(level = "info", skip(state, body), fields(question_len = body.question.len()))]
pub async fn submit_ucat(state: &AppState, body: UcatSubmitIn) -> Result<(), ApiError> {
  let draft = UcatDraft {
    question: body.question,
    options: body.options,
    correct_answer: body.correct_answer,
    section: body.section,
  };
  let record = draft.validate()?;
  state.store.insert_ucat(&[record]).await?;
  info!(target: "question_bank", "UCAT question submitted");
  Ok(())
}

/// Parse, validate, and bulk-insert an MMI CSV. All-or-nothing: row
/// failures abort before anything is written.
#[instrument(level = "info", skip(state, text), fields(csv_len = text.len()))]
pub async fn upload_mmi_csv(state: &AppState, text: &str) -> Result<UploadOut, ApiError> {
  let report = ingest_mmi(text)?;
  state.store.insert_mmi(&report.records).await?;
  info!(target: "question_bank", inserted = report.records.len(), "Bulk MMI upload stored");
  Ok(UploadOut { inserted: report.records.len(), preview: report.preview })
}

#[instrument(level = "info", skip(state, text), fields(csv_len = text.len()))]
pub async fn upload_ucat_csv(state: &AppState, text: &str) -> Result<UploadOut, ApiError> {
  let report = ingest_ucat(text)?;
  state.store.insert_ucat(&report.records).await?;
  info!(target: "question_bank", inserted = report.records.len(), "Bulk UCAT upload stored");
  Ok(UploadOut { inserted: report.records.len(), preview: report.preview })
}

// -------- UCAT quiz sessions --------

fn parse_sections(raw: &[String]) -> Result<Vec<UcatSection>, ApiError> {
  let mut sections = Vec::new();
  for code in raw {
    let section: UcatSection = code.parse()?;
    if !sections.contains(&section) {
      sections.push(section);
    }
  }
  Ok(sections)
}

/// Validate the plan, load and shuffle the question pool, and register
/// the new session.
#[instrument(level = "info", skip(state, body), fields(question_count = body.question_count))]
pub async fn create_quiz_session(
  state: &AppState,
  body: QuizSessionIn,
) -> Result<QuizStateOut, ApiError> {
  let mode = match body.minutes {
    Some(minutes) => SessionMode::Timed { minutes },
    None => SessionMode::Untimed,
  };
  let plan = SessionPlan {
    sections: parse_sections(&body.sections)?,
    mode,
    question_count: body.question_count,
  };
  plan.validate(&state.config.timers)?;

  let pool = state
    .store
    .ucat_by_sections(&plan.sections, state.config.bank.session_pool_limit)
    .await?;
  let mut questions: Vec<_> = pool.into_iter().filter(|q| q.is_answerable()).collect();
  questions.shuffle(&mut rand::thread_rng());
  questions.truncate(plan.question_count);

  let now = Utc::now();
  let session = QuizSession::new(&plan, questions, now)?;
  let out = quiz_state_out(&session, now);
  info!(
    target: "quiz_session",
    id = %session.id,
    sections = %plan.sections.iter().map(|s| s.code()).collect::<Vec<_>>().join(","),
    questions = session.total_questions(),
    timed = matches!(plan.mode, SessionMode::Timed { .. }),
    "Quiz session started"
  );
  state.quiz_sessions.write().await.insert(session.id, session);
  Ok(out)
}

#[instrument(level = "debug", skip(state), fields(%id))]
pub async fn quiz_session_state(state: &AppState, id: Uuid) -> Result<QuizStateOut, ApiError> {
  let sessions = state.quiz_sessions.read().await;
  let session = sessions
    .get(&id)
    .ok_or_else(|| ApiError::NotFound("Unknown quiz session.".into()))?;
  Ok(quiz_state_out(session, Utc::now()))
}

#[instrument(level = "info", skip(state), fields(%id, choice))]
pub async fn answer_quiz(state: &AppState, id: Uuid, choice: u8) -> Result<QuizStateOut, ApiError> {
  let mut sessions = state.quiz_sessions.write().await;
  let session = sessions
    .get_mut(&id)
    .ok_or_else(|| ApiError::NotFound("Unknown quiz session.".into()))?;
  session.answer_current(choice)?;
  Ok(quiz_state_out(session, Utc::now()))
}

/// "Back to setup": drop the session entirely.
#[instrument(level = "info", skip(state), fields(%id))]
pub async fn delete_quiz_session(state: &AppState, id: Uuid) -> Result<(), ApiError> {
  let removed = state.quiz_sessions.write().await.remove(&id);
  if removed.is_none() {
    return Err(ApiError::NotFound("Unknown quiz session.".into()));
  }
  info!(target: "quiz_session", %id, "Quiz session discarded");
  Ok(())
}

// -------- MMI practice timers --------

pub enum TimerAction {
  Start,
  Stop,
  Finish,
}

#[instrument(level = "info", skip(state, body))]
pub async fn create_timer(state: &AppState, body: TimerIn) -> Result<TimerOut, ApiError> {
  let timers = &state.config.timers;
  let prep = body.prep_seconds.unwrap_or(timers.mmi_prep_default);
  let response = body.response_seconds.unwrap_or(timers.mmi_response_default);
  let timer = PracticeTimer::new(prep, response, timers)?;
  let out = timer_out(&timer);
  info!(target: "quiz_session", id = %timer.id, prep, response, "Practice timer created");
  state.practice_timers.write().await.insert(timer.id, timer);
  Ok(out)
}

#[instrument(level = "debug", skip(state), fields(%id))]
pub async fn timer_state(state: &AppState, id: Uuid) -> Result<TimerOut, ApiError> {
  let mut timers = state.practice_timers.write().await;
  let timer = timers
    .get_mut(&id)
    .ok_or_else(|| ApiError::NotFound("Unknown practice timer.".into()))?;
  timer.settle(Utc::now());
  Ok(timer_out(timer))
}

#[instrument(level = "info", skip(state, action), fields(%id))]
pub async fn timer_action(
  state: &AppState,
  id: Uuid,
  action: TimerAction,
) -> Result<TimerOut, ApiError> {
  let mut timers = state.practice_timers.write().await;
  let timer = timers
    .get_mut(&id)
    .ok_or_else(|| ApiError::NotFound("Unknown practice timer.".into()))?;
  let now = Utc::now();
  match action {
    TimerAction::Start => timer.start(now),
    TimerAction::Stop => timer.stop(now),
    TimerAction::Finish => timer.finish(now),
  }
  Ok(timer_out(timer))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn delete_timer(state: &AppState, id: Uuid) -> Result<(), ApiError> {
  let removed = state.practice_timers.write().await.remove(&id);
  if removed.is_none() {
    return Err(ApiError::NotFound("Unknown practice timer.".into()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::session::SessionError;
  use crate::store::{MemoryStore, QuestionStore};
  use crate::streak::StreakTracker;

  fn test_state() -> AppState {
    let config = AppConfig::default();
    let streak_path =
      std::env::temp_dir().join(format!("medprep-logic-{}.json", Uuid::new_v4()));
    let streak = StreakTracker::load(&streak_path, config.streak.history_limit);
    AppState::with_parts(
      QuestionStore::Memory(MemoryStore::seeded()),
      config,
      streak,
    )
  }

  fn empty_state() -> AppState {
    let config = AppConfig::default();
    let streak_path =
      std::env::temp_dir().join(format!("medprep-logic-{}.json", Uuid::new_v4()));
    let streak = StreakTracker::load(&streak_path, config.streak.history_limit);
    AppState::with_parts(
      QuestionStore::Memory(MemoryStore::empty()),
      config,
      streak,
    )
  }

  #[tokio::test]
  async fn daily_question_is_stable_within_a_day() {
    let state = test_state();
    let a = daily_question(&state).await.unwrap();
    let b = daily_question(&state).await.unwrap();
    assert_eq!(a.id, b.id);
  }

  #[tokio::test]
  async fn empty_bank_yields_not_found() {
    let state = empty_state();
    assert!(matches!(
      daily_question(&state).await,
      Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
      practice_question(&state).await,
      Err(ApiError::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn reveal_records_exactly_one_streak_day() {
    let state = test_state();
    let out = reveal_daily(&state).await.unwrap();
    assert!(out.answer.is_some());
    assert_eq!(out.stats.current, 1);
    assert_eq!(out.stats.total_reveals, 1);
    assert!(out.stats.checked_in_today);

    // Revealing again the same day bumps the total but not the streak.
    let again = reveal_daily(&state).await.unwrap();
    assert_eq!(again.stats.current, 1);
    assert_eq!(again.stats.total_reveals, 2);
  }

  #[tokio::test]
  async fn submissions_validate_before_storing() {
    let state = test_state();
    let bad = MmiSubmitIn { question: "   ".into(), answer: "a".into() };
    assert!(matches!(
      submit_mmi(&state, bad).await,
      Err(ApiError::Validation(_))
    ));

    let before = state.store.count_mmi().await.unwrap();
    let good = MmiSubmitIn { question: "q".into(), answer: "a".into() };
    submit_mmi(&state, good).await.unwrap();
    assert_eq!(state.store.count_mmi().await.unwrap(), before + 1);
  }

  #[tokio::test]
  async fn invalid_csv_uploads_insert_nothing() {
    let state = test_state();
    let before = state.store.count_mmi().await.unwrap();
    let err = upload_mmi_csv(&state, "question,answer\nq1,a1\nq2,")
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(state.store.count_mmi().await.unwrap(), before);
  }

  #[tokio::test]
  async fn csv_upload_inserts_and_previews() {
    let state = test_state();
    let before = state.store.count_mmi().await.unwrap();
    let out = upload_mmi_csv(&state, "question,answer\nq1,a1\nq2,a2")
      .await
      .unwrap();
    assert_eq!(out.inserted, 2);
    assert_eq!(out.preview.len(), 2);
    assert_eq!(state.store.count_mmi().await.unwrap(), before + 2);
  }

  #[tokio::test]
  async fn quiz_session_runs_to_summary() {
    let state = test_state();
    let created = create_quiz_session(
      &state,
      QuizSessionIn {
        sections: vec!["vr".into(), "QR".into(), "dm".into(), "sjt".into()],
        minutes: None,
        question_count: 3,
      },
    )
    .await
    .unwrap();
    assert_eq!(created.phase, "in_progress");
    assert_eq!(created.total_questions, 3);
    assert!(created.remaining_seconds.is_none());

    let id: Uuid = created.id.parse().unwrap();
    let mut last = created;
    for _ in 0..3 {
      let q = last.question.expect("question while in progress");
      let choice = q.options[0].n;
      last = answer_quiz(&state, id, choice).await.unwrap();
    }
    assert_eq!(last.phase, "summary");
    let summary = last.summary.unwrap();
    assert_eq!(summary.total, 3);

    delete_quiz_session(&state, id).await.unwrap();
    assert!(matches!(
      quiz_session_state(&state, id).await,
      Err(ApiError::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn quiz_plan_errors_surface_as_validation() {
    let state = test_state();
    let err = create_quiz_session(
      &state,
      QuizSessionIn { sections: vec![], minutes: None, question_count: 5 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    // Valid plan but nothing answerable in the bank.
    let empty = empty_state();
    let err = create_quiz_session(
      &empty,
      QuizSessionIn {
        sections: vec!["VR".into()],
        minutes: Some(10),
        question_count: 5,
      },
    )
    .await
    .unwrap_err();
    assert_eq!(
      err.to_string(),
      SessionError::EmptyPool.to_string()
    );
  }

  #[tokio::test]
  async fn short_pool_runs_with_what_exists() {
    let state = test_state();
    let created = create_quiz_session(
      &state,
      QuizSessionIn {
        sections: vec!["SJT".into()],
        minutes: None,
        question_count: 50,
      },
    )
    .await
    .unwrap();
    assert_eq!(created.total_questions, 1);
  }

  #[tokio::test]
  async fn timer_lifecycle_via_registry() {
    let state = test_state();
    let created = create_timer(
      &state,
      TimerIn { prep_seconds: None, response_seconds: None },
    )
    .await
    .unwrap();
    assert_eq!(created.phase, "prep");
    assert_eq!(created.remaining_seconds, 120);
    assert!(!created.running);

    let id: Uuid = created.id.parse().unwrap();
    let started = timer_action(&state, id, TimerAction::Start).await.unwrap();
    assert!(started.running);

    let finished = timer_action(&state, id, TimerAction::Finish).await.unwrap();
    assert_eq!(finished.phase, "response");
    assert_eq!(finished.remaining_seconds, 180);
    assert!(!finished.running);

    delete_timer(&state, id).await.unwrap();
    assert!(matches!(
      timer_state(&state, id).await,
      Err(ApiError::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn timer_rejects_off_preset_durations() {
    let state = test_state();
    let err = create_timer(
      &state,
      TimerIn { prep_seconds: Some(90), response_seconds: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
  }
}
