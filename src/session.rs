//! Practice-session state machines.
//!
//! `QuizSession` is the UCAT machine: a validated plan loads a shuffled
//! question set, answers advance linearly, and answering the final
//! question moves the session to its summary. The countdown is advisory:
//! an expired timer neither rejects answers nor ends the session.
//!
//! `PracticeTimer` is the MMI prep/response timer: prep counts down, and
//! reaching zero (or finishing early) hands over to a fresh, stopped
//! response countdown.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::config::TimerConfig;
use crate::domain::{UcatQuestion, UcatSection};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
  #[error("select at least one UCAT section")]
  NoSections,
  #[error("question count must be between 1 and {max}")]
  QuestionCountOutOfRange { max: usize },
  #[error("timer minutes must be between 1 and {max}")]
  MinutesOutOfRange { max: u32 },
  #[error("no UCAT questions available for the selected sections")]
  EmptyPool,
  #[error("choice must point at one of the listed options")]
  InvalidChoice,
  #[error("this session is already finished")]
  AlreadyFinished,
  #[error("prep and response durations must come from the configured presets")]
  InvalidDuration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
  Timed { minutes: u32 },
  Untimed,
}

/// The setup-phase selection. Invalid plans never construct a session.
#[derive(Clone, Debug)]
pub struct SessionPlan {
  pub sections: Vec<UcatSection>,
  pub mode: SessionMode,
  pub question_count: usize,
}

impl SessionPlan {
  pub fn validate(&self, timers: &TimerConfig) -> Result<(), SessionError> {
    if self.sections.is_empty() {
      return Err(SessionError::NoSections);
    }
    if self.question_count == 0 || self.question_count > timers.question_count_max {
      return Err(SessionError::QuestionCountOutOfRange { max: timers.question_count_max });
    }
    if let SessionMode::Timed { minutes } = self.mode {
      if minutes == 0 || minutes > timers.ucat_minutes_max {
        return Err(SessionError::MinutesOutOfRange { max: timers.ucat_minutes_max });
      }
    }
    Ok(())
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizPhase {
  InProgress,
  Summary,
}

#[derive(Clone, Debug)]
pub struct AnswerOutcome {
  pub question_id: i64,
  /// 1-based option the user picked.
  pub chosen: u8,
  pub correct: bool,
}

#[derive(Clone, Debug)]
pub struct SummaryLine {
  /// 1-based position within the session.
  pub number: usize,
  pub question_id: i64,
  pub chosen: u8,
  pub correct: bool,
}

#[derive(Clone, Debug)]
pub struct QuizSummary {
  pub total: usize,
  pub correct: usize,
  pub outcomes: Vec<SummaryLine>,
}

pub struct QuizSession {
  pub id: Uuid,
  pub sections: Vec<UcatSection>,
  pub mode: SessionMode,
  questions: Vec<UcatQuestion>,
  current: usize,
  outcomes: Vec<AnswerOutcome>,
  phase: QuizPhase,
  deadline: Option<DateTime<Utc>>,
}

impl QuizSession {
  /// Build from an already-validated plan and a non-empty question set.
  pub fn new(
    plan: &SessionPlan,
    questions: Vec<UcatQuestion>,
    now: DateTime<Utc>,
  ) -> Result<Self, SessionError> {
    if questions.is_empty() {
      return Err(SessionError::EmptyPool);
    }
    let deadline = match plan.mode {
      SessionMode::Timed { minutes } => Some(now + chrono::Duration::minutes(minutes as i64)),
      SessionMode::Untimed => None,
    };
    Ok(Self {
      id: Uuid::new_v4(),
      sections: plan.sections.clone(),
      mode: plan.mode,
      questions,
      current: 0,
      outcomes: Vec::new(),
      phase: QuizPhase::InProgress,
      deadline,
    })
  }

  pub fn phase(&self) -> QuizPhase {
    self.phase
  }

  pub fn total_questions(&self) -> usize {
    self.questions.len()
  }

  /// 1-based number of the question being answered, capped at the total
  /// once the session is finished.
  pub fn question_number(&self) -> usize {
    (self.current + 1).min(self.questions.len())
  }

  pub fn current_question(&self) -> Option<&UcatQuestion> {
    match self.phase {
      QuizPhase::InProgress => self.questions.get(self.current),
      QuizPhase::Summary => None,
    }
  }

  /// Seconds left on the countdown, clamped at zero. `None` for untimed
  /// sessions.
  pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
    self
      .deadline
      .map(|deadline| (deadline - now).num_seconds().max(0) as u64)
  }

  /// Record the answer to the current question and advance. Correctness
  /// is not reported here; only the summary discloses it.
  pub fn answer_current(&mut self, choice: u8) -> Result<(), SessionError> {
    if self.phase == QuizPhase::Summary {
      return Err(SessionError::AlreadyFinished);
    }
    let question = self
      .questions
      .get(self.current)
      .ok_or(SessionError::AlreadyFinished)?;
    if question.option_text(choice).is_none() {
      return Err(SessionError::InvalidChoice);
    }

    self.outcomes.push(AnswerOutcome {
      question_id: question.id,
      chosen: choice,
      correct: question.correct_answer == Some(choice),
    });
    self.current += 1;
    if self.current >= self.questions.len() {
      self.phase = QuizPhase::Summary;
    }
    Ok(())
  }

  /// `Some` once the session reached its summary.
  pub fn summary(&self) -> Option<QuizSummary> {
    if self.phase != QuizPhase::Summary {
      return None;
    }
    let outcomes: Vec<SummaryLine> = self
      .outcomes
      .iter()
      .enumerate()
      .map(|(i, o)| SummaryLine {
        number: i + 1,
        question_id: o.question_id,
        chosen: o.chosen,
        correct: o.correct,
      })
      .collect();
    let correct = outcomes.iter().filter(|o| o.correct).count();
    Some(QuizSummary { total: outcomes.len(), correct, outcomes })
  }
}

// ---------------- MMI practice timer ----------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerPhase {
  Prep,
  Response,
}

/// Server-side twin of the frontend prep/response countdown. Elapsed time
/// is folded in from `running_since` whenever the timer is observed or
/// acted on.
#[derive(Debug)]
pub struct PracticeTimer {
  pub id: Uuid,
  phase: TimerPhase,
  prep_secs: u32,
  response_secs: u32,
  remaining: u32,
  running_since: Option<DateTime<Utc>>,
}

impl PracticeTimer {
  pub fn new(
    prep_secs: u32,
    response_secs: u32,
    timers: &TimerConfig,
  ) -> Result<Self, SessionError> {
    if !timers.mmi_prep_presets.contains(&prep_secs)
      || !timers.mmi_response_presets.contains(&response_secs)
    {
      return Err(SessionError::InvalidDuration);
    }
    Ok(Self {
      id: Uuid::new_v4(),
      phase: TimerPhase::Prep,
      prep_secs,
      response_secs,
      remaining: prep_secs,
      running_since: None,
    })
  }

  pub fn phase(&self) -> TimerPhase {
    self.phase
  }

  pub fn remaining(&self) -> u32 {
    self.remaining
  }

  pub fn is_running(&self) -> bool {
    self.running_since.is_some()
  }

  pub fn prep_secs(&self) -> u32 {
    self.prep_secs
  }

  pub fn response_secs(&self) -> u32 {
    self.response_secs
  }

  /// Fold elapsed running time into `remaining` and apply the
  /// prep-to-response handoff when prep hits zero.
  pub fn settle(&mut self, now: DateTime<Utc>) {
    if let Some(since) = self.running_since {
      let elapsed = (now - since).num_seconds().max(0) as u64;
      if elapsed >= u64::from(self.remaining) {
        self.remaining = 0;
        self.running_since = None;
      } else {
        self.remaining -= elapsed as u32;
        self.running_since = Some(now);
      }
    }
    if self.phase == TimerPhase::Prep && self.remaining == 0 {
      // Prep expiring hands over to a fresh, stopped response countdown.
      self.phase = TimerPhase::Response;
      self.remaining = self.response_secs;
      self.running_since = None;
    }
  }

  /// No-op while already running or at zero.
  pub fn start(&mut self, now: DateTime<Utc>) {
    self.settle(now);
    if self.running_since.is_none() && self.remaining > 0 {
      self.running_since = Some(now);
    }
  }

  pub fn stop(&mut self, now: DateTime<Utc>) {
    self.settle(now);
    self.running_since = None;
  }

  /// Skip the rest of the phase: prep jumps to a stopped response
  /// countdown, response parks at zero.
  pub fn finish(&mut self, now: DateTime<Utc>) {
    self.settle(now);
    match self.phase {
      TimerPhase::Prep => {
        self.phase = TimerPhase::Response;
        self.remaining = self.response_secs;
        self.running_since = None;
      }
      TimerPhase::Response => {
        self.remaining = 0;
        self.running_since = None;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::seed_ucat;
  use chrono::Duration;

  fn plan(mode: SessionMode, count: usize) -> SessionPlan {
    SessionPlan {
      sections: vec![UcatSection::Vr, UcatSection::Qr],
      mode,
      question_count: count,
    }
  }

  fn pool() -> Vec<UcatQuestion> {
    seed_ucat()
  }

  #[test]
  fn plan_validation_gates_sections_counts_and_minutes() {
    let timers = TimerConfig::default();

    let mut p = plan(SessionMode::Untimed, 10);
    p.sections.clear();
    assert_eq!(p.validate(&timers), Err(SessionError::NoSections));

    assert_eq!(
      plan(SessionMode::Untimed, 0).validate(&timers),
      Err(SessionError::QuestionCountOutOfRange { max: 200 })
    );
    assert_eq!(
      plan(SessionMode::Untimed, 201).validate(&timers),
      Err(SessionError::QuestionCountOutOfRange { max: 200 })
    );
    assert_eq!(
      plan(SessionMode::Timed { minutes: 121 }, 10).validate(&timers),
      Err(SessionError::MinutesOutOfRange { max: 120 })
    );
    assert!(plan(SessionMode::Timed { minutes: 12 }, 10).validate(&timers).is_ok());
  }

  #[test]
  fn empty_pool_never_builds_a_session() {
    let now = Utc::now();
    assert!(matches!(
      QuizSession::new(&plan(SessionMode::Untimed, 5), Vec::new(), now),
      Err(SessionError::EmptyPool)
    ));
  }

  #[test]
  fn answers_advance_linearly_to_the_summary() {
    let now = Utc::now();
    let questions = pool();
    let total = questions.len();
    let mut session =
      QuizSession::new(&plan(SessionMode::Untimed, total), questions.clone(), now).unwrap();

    assert_eq!(session.phase(), QuizPhase::InProgress);
    assert!(session.summary().is_none());

    for (i, q) in questions.iter().enumerate() {
      assert_eq!(session.question_number(), i + 1);
      let choice = q.correct_answer.unwrap();
      session.answer_current(choice).unwrap();
    }

    assert_eq!(session.phase(), QuizPhase::Summary);
    let summary = session.summary().unwrap();
    assert_eq!(summary.total, total);
    assert_eq!(summary.correct, total);
    assert_eq!(summary.outcomes[0].number, 1);
  }

  #[test]
  fn wrong_answers_are_counted_in_the_summary() {
    let now = Utc::now();
    let questions = pool();
    let total = questions.len();
    let mut session =
      QuizSession::new(&plan(SessionMode::Untimed, total), questions.clone(), now).unwrap();

    for (i, q) in questions.iter().enumerate() {
      let correct = q.correct_answer.unwrap();
      // Answer the first question wrong, the rest right.
      let choice = if i == 0 {
        (1..=5)
          .find(|n| *n != correct && q.option_text(*n).is_some())
          .unwrap()
      } else {
        correct
      };
      session.answer_current(choice).unwrap();
    }

    let summary = session.summary().unwrap();
    assert_eq!(summary.correct, total - 1);
    assert!(!summary.outcomes[0].correct);
  }

  #[test]
  fn choices_must_name_a_real_option() {
    let now = Utc::now();
    let mut session =
      QuizSession::new(&plan(SessionMode::Untimed, 5), pool(), now).unwrap();

    assert_eq!(session.answer_current(0), Err(SessionError::InvalidChoice));
    // Seed question 1 has four real options; slot 5 is empty.
    assert_eq!(session.answer_current(5), Err(SessionError::InvalidChoice));
    assert_eq!(session.question_number(), 1);
  }

  #[test]
  fn finished_sessions_reject_further_answers() {
    let now = Utc::now();
    let questions: Vec<_> = pool().into_iter().take(1).collect();
    let choice = questions[0].correct_answer.unwrap();
    let mut session =
      QuizSession::new(&plan(SessionMode::Untimed, 1), questions, now).unwrap();

    session.answer_current(choice).unwrap();
    assert_eq!(
      session.answer_current(choice),
      Err(SessionError::AlreadyFinished)
    );
  }

  #[test]
  fn countdown_clamps_at_zero_and_stays_advisory() {
    let now = Utc::now();
    let questions = pool();
    let mut session =
      QuizSession::new(&plan(SessionMode::Timed { minutes: 10 }, 5), questions.clone(), now)
        .unwrap();

    assert_eq!(session.remaining_seconds(now), Some(600));
    let later = now + Duration::minutes(11);
    assert_eq!(session.remaining_seconds(later), Some(0));

    // Expired timer still accepts answers.
    let choice = questions[0].correct_answer.unwrap();
    session.answer_current(choice).unwrap();

    let untimed = QuizSession::new(&plan(SessionMode::Untimed, 5), pool(), now).unwrap();
    assert_eq!(untimed.remaining_seconds(now), None);
  }

  // ---- practice timer ----

  fn timer() -> PracticeTimer {
    PracticeTimer::new(120, 180, &TimerConfig::default()).unwrap()
  }

  #[test]
  fn timer_durations_come_from_the_presets() {
    let timers = TimerConfig::default();
    assert!(PracticeTimer::new(60, 300, &timers).is_ok());
    assert_eq!(
      PracticeTimer::new(90, 180, &timers).unwrap_err(),
      SessionError::InvalidDuration
    );
    assert_eq!(
      PracticeTimer::new(120, 90, &timers).unwrap_err(),
      SessionError::InvalidDuration
    );
  }

  #[test]
  fn running_prep_counts_down_and_hands_over_at_zero() {
    let mut t = timer();
    let now = Utc::now();
    t.start(now);
    assert!(t.is_running());

    t.settle(now + Duration::seconds(30));
    assert_eq!(t.phase(), TimerPhase::Prep);
    assert_eq!(t.remaining(), 90);
    assert!(t.is_running());

    // Prep runs out: phase flips, response duration is loaded, stopped.
    t.settle(now + Duration::seconds(500));
    assert_eq!(t.phase(), TimerPhase::Response);
    assert_eq!(t.remaining(), 180);
    assert!(!t.is_running());
  }

  #[test]
  fn stop_folds_elapsed_time_into_remaining() {
    let mut t = timer();
    let now = Utc::now();
    t.start(now);
    t.stop(now + Duration::seconds(45));
    assert!(!t.is_running());
    assert_eq!(t.remaining(), 75);

    // Start is a no-op while already running.
    t.start(now + Duration::seconds(50));
    let since_first_start = t.remaining();
    t.start(now + Duration::seconds(50));
    assert_eq!(t.remaining(), since_first_start);
  }

  #[test]
  fn finish_skips_prep_then_zeroes_response() {
    let mut t = timer();
    let now = Utc::now();

    t.finish(now);
    assert_eq!(t.phase(), TimerPhase::Response);
    assert_eq!(t.remaining(), 180);
    assert!(!t.is_running());

    t.start(now);
    t.finish(now + Duration::seconds(10));
    assert_eq!(t.phase(), TimerPhase::Response);
    assert_eq!(t.remaining(), 0);
    assert!(!t.is_running());

    // Start at zero stays stopped.
    t.start(now + Duration::seconds(20));
    assert!(!t.is_running());
  }

  #[test]
  fn response_countdown_parks_at_zero() {
    let mut t = timer();
    let now = Utc::now();
    t.finish(now); // into response
    t.start(now);
    t.settle(now + Duration::seconds(1000));
    assert_eq!(t.phase(), TimerPhase::Response);
    assert_eq!(t.remaining(), 0);
    assert!(!t.is_running());
  }
}
