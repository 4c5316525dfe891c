//! Public request/response DTOs for the HTTP API (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::MappedRow;
use crate::session::{PracticeTimer, QuizPhase, QuizSession, TimerPhase};
use crate::streak::StreakLedger;

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct OkOut {
    pub ok: bool,
}

//
// Streak
//

#[derive(Serialize)]
pub struct RecentDayOut {
    pub date: NaiveDate,
    pub label: String,
    pub revealed: bool,
}

#[derive(Serialize)]
pub struct StreakOut {
    #[serde(rename = "lastReveal")]
    pub last_reveal: Option<NaiveDate>,
    pub current: u32,
    pub best: u32,
    #[serde(rename = "totalReveals")]
    pub total_reveals: u32,
    #[serde(rename = "checkedInToday")]
    pub checked_in_today: bool,
    #[serde(rename = "goalDays")]
    pub goal_days: u32,
    pub recent: Vec<RecentDayOut>,
}

/// Snapshot the ledger plus its 7-day mini calendar.
pub fn streak_out(ledger: &StreakLedger, today: NaiveDate, goal_days: u32) -> StreakOut {
    let recent = ledger
        .recent_days(today, 7)
        .into_iter()
        .map(|cell| RecentDayOut {
            date: cell.date,
            label: cell.label,
            revealed: cell.revealed,
        })
        .collect();
    StreakOut {
        last_reveal: ledger.last_reveal,
        current: ledger.current,
        best: ledger.best,
        total_reveals: ledger.total_reveals,
        checked_in_today: ledger.checked_in_today(today),
        goal_days,
        recent,
    }
}

//
// MMI questions
//

/// Daily question with the answer withheld; revealing is a separate,
/// streak-recording operation.
#[derive(Serialize)]
pub struct DailyQuestionOut {
    pub id: i64,
    pub question: Option<String>,
}

#[derive(Serialize)]
pub struct RevealOut {
    pub id: i64,
    pub answer: Option<String>,
    pub stats: StreakOut,
}

#[derive(Serialize)]
pub struct PracticeOut {
    pub id: i64,
    pub question: Option<String>,
    pub answer: Option<String>,
}

//
// Submissions & upload
//

#[derive(Deserialize)]
pub struct MmiSubmitIn {
    pub question: String,
    pub answer: String,
}

#[derive(Deserialize)]
pub struct UcatSubmitIn {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: u8,
    #[serde(default)]
    pub section: String,
}

#[derive(Serialize)]
pub struct SubmitOut {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UploadOut {
    pub inserted: usize,
    pub preview: Vec<MappedRow>,
}

//
// UCAT quiz sessions
//

#[derive(Deserialize)]
pub struct QuizSessionIn {
    pub sections: Vec<String>,
    /// Present means timed practice with this countdown.
    #[serde(default)]
    pub minutes: Option<u32>,
    #[serde(rename = "questionCount")]
    pub question_count: usize,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    pub choice: u8,
}

#[derive(Debug, Serialize)]
pub struct QuizOptionOut {
    pub n: u8,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct QuizQuestionOut {
    pub id: i64,
    pub section: Option<String>,
    pub question: Option<String>,
    pub options: Vec<QuizOptionOut>,
}

#[derive(Debug, Serialize)]
pub struct OutcomeOut {
    pub number: usize,
    #[serde(rename = "questionId")]
    pub question_id: i64,
    pub chosen: u8,
    pub correct: bool,
}

#[derive(Debug, Serialize)]
pub struct QuizSummaryOut {
    pub total: usize,
    pub correct: usize,
    pub outcomes: Vec<OutcomeOut>,
}

#[derive(Debug, Serialize)]
pub struct QuizStateOut {
    pub id: String,
    pub phase: &'static str,
    #[serde(rename = "questionNumber")]
    pub question_number: usize,
    #[serde(rename = "totalQuestions")]
    pub total_questions: usize,
    #[serde(rename = "remainingSeconds")]
    pub remaining_seconds: Option<u64>,
    pub question: Option<QuizQuestionOut>,
    pub summary: Option<QuizSummaryOut>,
}

/// Convert a session (internal) to the public DTO. Options are listed as
/// numbered text for the non-empty positions only.
pub fn quiz_state_out(session: &QuizSession, now: DateTime<Utc>) -> QuizStateOut {
    let phase = match session.phase() {
        QuizPhase::InProgress => "in_progress",
        QuizPhase::Summary => "summary",
    };
    let question = session.current_question().map(|q| QuizQuestionOut {
        id: q.id,
        section: q.section.map(|s| s.code().to_string()),
        question: q.question.clone(),
        options: (1..=5)
            .filter_map(|n| {
                q.option_text(n).map(|text| QuizOptionOut { n, text: text.to_string() })
            })
            .collect(),
    });
    let summary = session.summary().map(|s| QuizSummaryOut {
        total: s.total,
        correct: s.correct,
        outcomes: s
            .outcomes
            .into_iter()
            .map(|o| OutcomeOut {
                number: o.number,
                question_id: o.question_id,
                chosen: o.chosen,
                correct: o.correct,
            })
            .collect(),
    });
    QuizStateOut {
        id: session.id.to_string(),
        phase,
        question_number: session.question_number(),
        total_questions: session.total_questions(),
        remaining_seconds: session.remaining_seconds(now),
        question,
        summary,
    }
}

//
// MMI practice timers
//

#[derive(Deserialize)]
pub struct TimerIn {
    /// Both default to the configured presets when omitted.
    #[serde(rename = "prepSeconds")]
    pub prep_seconds: Option<u32>,
    #[serde(rename = "responseSeconds")]
    pub response_seconds: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TimerOut {
    pub id: String,
    pub phase: &'static str,
    #[serde(rename = "remainingSeconds")]
    pub remaining_seconds: u32,
    pub running: bool,
    #[serde(rename = "prepSeconds")]
    pub prep_seconds: u32,
    #[serde(rename = "responseSeconds")]
    pub response_seconds: u32,
}

pub fn timer_out(timer: &PracticeTimer) -> TimerOut {
    let phase = match timer.phase() {
        TimerPhase::Prep => "prep",
        TimerPhase::Response => "response",
    };
    TimerOut {
        id: timer.id.to_string(),
        phase,
        remaining_seconds: timer.remaining(),
        running: timer.is_running(),
        prep_seconds: timer.prep_secs(),
        response_seconds: timer.response_secs(),
    }
}
