//! Seed question bank.
//!
//! A small built-in set of MMI and UCAT questions that keeps the app
//! useful (and testable) when no remote store is configured.

use crate::domain::{MmiQuestion, UcatQuestion, UcatSection};

/// Built-in MMI prompts with model answers.
pub fn seed_mmi() -> Vec<MmiQuestion> {
  let rows = [
    (
      "Describe a time you had to manage conflict within a team. What did you do, and what would you do differently?",
      "Structure the response: set the scene briefly, name the conflict, describe your specific actions, then reflect. Emphasise listening to both sides before acting and close with what you learned.",
    ),
    (
      "A close friend on your course admits they submitted plagiarised work. What do you do?",
      "Balance loyalty against academic integrity. Encourage the friend to self-report first, explain the consequences of staying silent, and escalate only if they refuse. Show that patient safety culture starts with honesty.",
    ),
    (
      "You are a junior doctor and notice a senior colleague smelling of alcohol before a shift. Walk us through your thinking.",
      "Lead with patient safety: the colleague must not see patients until the concern is resolved. Raise it directly but privately, involve the duty consultant if needed, and reference escalation policy rather than personal judgement.",
    ),
    (
      "Tell us about a time you received difficult feedback. How did you respond?",
      "Pick a genuine example. Describe the feedback plainly, the initial reaction, and the concrete change made afterwards. Interviewers look for reflection rather than a disguised strength.",
    ),
    (
      "Should healthcare be free at the point of use? Argue both sides before giving your view.",
      "Present equity and public-health arguments for, then cost, rationing and moral-hazard arguments against. Commit to a position at the end and justify it with one or two of the strongest points.",
    ),
  ];
  rows
    .iter()
    .enumerate()
    .map(|(i, (q, a))| MmiQuestion {
      id: (i + 1) as i64,
      question: Some((*q).to_string()),
      answer: Some((*a).to_string()),
    })
    .collect()
}

/// Built-in UCAT questions, one or more per section, all answerable.
pub fn seed_ucat() -> Vec<UcatQuestion> {
  fn q(
    id: i64,
    question: &str,
    options: [&str; 5],
    correct: u8,
    section: UcatSection,
  ) -> UcatQuestion {
    let slot = |s: &str| {
      if s.is_empty() { None } else { Some(s.to_string()) }
    };
    UcatQuestion {
      id,
      question: Some(question.to_string()),
      answer1: slot(options[0]),
      answer2: slot(options[1]),
      answer3: slot(options[2]),
      answer4: slot(options[3]),
      answer5: slot(options[4]),
      correct_answer: Some(correct),
      section: Some(section),
    }
  }

  vec![
    q(
      1,
      "The passage states that screening uptake fell in rural areas after 2019. Which conclusion is best supported?",
      [
        "Screening is ineffective in rural areas",
        "Access barriers may have increased after 2019",
        "Urban uptake rose after 2019",
        "Rural residents distrust screening",
        "",
      ],
      2,
      UcatSection::Vr,
    ),
    q(
      2,
      "All cardiologists are doctors. Some doctors are researchers. Which statement must be true?",
      [
        "Some cardiologists are researchers",
        "All researchers are doctors",
        "Some doctors are cardiologists",
        "No researchers are cardiologists",
        "",
      ],
      3,
      UcatSection::Dm,
    ),
    q(
      3,
      "A ward uses 480 gloves per 12-hour shift. At the same rate, how many gloves are used in 45 minutes?",
      ["24", "30", "36", "40", "48"],
      2,
      UcatSection::Qr,
    ),
    q(
      4,
      "A patient's infusion rate is doubled from 25 ml/h for the final 3 hours of a 9-hour infusion. What total volume is delivered?",
      ["225 ml", "250 ml", "300 ml", "325 ml", "375 ml"],
      3,
      UcatSection::Qr,
    ),
    q(
      5,
      "A fellow student regularly misses group sessions, leaving others to cover. How appropriate is it to raise this with the student privately first?",
      [
        "A very appropriate thing to do",
        "Appropriate, but not ideal",
        "Inappropriate, but not awful",
        "A very inappropriate thing to do",
        "",
      ],
      1,
      UcatSection::Sjt,
    ),
  ]
}
