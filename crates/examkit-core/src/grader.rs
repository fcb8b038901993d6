//! Grading and scoring.
//!
//! Grading is a pure function of the sampled questions and the recorded
//! choices; the session wrapper only adds timing and identity.

use std::collections::BTreeMap;

use crate::model::{Question, NO_ANSWER};
use crate::report::{QuestionReview, ScoreReport};
use crate::session::{Completion, Session};

/// Counts and per-question breakdown for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub percent: u32,
    pub breakdown: Vec<QuestionReview>,
}

/// Integer percentage of `part` in `total`, rounded half-up. Zero when `total` is zero.
pub fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = (part as u128 * 100 * 2 + total as u128) / (total as u128 * 2);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Score recorded choices against their questions.
///
/// `answers` maps question position to the chosen option index; missing
/// positions are unanswered.
pub fn score(
    questions: &[Question],
    answers: &BTreeMap<usize, usize>,
    include_explanations: bool,
) -> Grade {
    let mut answered = 0;
    let mut correct = 0;

    let breakdown: Vec<QuestionReview> = questions
        .iter()
        .enumerate()
        .map(|(position, q)| {
            let chosen = answers.get(&position).copied();
            let is_correct = chosen == Some(q.correct_index);
            if chosen.is_some() {
                answered += 1;
            }
            if is_correct {
                correct += 1;
            }

            QuestionReview {
                position,
                question_id: q.id.clone(),
                prompt: q.prompt.clone(),
                chosen,
                chosen_text: match chosen {
                    Some(i) => q.option_text(i).unwrap_or_default().to_string(),
                    None => NO_ANSWER.to_string(),
                },
                correct_index: q.correct_index,
                correct_text: q.correct_text().to_string(),
                is_correct,
                explanation: if include_explanations {
                    q.explanation.clone()
                } else {
                    None
                },
            }
        })
        .collect();

    let total = questions.len();
    Grade {
        total,
        answered,
        correct,
        percent: percent(correct, total),
        breakdown,
    }
}

/// Grade a finished session into its immutable report.
pub fn grade(
    session: &Session,
    completion: &Completion,
    include_explanations: bool,
) -> ScoreReport {
    let grade = score(session.questions(), session.answers(), include_explanations);

    ScoreReport {
        session_id: session.id(),
        taker: session.taker().to_string(),
        reason: completion.reason,
        started_at: session.started_at(),
        ended_at: completion.ended_at,
        elapsed_secs: rounded_secs(completion.elapsed),
        total: grade.total,
        answered: grade.answered,
        correct: grade.correct,
        percent: grade.percent,
        breakdown: grade.breakdown,
    }
}

fn rounded_secs(elapsed: std::time::Duration) -> u64 {
    let millis = elapsed.as_millis() + 500;
    u64::try_from(millis / 1000).unwrap_or(u64::MAX)
}
