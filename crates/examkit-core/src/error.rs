//! Session error types.
//!
//! Every error here leaves the session state machine exactly where it was:
//! a rejected `start` keeps the previous phase, a rejected answer keeps the
//! recorded answers untouched.

use thiserror::Error;

/// Errors returned by [`SessionController`](crate::session::SessionController) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The question bank is missing or has no questions.
    #[error("question bank is empty")]
    EmptyBank,

    /// `start` was called while an exam is still active.
    #[error("an exam is already in progress; finish it first")]
    NotReady,

    /// The requested exam size is zero.
    #[error("exam size must be at least 1")]
    InvalidSize,

    /// The time limit is too large to schedule.
    #[error("exam duration of {secs}s is too long")]
    InvalidDuration { secs: u64 },

    /// An answer operation was attempted with no active exam.
    #[error("no exam is in progress")]
    NotActive,

    /// The question position does not exist in this exam.
    #[error("question {position} is out of range (exam has {total} questions)")]
    PositionOutOfRange { position: usize, total: usize },

    /// The option index is out of range or points at a blank option.
    #[error("option {option} is not a valid choice for question {position}")]
    InvalidOption { position: usize, option: usize },
}

impl SessionError {
    /// Returns `true` for rejected answers, which the caller may retry with valid input.
    pub fn is_invalid_answer(&self) -> bool {
        matches!(
            self,
            SessionError::PositionOutOfRange { .. } | SessionError::InvalidOption { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_invalid_answers() {
        assert!(SessionError::InvalidOption {
            position: 0,
            option: 9
        }
        .is_invalid_answer());
        assert!(SessionError::PositionOutOfRange {
            position: 7,
            total: 3
        }
        .is_invalid_answer());
        assert!(!SessionError::EmptyBank.is_invalid_answer());
        assert!(!SessionError::NotReady.is_invalid_answer());
    }

    #[test]
    fn messages_name_the_offending_input() {
        let err = SessionError::PositionOutOfRange {
            position: 7,
            total: 3,
        };
        assert_eq!(
            err.to_string(),
            "question 7 is out of range (exam has 3 questions)"
        );
    }
}
