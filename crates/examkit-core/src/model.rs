//! Core data model types for examkit.
//!
//! Questions, lifecycle states, and finish reasons shared by the sampler,
//! the session controller, and the grader.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Marker shown in place of the chosen option when a question was left unanswered.
pub const NO_ANSWER: &str = "(no answer)";

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier. Defaults to the question's position in the bank.
    pub id: String,
    /// The question text.
    pub prompt: String,
    /// Option texts in order. Blank entries are never presented or selectable.
    pub options: Vec<String>,
    /// Zero-based index of the correct option.
    pub correct_index: usize,
    /// Shown in the answer review when explanations are enabled.
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    /// Whether `option` indexes a non-blank option.
    pub fn is_selectable(&self, option: usize) -> bool {
        self.options
            .get(option)
            .is_some_and(|text| !text.trim().is_empty())
    }

    /// Text of the option at `option`, if it exists.
    pub fn option_text(&self, option: usize) -> Option<&str> {
        self.options.get(option).map(String::as_str)
    }

    /// Text of the correct option (empty if the question is malformed).
    pub fn correct_text(&self) -> &str {
        self.option_text(self.correct_index).unwrap_or_default()
    }

    /// The selectable options paired with their original indices.
    pub fn visible_options(&self) -> impl Iterator<Item = (usize, &str)> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(index, text)| (index, text.as_str()))
    }
}

/// Letter label for an option index: `0 → "A"`, `1 → "B"`, ...
///
/// Indices past `Z` fall back to their one-based number.
pub fn option_letter(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'A' + i).to_string(),
        _ => (index + 1).to_string(),
    }
}

/// Parse a test-taker's option label (`"b"`, `"B"`, or one-based `"2"`) into an index.
pub fn parse_option_label(label: &str) -> Option<usize> {
    let label = label.trim();
    if let Ok(number) = label.parse::<usize>() {
        return number.checked_sub(1);
    }
    let mut chars = label.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some((c.to_ascii_uppercase() as u8 - b'A') as usize)
        }
        _ => None,
    }
}

/// Lifecycle state of the exam session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Active,
    Finished,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Active => write!(f, "active"),
            SessionState::Finished => write!(f, "finished"),
        }
    }
}

/// Why a session finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// The test-taker submitted.
    Manual,
    /// The countdown expired.
    Timeout,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Manual => write!(f, "manual"),
            FinishReason::Timeout => write!(f, "timeout"),
        }
    }
}

impl FromStr for FinishReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(FinishReason::Manual),
            "timeout" => Ok(FinishReason::Timeout),
            other => Err(format!("unknown finish reason: {other}")),
        }
    }
}

/// Configuration for the session controller.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Carry question explanations into the answer review.
    pub include_explanations: bool,
    /// Interval between visible countdown ticks.
    pub tick_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            include_explanations: false,
            tick_interval: Duration::from_secs(1),
        }
    }
}
