//! Score report types with JSON persistence and the sink payload.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{option_letter, FinishReason, NO_ANSWER};

/// Name used in payloads when the test-taker left the name blank.
pub const ANONYMOUS: &str = "Anonymous";

/// A graded attempt. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// The session this report grades.
    pub session_id: Uuid,
    /// Test-taker name as entered (may be empty).
    pub taker: String,
    /// Whether the test-taker submitted or the countdown expired.
    pub reason: FinishReason,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Wall-clock time used, rounded to whole seconds.
    pub elapsed_secs: u64,
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    /// `correct / total * 100`, rounded half-up.
    pub percent: u32,
    /// One entry per exam question, in presentation order.
    pub breakdown: Vec<QuestionReview>,
}

/// Review entry for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReview {
    /// Zero-based position in the exam.
    pub position: usize,
    pub question_id: String,
    pub prompt: String,
    /// Chosen option index, `None` if unanswered.
    pub chosen: Option<usize>,
    /// Chosen option text, or [`NO_ANSWER`].
    pub chosen_text: String,
    pub correct_index: usize,
    pub correct_text: String,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionReview {
    /// `"B - Paris"`, or the no-answer marker.
    pub fn chosen_label(&self) -> String {
        match self.chosen {
            Some(i) => labelled(i, &self.chosen_text),
            None => NO_ANSWER.to_string(),
        }
    }

    /// `"B - Paris"` for the correct option.
    pub fn correct_label(&self) -> String {
        labelled(self.correct_index, &self.correct_text)
    }
}

fn labelled(index: usize, text: &str) -> String {
    if text.is_empty() {
        option_letter(index)
    } else {
        format!("{} - {}", option_letter(index), text)
    }
}

impl ScoreReport {
    /// Test-taker name with the anonymous fallback applied.
    pub fn display_name(&self) -> &str {
        let name = self.taker.trim();
        if name.is_empty() {
            ANONYMOUS
        } else {
            name
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ScoreReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the score and answer review as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Score:** {} / {} ({}%)\n\n",
            self.correct, self.total, self.percent
        ));
        md.push_str(&format!("**Student:** {}\n\n", self.display_name()));
        md.push_str(&format!(
            "**Questions answered:** {} / {}\n\n",
            self.answered, self.total
        ));
        md.push_str(&format!("**Time used:** {} seconds\n\n", self.elapsed_secs));
        if self.reason == FinishReason::Timeout {
            md.push_str("_Time ran out; the exam was submitted automatically._\n\n");
        }

        md.push_str("## Answer Review\n\n");
        for r in &self.breakdown {
            md.push_str(&format!("### {}. {}\n\n", r.position + 1, r.prompt));
            md.push_str(&format!("- Your answer: {}\n", r.chosen_label()));
            md.push_str(&format!("- Correct answer: {}\n", r.correct_label()));
            md.push_str(&format!(
                "- Result: {}\n",
                if r.is_correct { "Correct" } else { "Incorrect" }
            ));
            if let Some(explanation) = &r.explanation {
                md.push_str(&format!("- Explanation: {explanation}\n"));
            }
            md.push('\n');
        }

        md
    }
}

/// The payload handed to report sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub session_id: Uuid,
    /// Never empty: blank names become [`ANONYMOUS`].
    pub student_name: String,
    /// Correct answers.
    pub score: usize,
    pub total: usize,
    pub percent: u32,
    pub answered: usize,
    pub duration_sec: u64,
    pub finish_reason: FinishReason,
    pub submitted_at: DateTime<Utc>,
    pub breakdown: Vec<QuestionReview>,
}

impl From<&ScoreReport> for ReportPayload {
    fn from(report: &ScoreReport) -> Self {
        Self {
            session_id: report.session_id,
            student_name: report.display_name().to_string(),
            score: report.correct,
            total: report.total,
            percent: report.percent,
            answered: report.answered,
            duration_sec: report.elapsed_secs,
            finish_reason: report.reason,
            submitted_at: report.ended_at,
            breakdown: report.breakdown.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_report(taker: &str, reason: FinishReason) -> ScoreReport {
        let now = Utc::now();
        ScoreReport {
            session_id: Uuid::nil(),
            taker: taker.into(),
            reason,
            started_at: now,
            ended_at: now,
            elapsed_secs: 42,
            total: 2,
            answered: 1,
            correct: 1,
            percent: 50,
            breakdown: vec![
                QuestionReview {
                    position: 0,
                    question_id: "cap".into(),
                    prompt: "Capital of France?".into(),
                    chosen: Some(1),
                    chosen_text: "Paris".into(),
                    correct_index: 1,
                    correct_text: "Paris".into(),
                    is_correct: true,
                    explanation: Some("Since 987.".into()),
                },
                QuestionReview {
                    position: 1,
                    question_id: "sum".into(),
                    prompt: "2 + 2?".into(),
                    chosen: None,
                    chosen_text: NO_ANSWER.into(),
                    correct_index: 0,
                    correct_text: "4".into(),
                    is_correct: false,
                    explanation: None,
                },
            ],
        }
    }

    #[test]
    fn payload_uses_anonymous_for_blank_names() {
        let payload = ReportPayload::from(&make_report("   ", FinishReason::Manual));
        assert_eq!(payload.student_name, ANONYMOUS);
        assert_eq!(payload.score, 1);
        assert_eq!(payload.duration_sec, 42);

        let named = ReportPayload::from(&make_report(" Ada ", FinishReason::Manual));
        assert_eq!(named.student_name, "Ada");
    }

    #[test]
    fn payload_serializes_camel_case() {
        let payload = ReportPayload::from(&make_report("Ada", FinishReason::Timeout));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["studentName"], "Ada");
        assert_eq!(value["durationSec"], 42);
        assert_eq!(value["finishReason"], "timeout");
        assert_eq!(value["breakdown"][1]["chosen"], serde_json::Value::Null);
    }

    #[test]
    fn labels() {
        let report = make_report("Ada", FinishReason::Manual);
        assert_eq!(report.breakdown[0].chosen_label(), "B - Paris");
        assert_eq!(report.breakdown[1].chosen_label(), NO_ANSWER);
        assert_eq!(report.breakdown[1].correct_label(), "A - 4");
    }

    #[test]
    fn json_roundtrip() {
        let report = make_report("Ada", FinishReason::Manual);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");

        report.save_json(&path).unwrap();
        let loaded = ScoreReport::load_json(&path).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn markdown_output() {
        let md = make_report("", FinishReason::Timeout).to_markdown();
        assert!(md.contains("**Score:** 1 / 2 (50%)"));
        assert!(md.contains("Anonymous"));
        assert!(md.contains("submitted automatically"));
        assert!(md.contains("Your answer: (no answer)"));
        assert!(md.contains("Explanation: Since 987."));
    }
}
