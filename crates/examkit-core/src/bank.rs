//! JSON question bank loader.
//!
//! Loads question banks from JSON files and validates them.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::Question;

/// Intermediate JSON structure for a single bank record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonQuestion {
    #[serde(default)]
    id: Option<JsonId>,
    question: String,
    #[serde(default)]
    options: Vec<String>,
    correct_index: usize,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonId {
    Text(String),
    Number(i64),
}

/// An ordered, validated collection of questions.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Build a bank, rejecting any question whose correct index does not
    /// reference a non-blank option.
    pub fn new(questions: Vec<Question>) -> Result<Self> {
        for (position, q) in questions.iter().enumerate() {
            anyhow::ensure!(
                q.is_selectable(q.correct_index),
                "question {position} ({}): correctIndex {} does not reference a non-empty option",
                q.id,
                q.correct_index
            );
        }
        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Parse a JSON bank file.
pub fn load_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a JSON string into a `QuestionBank` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: Vec<JsonQuestion> = serde_json::from_str(content)
        .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?;

    let questions = parsed
        .into_iter()
        .enumerate()
        .map(|(position, q)| Question {
            id: match q.id {
                Some(JsonId::Text(id)) => id,
                Some(JsonId::Number(id)) => id.to_string(),
                None => position.to_string(),
            },
            prompt: q.question,
            options: q.options,
            correct_index: q.correct_index,
            explanation: q.explanation.filter(|e| !e.trim().is_empty()),
        })
        .collect();

    QuestionBank::new(questions)
        .with_context(|| format!("invalid question bank: {}", source_path.display()))
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a bank for issues that do not prevent an exam from running.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no questions; an exam cannot be started".into(),
        });
    }

    let mut seen_ids = std::collections::HashSet::new();
    for q in bank.questions() {
        if !seen_ids.insert(&q.id) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("duplicate question ID: {}", q.id),
            });
        }
    }

    for q in bank.questions() {
        if q.prompt.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "question text is empty".into(),
            });
        }
    }

    for q in bank.questions() {
        let choices = q.visible_options().count();
        if choices < 2 {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("only {choices} selectable option(s)"),
            });
        }
    }

    warnings
}
