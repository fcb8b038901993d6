//! The `examkit review` command, plus the text rendering shared with `take`.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;

use examkit_core::model::FinishReason;
use examkit_core::report::ScoreReport;
use examkit_report::html::generate_html;

pub fn execute(report_path: PathBuf, format: String) -> Result<()> {
    let report = ScoreReport::load_json(&report_path)?;

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "html" => {
            println!("{}", generate_html(&report));
        }
        "text" => {
            println!("{}", summary_table(&report));
            println!();
            print!("{}", answer_review(&report));
        }
        other => anyhow::bail!("unknown format: {other} (expected text, markdown, or html)"),
    }

    Ok(())
}

/// Score summary as a table.
pub(crate) fn summary_table(report: &ScoreReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Student", "Score", "Percent", "Answered", "Time used", "Finished by"]);
    table.add_row(vec![
        report.display_name().to_string(),
        format!("{} / {}", report.correct, report.total),
        format!("{}%", report.percent),
        format!("{} / {}", report.answered, report.total),
        format!("{}s", report.elapsed_secs),
        match report.reason {
            FinishReason::Manual => "submission".to_string(),
            FinishReason::Timeout => "timeout".to_string(),
        },
    ]);
    table
}

/// Per-question review: chosen answer, correct answer, explanation.
pub(crate) fn answer_review(report: &ScoreReport) -> String {
    let mut out = String::from("Answer review\n\n");
    for r in &report.breakdown {
        let verdict = match (r.is_correct, r.chosen) {
            (true, _) => "correct",
            (false, None) => "unanswered",
            (false, Some(_)) => "incorrect",
        };
        out.push_str(&format!("{}. {} [{verdict}]\n", r.position + 1, r.prompt));
        out.push_str(&format!("   Your answer:    {}\n", r.chosen_label()));
        out.push_str(&format!("   Correct answer: {}\n", r.correct_label()));
        if let Some(explanation) = &r.explanation {
            out.push_str(&format!("   {explanation}\n"));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use examkit_core::model::NO_ANSWER;
    use examkit_core::report::QuestionReview;

    fn report() -> ScoreReport {
        ScoreReport {
            session_id: uuid::Uuid::nil(),
            taker: String::new(),
            reason: FinishReason::Timeout,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            elapsed_secs: 60,
            total: 2,
            answered: 1,
            correct: 1,
            percent: 50,
            breakdown: vec![
                QuestionReview {
                    position: 0,
                    question_id: "0".into(),
                    prompt: "Largest planet?".into(),
                    chosen: Some(2),
                    chosen_text: "Jupiter".into(),
                    correct_index: 2,
                    correct_text: "Jupiter".into(),
                    is_correct: true,
                    explanation: Some("It is a gas giant.".into()),
                },
                QuestionReview {
                    position: 1,
                    question_id: "1".into(),
                    prompt: "Smallest planet?".into(),
                    chosen: None,
                    chosen_text: NO_ANSWER.into(),
                    correct_index: 0,
                    correct_text: "Mercury".into(),
                    is_correct: false,
                    explanation: None,
                },
            ],
        }
    }

    #[test]
    fn review_lists_every_question() {
        let text = answer_review(&report());
        assert!(text.contains("1. Largest planet? [correct]"));
        assert!(text.contains("Your answer:    C - Jupiter"));
        assert!(text.contains("It is a gas giant."));
        assert!(text.contains("2. Smallest planet? [unanswered]"));
        assert!(text.contains("Your answer:    (no answer)"));
        assert!(text.contains("Correct answer: A - Mercury"));
    }

    #[test]
    fn summary_shows_anonymous_and_reason() {
        let table = summary_table(&report()).to_string();
        assert!(table.contains("Anonymous"));
        assert!(table.contains("1 / 2"));
        assert!(table.contains("50%"));
        assert!(table.contains("timeout"));
    }
}
