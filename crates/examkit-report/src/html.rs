//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use examkit_core::model::FinishReason;
use examkit_core::report::ScoreReport;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML answer review from a score report.
pub fn generate_html(report: &ScoreReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Exam results: {}</title>\n",
        html_escape(report.display_name())
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>Exam results</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Student: <strong>{}</strong> | {} questions | finished {}</p>\n",
        html_escape(report.display_name()),
        report.total,
        report.ended_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if report.reason == FinishReason::Timeout {
        html.push_str("<p class=\"notice\">Time ran out; the exam was submitted automatically.</p>\n");
    }
    html.push_str("</header>\n");

    // Score
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Score</h2>\n");
    html.push_str(&format!(
        "<p class=\"score\">{} / {} <span>({}%)</span></p>\n",
        report.correct, report.total, report.percent
    ));
    html.push_str(&score_bar(report.percent));
    html.push_str("<table class=\"summary\">\n<tbody>\n");
    html.push_str(&format!(
        "<tr><th>Answered</th><td>{} / {}</td></tr>\n",
        report.answered, report.total
    ));
    html.push_str(&format!(
        "<tr><th>Time used</th><td>{}</td></tr>\n",
        format_elapsed(report.elapsed_secs)
    ));
    html.push_str(&format!(
        "<tr><th>Finished by</th><td>{}</td></tr>\n",
        match report.reason {
            FinishReason::Manual => "submission",
            FinishReason::Timeout => "timeout",
        }
    ));
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Answer review
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Answer review</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">#</th><th onclick=\"sortTable(1)\">Question</th><th onclick=\"sortTable(2)\">Your answer</th><th onclick=\"sortTable(3)\">Correct answer</th><th onclick=\"sortTable(4)\">Result</th></tr></thead>\n");
    html.push_str("<tbody>\n");

    for r in &report.breakdown {
        let class = if r.is_correct {
            "pass"
        } else if r.chosen.is_none() {
            "skip"
        } else {
            "fail"
        };
        let result_text = match (r.is_correct, r.chosen) {
            (true, _) => "Correct",
            (false, None) => "Unanswered",
            (false, Some(_)) => "Incorrect",
        };

        let mut prompt = html_escape(&r.prompt);
        if let Some(explanation) = &r.explanation {
            prompt.push_str(&format!(
                "<div class=\"explanation\">{}</div>",
                html_escape(explanation)
            ));
        }

        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            class,
            r.position + 1,
            prompt,
            html_escape(&r.chosen_label()),
            html_escape(&r.correct_label()),
            result_text
        ));
    }

    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &ScoreReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn format_elapsed(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

fn score_bar(percent: u32) -> String {
    let max_width = 400;
    let bar_height = 24;
    let width = percent.min(100) as usize * max_width / 100;

    let color = if percent >= 80 {
        "#22c55e"
    } else if percent >= 50 {
        "#eab308"
    } else {
        "#ef4444"
    };

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        max_width, bar_height
    );
    svg.push_str(&format!(
        "  <rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"var(--border)\" rx=\"4\"/>\n",
        max_width, bar_height
    ));
    svg.push_str(&format!(
        "  <rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
        width, bar_height, color
    ));
    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --skip: #fef9c3; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --skip: #713f12; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.notice { font-weight: bold; color: #b45309; }
.score { font-size: 2.5rem; font-weight: bold; margin: 0.5rem 0; }
.score span { font-size: 1.5rem; color: #6b7280; }
.explanation { margin-top: 0.5rem; font-size: 0.9rem; color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
table.summary { width: auto; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; vertical-align: top; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.skip { background: var(--skip); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  const key = cell => col === 0 ? Number(cell.textContent) : cell.textContent;
  rows.sort((a, b) => {
    const va = key(a.cells[col]);
    const vb = key(b.cells[col]);
    if (col === 0) return asc ? va - vb : vb - va;
    return asc ? va.localeCompare(vb) : vb.localeCompare(va);
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
