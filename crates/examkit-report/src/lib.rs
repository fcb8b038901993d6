//! examkit-report: rendering of graded exams.
//!
//! Produces a self-contained HTML page with the score and a per-question
//! answer review.

pub mod html;

pub use html::{generate_html, write_html_report};
