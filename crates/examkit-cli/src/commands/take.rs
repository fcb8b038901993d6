//! The `examkit take` command.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use examkit_core::bank::load_bank;
use examkit_core::clock::format_remaining;
use examkit_core::model::{option_letter, parse_option_label, FinishReason};
use examkit_core::report::ScoreReport;
use examkit_core::sampler::Sampler;
use examkit_core::{SessionController, SessionError, SessionEvent};
use examkit_report::html::write_html_report;
use examkit_sinks::config::load_config_from;

use super::review::{answer_review, summary_table};

/// Longest time limit `take` accepts.
const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// How long to wait for report sinks before exiting.
const DELIVERY_GRACE: Duration = Duration::from_secs(30);

const HELP: &str = "\
Commands:
  <n> <option>   answer question n (option as letter or number, e.g. `3 b`)
  clear <n>      remove your answer to question n
  show           list all questions and your answers
  status         answered count and time left
  finish         submit the exam
  help           show this help";

/// One line of test-taker input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Zero-based position and option index.
    Answer { position: usize, option: usize },
    Clear { position: usize },
    Show,
    Status,
    Finish,
    Help,
    Nothing,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let position = |word: &str| {
        word.parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(|| format!("'{word}' is not a question number"))
    };

    match words.as_slice() {
        [] => Ok(Command::Nothing),
        [cmd] => match cmd.to_lowercase().as_str() {
            "show" | "list" => Ok(Command::Show),
            "status" => Ok(Command::Status),
            "finish" | "submit" => Ok(Command::Finish),
            "help" | "?" => Ok(Command::Help),
            _ => Err(format!("unknown command '{cmd}'")),
        },
        [cmd, n] if cmd.eq_ignore_ascii_case("clear") => Ok(Command::Clear {
            position: position(*n)?,
        }),
        [n, label] => Ok(Command::Answer {
            position: position(*n)?,
            option: parse_option_label(label)
                .ok_or_else(|| format!("'{label}' is not an option label"))?,
        }),
        _ => Err(format!("could not understand '{}'", line.trim())),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    bank_path: PathBuf,
    size: Option<usize>,
    duration_secs: Option<u64>,
    untimed: bool,
    name: Option<String>,
    seed: Option<u64>,
    explanations: bool,
    output: PathBuf,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    // Load config; flags override the [exam] table
    let config = load_config_from(config_path.as_deref())?;
    let mut settings = config.exam.clone();
    if let Some(size) = size {
        settings.size = size;
    }
    if untimed {
        settings.duration_secs = None;
    } else if let Some(secs) = duration_secs {
        settings.duration_secs = Some(secs);
    }
    settings.include_explanations |= explanations;

    anyhow::ensure!(settings.size >= 1, "size must be at least 1");
    if let Some(secs) = settings.duration_secs {
        anyhow::ensure!(
            (1..=MAX_DURATION_SECS).contains(&secs),
            "duration must be between 1 and {MAX_DURATION_SECS} seconds, got {secs}"
        );
    }
    let formats = parse_formats(&format)?;

    let bank = load_bank(&bank_path)?;

    let mut controller = SessionController::new(settings.session_config());
    if let Some(seed) = seed {
        controller = controller.with_sampler(Sampler::seeded(seed));
    }
    for sink in config.build_sinks()? {
        tracing::debug!(sink = sink.name(), "report sink enabled");
        controller = controller.with_sink(sink);
    }
    controller.set_taker(name.unwrap_or_default());

    let session = controller.start(bank.questions(), settings.size, settings.duration())?;
    let mut stdout = std::io::stdout();
    writeln!(
        stdout,
        "examkit v{}: {} questions{}",
        env!("CARGO_PKG_VERSION"),
        session.questions().len(),
        match session.duration() {
            Some(limit) => format!(", {} to finish", format_remaining(limit)),
            None => String::new(),
        }
    )?;

    let report = run_exam(&mut controller, spawn_stdin_reader(), &mut stdout).await?;

    println!();
    println!("{}", summary_table(&report));
    println!();
    print!("{}", answer_review(&report));

    // Save outputs
    if !formats.is_empty() {
        std::fs::create_dir_all(&output)?;
        let timestamp = report.ended_at.format("%Y-%m-%dT%H%M%S");
        for fmt in &formats {
            match *fmt {
                "json" => {
                    let path = output.join(format!("report-{timestamp}.json"));
                    report.save_json(&path)?;
                    eprintln!("Results saved to: {}", path.display());
                }
                "html" => {
                    let path = output.join(format!("report-{timestamp}.html"));
                    write_html_report(&report, &path)?;
                    eprintln!("HTML report: {}", path.display());
                }
                other => anyhow::bail!("unknown format: {other}"),
            }
        }
    }

    if let Some(delivery) = controller.take_delivery() {
        match tokio::time::timeout(DELIVERY_GRACE, delivery).await {
            Ok(Ok(summary)) if summary.failed > 0 => {
                eprintln!(
                    "Warning: {} of {} report sink(s) failed; see log for details.",
                    summary.failed,
                    summary.failed + summary.delivered
                );
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("report delivery task failed: {e}"),
            Err(_) => eprintln!("Warning: report delivery did not finish in time."),
        }
    }

    Ok(())
}

fn parse_formats(format: &str) -> Result<Vec<&str>> {
    let formats: Vec<&str> = match format {
        "all" => vec!["json", "html"],
        "none" => vec![],
        other => other.split(',').map(str::trim).collect(),
    };
    for fmt in &formats {
        anyhow::ensure!(
            matches!(*fmt, "json" | "html"),
            "unknown format: {fmt} (expected json, html, all, or none)"
        );
    }
    Ok(formats)
}

/// Read stdin lines on a detached thread.
///
/// A blocking stdin read cannot be cancelled, so it must not live on the
/// runtime; the thread is simply abandoned when the process exits.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::debug!("stdin closed: {e}");
                    break;
                }
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Drive an active exam until it finishes, reading commands from `input`.
///
/// Whichever comes first of `finish`, end of input (the channel closing),
/// or the countdown deadline ends the exam.
async fn run_exam<W: Write>(
    controller: &mut SessionController,
    mut input: mpsc::Receiver<String>,
    out: &mut W,
) -> Result<ScoreReport> {
    show_questions(controller, out)?;
    writeln!(out, "Type `help` for commands.")?;

    loop {
        tokio::select! {
            event = controller.next_event() => match event {
                SessionEvent::Tick { remaining } => {
                    if worth_announcing(remaining) {
                        writeln!(out, "Time left: {}", format_remaining(remaining))?;
                    }
                }
                SessionEvent::Finished(report) => {
                    writeln!(out, "\nTime is up! Your answers were submitted automatically.")?;
                    return Ok(report);
                }
            },
            line = input.recv() => {
                let Some(line) = line else {
                    return submit(controller);
                };
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        writeln!(out, "{message} (type `help` for commands)")?;
                        continue;
                    }
                };
                if command == Command::Finish {
                    return submit(controller);
                }
                apply(controller, command, out)?;
            }
        }
    }
}

fn submit(controller: &mut SessionController) -> Result<ScoreReport> {
    controller
        .finish(FinishReason::Manual)
        .context("the exam had already finished")
}

fn apply<W: Write>(
    controller: &mut SessionController,
    command: Command,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Answer { position, option } => match controller.record_answer(position, option) {
            Ok(()) => {
                let progress = controller.progress();
                writeln!(
                    out,
                    "Question {}: {} ({}/{} answered)",
                    position + 1,
                    option_letter(option),
                    progress.answered,
                    progress.total
                )?;
            }
            Err(e) => writeln!(out, "{}", describe_rejection(&e))?,
        },
        Command::Clear { position } => match controller.clear_answer(position) {
            Ok(Some(_)) => writeln!(out, "Question {}: answer cleared", position + 1)?,
            Ok(None) => writeln!(out, "Question {} had no answer", position + 1)?,
            Err(e) => writeln!(out, "{}", describe_rejection(&e))?,
        },
        Command::Show => show_questions(controller, out)?,
        Command::Status => {
            let progress = controller.progress();
            write!(
                out,
                "Answered {}/{} ({}%)",
                progress.answered, progress.total, progress.percent
            )?;
            match controller.remaining() {
                Some(remaining) => writeln!(out, ", time left {}", format_remaining(remaining))?,
                None => writeln!(out)?,
            }
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Finish | Command::Nothing => {}
    }
    Ok(())
}

/// Rejections phrased with the one-based numbers the test-taker typed.
fn describe_rejection(error: &SessionError) -> String {
    match error {
        SessionError::PositionOutOfRange { position, total } => {
            format!("There is no question {}; pick 1-{total}.", position + 1)
        }
        SessionError::InvalidOption { position, option } => format!(
            "{} is not an option for question {}.",
            option_letter(*option),
            position + 1
        ),
        other => other.to_string(),
    }
}

fn show_questions<W: Write>(controller: &SessionController, out: &mut W) -> Result<()> {
    let Some(session) = controller.session() else {
        return Ok(());
    };
    for (position, q) in session.questions().iter().enumerate() {
        writeln!(out, "\n{}. {}", position + 1, q.prompt)?;
        for (index, text) in q.visible_options() {
            let marker = if session.answer(position) == Some(index) {
                "*"
            } else {
                " "
            };
            writeln!(out, "  {marker} {}) {text}", option_letter(index))?;
        }
    }
    writeln!(out)?;
    Ok(())
}

/// Announce whole minutes and the last ten seconds.
fn worth_announcing(remaining: Duration) -> bool {
    let secs = remaining.as_millis().div_ceil(1000);
    secs > 0 && (secs % 60 == 0 || secs <= 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use examkit_core::model::{Question, SessionState};

    fn bank() -> Vec<Question> {
        ["Capital of France?", "Largest planet?", "Smallest prime?"]
            .iter()
            .enumerate()
            .map(|(i, prompt)| Question {
                id: i.to_string(),
                prompt: prompt.to_string(),
                options: vec!["wrong".into(), "right".into(), "".into()],
                correct_index: 1,
                explanation: None,
            })
            .collect()
    }

    /// A channel preloaded with `lines`; input ends once the sender is dropped.
    fn keyboard(lines: &[&str]) -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(lines.len().max(1));
        for line in lines {
            tx.try_send(line.to_string()).unwrap();
        }
        (tx, rx)
    }

    fn started(duration: Option<Duration>) -> SessionController {
        let mut c = SessionController::default().with_sampler(Sampler::seeded(11));
        c.start(&bank(), 3, duration).unwrap();
        c
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("2 b"),
            Ok(Command::Answer {
                position: 1,
                option: 1
            })
        );
        assert_eq!(
            parse_command("  3   4 "),
            Ok(Command::Answer {
                position: 2,
                option: 3
            })
        );
        assert_eq!(parse_command("CLEAR 1"), Ok(Command::Clear { position: 0 }));
        assert_eq!(parse_command("submit"), Ok(Command::Finish));
        assert_eq!(parse_command(""), Ok(Command::Nothing));
        assert!(parse_command("0 a").is_err());
        assert!(parse_command("1 ab").is_err());
        assert!(parse_command("dance").is_err());
        assert!(parse_command("1 a b").is_err());
    }

    #[test]
    fn formats_are_validated() {
        assert_eq!(parse_formats("json,html").unwrap(), ["json", "html"]);
        assert_eq!(parse_formats("all").unwrap(), ["json", "html"]);
        assert!(parse_formats("none").unwrap().is_empty());
        assert!(parse_formats("sarif").is_err());
    }

    #[test]
    fn announces_minutes_and_final_countdown() {
        assert!(worth_announcing(Duration::from_secs(120)));
        assert!(!worth_announcing(Duration::from_secs(119)));
        assert!(worth_announcing(Duration::from_secs(10)));
        assert!(worth_announcing(Duration::from_millis(9_400)));
        assert!(!worth_announcing(Duration::ZERO));
    }

    #[tokio::test]
    async fn scripted_session() {
        let mut c = started(None);
        let (_keep_open, input) = keyboard(&[
            "1 b", "9 a", "1 c", "clear 2", "2 a", "clear 2", "status", "bogus", "finish",
        ]);
        let mut out = Vec::new();

        let report = run_exam(&mut c, input, &mut out).await.unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Question 1: B (1/3 answered)"));
        assert!(out.contains("There is no question 9; pick 1-3."));
        assert!(out.contains("C is not an option for question 1."));
        assert!(out.contains("Question 2 had no answer"));
        assert!(out.contains("Question 2: answer cleared"));
        assert!(out.contains("Answered 1/3 (33%)"));
        assert!(out.contains("unknown command 'bogus'"));

        assert_eq!(report.reason, FinishReason::Manual);
        assert_eq!((report.answered, report.correct), (1, 1));
        assert_eq!(c.state(), SessionState::Finished);
    }

    #[tokio::test]
    async fn end_of_input_submits() {
        let mut c = started(Some(Duration::from_secs(600)));
        let (keep_open, input) = keyboard(&["3 b"]);
        drop(keep_open);
        let mut out = Vec::new();

        let report = run_exam(&mut c, input, &mut out).await.unwrap();
        assert_eq!(report.reason, FinishReason::Manual);
        assert_eq!(report.answered, 1);
        assert_eq!(c.remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_submits_recorded_answers() {
        let mut c = started(Some(Duration::from_secs(12)));
        let (keep_open, input) = keyboard(&["1 b", "2 a"]);
        let mut out = Vec::new();

        let report = run_exam(&mut c, input, &mut out).await.unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(report.reason, FinishReason::Timeout);
        assert_eq!((report.answered, report.correct), (2, 1));
        assert_eq!(report.elapsed_secs, 12);
        assert!(out.contains("Time left: 00:10"));
        assert!(out.contains("Time left: 00:01"));
        assert!(!out.contains("Time left: 00:11"));
        assert!(out.contains("Time is up!"));
        drop(keep_open);
    }

    #[test]
    fn show_marks_chosen_option() {
        let mut c = started(None);
        c.record_answer(0, 0).unwrap();
        let mut out = Vec::new();
        show_questions(&c, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("  * A) wrong"));
        assert!(out.contains("    B) right"));
        assert!(!out.contains("C)"));
    }
}
