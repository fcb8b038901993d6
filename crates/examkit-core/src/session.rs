//! Exam session state machine.
//!
//! [`SessionController`] is the explicit context object for one test-taker:
//! it owns the sampler, the countdown, the current session, and the last
//! report. A host drives it from a single task, feeding it user actions and
//! awaiting [`SessionController::next_event`] for clock ticks and expiry.
//!
//! Two independent sources can finish an exam: the test-taker and the
//! countdown. Both go through [`SessionController::finish`], whose first
//! step claims the active session and leaves the controller without one, so
//! exactly one caller grades and the other observes a no-op.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::clock::{ClockEvent, Countdown};
use crate::dispatch::{self, DeliverySummary};
use crate::error::SessionError;
use crate::grader::{self, percent};
use crate::model::{FinishReason, Question, SessionConfig, SessionState};
use crate::report::ScoreReport;
use crate::sampler::Sampler;
use crate::traits::ReportSink;

/// How and when a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub reason: FinishReason,
    pub ended_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// One attempt: the sampled questions and the choices recorded so far.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    taker: String,
    questions: Vec<Question>,
    answers: BTreeMap<usize, usize>,
    started_at: DateTime<Utc>,
    started: Instant,
    duration: Option<Duration>,
    completion: Option<Completion>,
}

impl Session {
    fn new(taker: String, questions: Vec<Question>, duration: Option<Duration>) -> Self {
        Self {
            id: Uuid::new_v4(),
            taker,
            questions,
            answers: BTreeMap::new(),
            started_at: Utc::now(),
            started: Instant::now(),
            duration,
            completion: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn taker(&self) -> &str {
        &self.taker
    }

    /// The sampled questions, in presentation order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Recorded choices keyed by question position.
    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    pub fn answer(&self, position: usize) -> Option<usize> {
        self.answers.get(&position).copied()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Configured time limit; `None` for untimed exams.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    fn check_position(&self, position: usize) -> Result<&Question, SessionError> {
        self.questions
            .get(position)
            .ok_or(SessionError::PositionOutOfRange {
                position,
                total: self.questions.len(),
            })
    }

    fn record(&mut self, position: usize, option: usize) -> Result<(), SessionError> {
        if !self.check_position(position)?.is_selectable(option) {
            return Err(SessionError::InvalidOption { position, option });
        }
        self.answers.insert(position, option);
        Ok(())
    }

    fn clear(&mut self, position: usize) -> Result<Option<usize>, SessionError> {
        self.check_position(position)?;
        Ok(self.answers.remove(&position))
    }

    fn complete(&mut self, reason: FinishReason) -> Completion {
        let completion = Completion {
            reason,
            ended_at: Utc::now(),
            elapsed: self.started.elapsed(),
        };
        self.completion = Some(completion);
        completion
    }
}

/// Answered-question progress for a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    pub percent: u32,
}

/// What [`SessionController::next_event`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Countdown tick with the time left.
    Tick { remaining: Duration },
    /// The deadline elapsed and the session was finished with [`FinishReason::Timeout`].
    Finished(ScoreReport),
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Idle,
    Active(Box<Session>),
    Finished(Box<(Session, ScoreReport)>),
}

/// Owns one test-taker's exam lifecycle: Idle → Active → Finished.
pub struct SessionController {
    config: SessionConfig,
    sampler: Sampler,
    countdown: Countdown,
    sinks: Vec<Arc<dyn ReportSink>>,
    taker: String,
    phase: Phase,
    delivery: Option<JoinHandle<DeliverySummary>>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Self {
        let countdown = Countdown::new(config.tick_interval);
        Self {
            config,
            sampler: Sampler::new(),
            countdown,
            sinks: Vec::new(),
            taker: String::new(),
            phase: Phase::Idle,
            delivery: None,
        }
    }

    /// Replace the sampler (e.g. with a seeded one).
    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Add a sink that receives every finished report.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Set the test-taker name used for subsequent sessions.
    pub fn set_taker(&mut self, name: impl Into<String>) {
        self.taker = name.into();
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Active(_) => SessionState::Active,
            Phase::Finished(_) => SessionState::Finished,
        }
    }

    /// The active or most recently finished session.
    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Active(session) => Some(session),
            Phase::Finished(finished) => Some(&finished.0),
        }
    }

    /// The report of the most recently finished session.
    pub fn report(&self) -> Option<&ScoreReport> {
        match &self.phase {
            Phase::Finished(finished) => Some(&finished.1),
            _ => None,
        }
    }

    /// Time left on the countdown, `None` if untimed or not active.
    pub fn remaining(&self) -> Option<Duration> {
        self.countdown.remaining()
    }

    pub fn progress(&self) -> Progress {
        let (answered, total) = self
            .session()
            .map(|s| (s.answers().len(), s.questions().len()))
            .unwrap_or((0, 0));
        Progress {
            answered,
            total,
            percent: percent(answered, total),
        }
    }

    /// Start a new attempt with up to `size` questions drawn from `bank`.
    ///
    /// Allowed from Idle and Finished; starting over discards the previous
    /// session and report. With `duration` set the countdown is armed.
    pub fn start(
        &mut self,
        bank: &[Question],
        size: usize,
        duration: Option<Duration>,
    ) -> Result<&Session, SessionError> {
        if matches!(self.phase, Phase::Active(_)) {
            return Err(SessionError::NotReady);
        }
        if size == 0 {
            return Err(SessionError::InvalidSize);
        }
        if let Some(limit) = duration {
            if Instant::now().checked_add(limit).is_none() {
                return Err(SessionError::InvalidDuration {
                    secs: limit.as_secs(),
                });
            }
        }
        let questions = self.sampler.sample(bank, size)?;

        let session = Session::new(self.taker.clone(), questions, duration);
        tracing::info!(
            session = %session.id,
            questions = session.questions.len(),
            bank = bank.len(),
            timed = duration.is_some(),
            "exam started"
        );

        self.countdown.cancel();
        if let Some(limit) = duration {
            if !self.countdown.arm(limit) {
                return Err(SessionError::InvalidDuration {
                    secs: limit.as_secs(),
                });
            }
        }
        self.delivery = None;
        self.phase = Phase::Active(Box::new(session));

        self.session().ok_or(SessionError::NotActive)
    }

    /// Record the choice for one question, replacing any earlier choice.
    pub fn record_answer(&mut self, position: usize, option: usize) -> Result<(), SessionError> {
        let Phase::Active(session) = &mut self.phase else {
            return Err(SessionError::NotActive);
        };
        session.record(position, option)?;
        tracing::debug!(position, option, "answer recorded");
        Ok(())
    }

    /// Remove the choice for one question. Returns the cleared option, if any.
    pub fn clear_answer(&mut self, position: usize) -> Result<Option<usize>, SessionError> {
        let Phase::Active(session) = &mut self.phase else {
            return Err(SessionError::NotActive);
        };
        session.clear(position)
    }

    /// Finish the active session and grade it.
    ///
    /// Returns the report on the first call; any later call (from either
    /// source) returns `None` and has no effect.
    pub fn finish(&mut self, reason: FinishReason) -> Option<ScoreReport> {
        let Some(mut session) = self.claim_active() else {
            tracing::debug!(%reason, state = %self.state(), "finish ignored");
            return None;
        };
        self.countdown.cancel();

        let completion = session.complete(reason);
        let report = grader::grade(&session, &completion, self.config.include_explanations);
        tracing::info!(
            session = %report.session_id,
            %reason,
            correct = report.correct,
            total = report.total,
            percent = report.percent,
            "exam finished"
        );

        self.delivery = dispatch::emit(&self.sinks, &report);
        self.phase = Phase::Finished(Box::new((*session, report.clone())));
        Some(report)
    }

    /// Wait for the next countdown tick or the deadline.
    ///
    /// On expiry the session is finished with [`FinishReason::Timeout`].
    /// Never resolves while no countdown is armed.
    pub async fn next_event(&mut self) -> SessionEvent {
        loop {
            match self.countdown.next_event().await {
                ClockEvent::Tick { remaining } => return SessionEvent::Tick { remaining },
                ClockEvent::Expired => {
                    if let Some(report) = self.finish(FinishReason::Timeout) {
                        return SessionEvent::Finished(report);
                    }
                }
            }
        }
    }

    /// Take the handle of the last spawned report delivery, if any.
    ///
    /// Hosts that are about to exit can await it; the session never does.
    pub fn take_delivery(&mut self) -> Option<JoinHandle<DeliverySummary>> {
        self.delivery.take()
    }

    /// Single-step check-and-transition: hands out the active session at
    /// most once and leaves the controller Idle until the caller settles it.
    fn claim_active(&mut self) -> Option<Box<Session>> {
        match std::mem::take(&mut self.phase) {
            Phase::Active(session) => Some(session),
            other => {
                self.phase = other;
                None
            }
        }
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
