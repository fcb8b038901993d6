//! Fire-and-forget report delivery.
//!
//! Delivery runs on a spawned task. The session never awaits it, and sink
//! errors are logged and counted, nothing more.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinHandle;

use crate::report::{ReportPayload, ScoreReport};
use crate::traits::ReportSink;

/// Outcome of delivering one payload to every sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Submit `payload` to all sinks concurrently, logging failures.
pub async fn deliver(sinks: &[Arc<dyn ReportSink>], payload: &ReportPayload) -> DeliverySummary {
    let mut pending: FuturesUnordered<_> = sinks
        .iter()
        .map(|sink| async move { (sink.name().to_string(), sink.submit(payload).await) })
        .collect();

    let mut summary = DeliverySummary::default();
    while let Some((name, result)) = pending.next().await {
        match result {
            Ok(()) => {
                tracing::debug!(sink = %name, session = %payload.session_id, "report delivered");
                summary.delivered += 1;
            }
            Err(e) => {
                tracing::warn!(
                    sink = %name,
                    session = %payload.session_id,
                    "report delivery failed: {e:#}"
                );
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Spawn delivery of `report` onto the current tokio runtime.
///
/// Returns `None` when there is nothing to deliver or no runtime to run on.
pub fn emit(
    sinks: &[Arc<dyn ReportSink>],
    report: &ScoreReport,
) -> Option<JoinHandle<DeliverySummary>> {
    if sinks.is_empty() {
        return None;
    }
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(
            "no async runtime; skipping report delivery to {} sink(s)",
            sinks.len()
        );
        return None;
    };

    let sinks = sinks.to_vec();
    let payload = ReportPayload::from(report);
    Some(runtime.spawn(async move { deliver(&sinks, &payload).await }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::model::FinishReason;

    struct Recording(Mutex<Vec<ReportPayload>>);

    #[async_trait]
    impl ReportSink for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn submit(&self, payload: &ReportPayload) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl ReportSink for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn submit(&self, _: &ReportPayload) -> anyhow::Result<()> {
            anyhow::bail!("endpoint unreachable")
        }
    }

    fn report() -> ScoreReport {
        ScoreReport {
            session_id: Uuid::new_v4(),
            taker: String::new(),
            reason: FinishReason::Manual,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            elapsed_secs: 1,
            total: 0,
            answered: 0,
            correct: 0,
            percent: 0,
            breakdown: vec![],
        }
    }

    #[tokio::test]
    async fn failures_are_counted_not_propagated() {
        let recording = Arc::new(Recording(Mutex::new(Vec::new())));
        let sinks: Vec<Arc<dyn ReportSink>> = vec![recording.clone(), Arc::new(Failing)];

        let summary = emit(&sinks, &report()).unwrap().await.unwrap();
        assert_eq!(
            summary,
            DeliverySummary {
                delivered: 1,
                failed: 1
            }
        );
        assert_eq!(recording.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_sinks_means_no_task() {
        assert!(emit(&[], &report()).is_none());
    }

    #[test]
    fn without_runtime_delivery_is_skipped() {
        let sinks: Vec<Arc<dyn ReportSink>> = vec![Arc::new(Failing)];
        assert!(emit(&sinks, &report()).is_none());
    }
}
