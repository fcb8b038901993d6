//! Mock sink for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use examkit_core::report::ReportPayload;
use examkit_core::traits::ReportSink;

/// A sink that records payloads instead of delivering them.
///
/// Can be configured to fail every submission, to exercise error paths.
pub struct MockSink {
    /// Error message returned from every submission, if set.
    failure: Option<String>,
    /// Number of submissions attempted.
    call_count: AtomicU32,
    /// Payloads received, in order.
    received: Mutex<Vec<ReportPayload>>,
}

impl MockSink {
    /// A sink that accepts everything.
    pub fn new() -> Self {
        Self {
            failure: None,
            call_count: AtomicU32::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// A sink that fails every submission with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Get the number of submissions made to this sink.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Payloads accepted so far.
    pub fn received(&self) -> Vec<ReportPayload> {
        self.received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportSink for MockSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, payload: &ReportPayload) -> anyhow::Result<()> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = &self.failure {
            anyhow::bail!("{message}");
        }
        if let Ok(mut received) = self.received.lock() {
            received.push(payload.clone());
        }
        Ok(())
    }
}
