//! Report sink trait.
//!
//! Implemented by the `examkit-sinks` crate (HTTP webhook, JSON file, mock).

use async_trait::async_trait;

use crate::report::ReportPayload;

/// A consumer of finished score reports.
///
/// Sink failures are reported to the caller of `submit` only; they never
/// reach the session that produced the payload.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Human-readable sink name (e.g. "sheet").
    fn name(&self) -> &str;

    /// Deliver one payload.
    async fn submit(&self, payload: &ReportPayload) -> anyhow::Result<()>;
}
