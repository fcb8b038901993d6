//! HTTP webhook sink (e.g. a spreadsheet web-app endpoint).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::instrument;

use examkit_core::report::ReportPayload;
use examkit_core::traits::ReportSink;

use crate::error::SinkError;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Posts each payload as JSON to a fixed URL.
pub struct HttpSink {
    name: String,
    url: String,
    timeout_secs: u64,
    max_retries: u32,
    retry_delay: Duration,
    max_retry_delay: Duration,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(name: &str, url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            timeout_secs,
            max_retries: 0,
            retry_delay: Duration::from_secs(1),
            max_retry_delay: MAX_RETRY_DELAY,
            client,
        })
    }

    /// Retry transient failures up to `max_retries` times with exponential backoff.
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Upper bound for any single wait between attempts, including a
    /// server-requested `retry-after`. Defaults to 60s.
    pub fn with_max_retry_delay(mut self, max_retry_delay: Duration) -> Self {
        self.max_retry_delay = max_retry_delay;
        self
    }

    async fn post_once(&self, payload: &ReportPayload) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SinkError::Timeout(self.timeout_secs)
                } else {
                    SinkError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                .saturating_mul(1000);
            return Err(SinkError::RateLimited {
                retry_after_ms: retry_after,
            });
        }
        if status >= 500 || status == 408 {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::ServerError {
                status,
                message: body,
            });
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status,
                message: body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ReportSink for HttpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, payload), fields(sink = %self.name, session = %payload.session_id))]
    async fn submit(&self, payload: &ReportPayload) -> anyhow::Result<()> {
        let mut last_error = None;
        let mut retry_delay = self.retry_delay.min(self.max_retry_delay);

        for retry in 0..=self.max_retries {
            if retry > 0 {
                tokio::time::sleep(retry_delay).await;
                retry_delay = retry_delay.saturating_mul(2).min(self.max_retry_delay);
            }
            match self.post_once(payload).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_permanent() => return Err(e.into()),
                Err(e) => {
                    tracing::debug!(attempt = retry + 1, "delivery attempt failed: {e}");
                    if let Some(ms) = e.retry_after_ms() {
                        retry_delay = Duration::from_millis(ms).min(self.max_retry_delay);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .map(anyhow::Error::from)
            .unwrap_or_else(|| anyhow::anyhow!("no delivery attempt made")))
    }
}
