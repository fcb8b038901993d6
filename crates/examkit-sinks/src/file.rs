//! JSON file sink: archives every payload under a directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use examkit_core::report::ReportPayload;
use examkit_core::traits::ReportSink;

use crate::error::SinkError;

/// Writes each payload to `<dir>/result-<timestamp>-<session>.json`.
pub struct JsonFileSink {
    name: String,
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(name: &str, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the payload will be written to.
    pub fn path_for(&self, payload: &ReportPayload) -> PathBuf {
        self.dir.join(format!(
            "result-{}-{}.json",
            payload.submitted_at.format("%Y-%m-%dT%H%M%S"),
            payload.session_id
        ))
    }
}

#[async_trait]
impl ReportSink for JsonFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, payload: &ReportPayload) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(payload)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(SinkError::from)?;
        let path = self.path_for(payload);
        tokio::fs::write(&path, json).await.map_err(SinkError::from)?;
        tracing::debug!(path = %path.display(), "result archived");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use examkit_core::model::FinishReason;
    use uuid::Uuid;

    #[tokio::test]
    async fn writes_one_file_per_payload() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new("archive", dir.path().join("results"));
        let payload = ReportPayload {
            session_id: Uuid::new_v4(),
            student_name: "Anonymous".into(),
            score: 0,
            total: 1,
            percent: 0,
            answered: 0,
            duration_sec: 1200,
            finish_reason: FinishReason::Timeout,
            submitted_at: Utc::now(),
            breakdown: vec![],
        };

        sink.submit(&payload).await.unwrap();

        let written = std::fs::read_to_string(sink.path_for(&payload)).unwrap();
        let back: ReportPayload = serde_json::from_str(&written).unwrap();
        assert_eq!(back, payload);
    }
}
