use crate::models::{Pipeline, PipelineOutcome};
use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

pub async fn append_run_log(
    path: &Path,
    at: DateTime<Utc>,
    url: &str,
    pipeline: Pipeline,
    outcome: &PipelineOutcome,
) -> io::Result<()> {
    let timestamp = at.format("%Y-%m-%dT%H:%M:%S%.fZ");
    let detail = match outcome {
        PipelineOutcome::Stored { ack } => format!("$SUCCESS::{}", ack),
        PipelineOutcome::Failed { message } => format!("$FAIL::{}", message),
    };
    let log_entry = format!("{}::{}::{}::{}\n", timestamp, pipeline, url, detail);

    // Open the file in append mode, creating it if it doesn't exist
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .await?;
    file.write_all(log_entry.as_bytes()).await?;
    file.flush().await?;

    Ok(())
}
