use std::time::Duration;

use reqwest::StatusCode;

// Chrome failed to start or never exposed a control port
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to spawn chrome at {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare chrome profile dir: {0}")]
    Profile(#[source] std::io::Error),

    #[error("chrome process missing stderr handle")]
    MissingStderr,

    #[error("chrome exited before exposing a control port. stderr preview: {preview}")]
    Exited { preview: String },

    #[error("timed out after {0:?} waiting for chrome control port")]
    Timeout(Duration),
}

// Lighthouse could not be run or produced nothing usable
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to spawn lighthouse at {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("lighthouse failed for {url}: {stderr}")]
    Failed { url: String, stderr: String },

    #[error("lighthouse output for {url} is not a valid report: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

// PageSpeed Insights request failed, returned non-2xx or a bad body
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("pagespeed request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("pagespeed returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("pagespeed body is not a JSON object ({reason}): {body}")]
    Decode { reason: String, body: String },
}

// Document store connect, create or insert failed
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("collection name must not be empty")]
    EmptyCollection,

    #[error("failed to encode document for {collection}: {source}")]
    Encode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to connect to document store: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to write into {collection}: {source}")]
    Write {
        collection: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Terminal failure of one pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
