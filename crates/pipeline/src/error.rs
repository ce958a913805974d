use thiserror::Error;

use storage::{QueueError, StoreError};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("stream error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Undecodable or incomplete inbound event; dead-lettered, never retried.
    #[error("malformed event: {0}")]
    Malformed(String),
    #[error("queue write failed: {0}")]
    Queue(#[from] QueueError),
    #[error("store write failed: {0}")]
    Store(#[from] StoreError),
    /// One sink committed, the other did not, and compensation also failed.
    /// Silent partial success is forbidden, so this is reported loudly.
    #[error("sink divergence for {oid}: {detail}")]
    SinkDivergence { oid: String, detail: String },
    /// Bounded store retries were exhausted; fatal for this message only.
    #[error("store retries exhausted for {oid}: {source}")]
    StoreExhausted {
        oid: String,
        #[source]
        source: StoreError,
    },
}
