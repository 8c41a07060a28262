use std::time::Duration;
use thiserror::Error;

/// A telemetry line that could not be decoded as a packet.
///
/// Parse failures are logged at warn level by the reader and discarded; they
/// never reset the serial link and never reach the supervisor.
#[derive(Error, Debug)]
#[error("malformed packet: {0}")]
pub struct ParseError(#[from] serde_json::Error);

/// Fatal error terminating a single worker.
///
/// This is the only error type that crosses a worker boundary; everything
/// transient (serial resets, display I/O, log write failures, inbox
/// overflow) is recovered inside the worker that observed it.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Fatal(String),
}

/// Errors surfaced by the supervisor itself.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A worker exited with a failure; the rest of the group was shut down.
    #[error("worker {name} failed: {reason}")]
    WorkerFailed { name: String, reason: String },

    /// Graceful shutdown overran its budget and stragglers were aborted.
    #[error("shutdown grace {grace:?} exceeded; stuck workers: {stuck:?}")]
    GraceExceeded { grace: Duration, stuck: Vec<String> },
}
