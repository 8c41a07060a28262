//! Latest-value cache consumed by the HTTP status layer.
//!
//! The worker moves inbox records into a `watch` channel; any number of
//! readers hold a [`StateCache`] and query it without locking against the
//! pipeline. Nothing here is shared mutable state: the cell is owned by the
//! channel, readers only ever clone the current value.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::hub::Inbox;
use crate::record::TelemetryRecord;

/// Read side handed to the HTTP layer.
#[derive(Clone)]
pub struct StateCache {
    rx: watch::Receiver<TelemetryRecord>,
}

impl StateCache {
    /// Current snapshot. Never blocks, never fails, no side effects.
    ///
    /// Before anything has arrived this is the waiting snapshot
    /// (`status: wait`), letting callers distinguish "never connected" from
    /// "device reported error".
    pub fn latest(&self) -> TelemetryRecord {
        self.rx.borrow().clone()
    }
}

/// Worker side of the cache.
pub struct WebStateCache {
    tx: watch::Sender<TelemetryRecord>,
}

impl WebStateCache {
    pub fn new() -> (Self, StateCache) {
        let (tx, rx) = watch::channel(TelemetryRecord::waiting());
        (Self { tx }, StateCache { rx })
    }

    /// Consumer worker loop: every arriving record supersedes the cached one.
    pub async fn run(self, mut inbox: Inbox, token: CancellationToken) -> Result<(), WorkerError> {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                record = inbox.recv() => match record {
                    Some(record) => {
                        // Readers may all be gone; that is not our problem.
                        let _ = self.tx.send(record);
                    }
                    None => return Ok(()),
                },
            }
        }
    }
}
