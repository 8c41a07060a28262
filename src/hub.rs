//! Broadcast fan-out between the single producer and its consumers.
//!
//! Every consumer owns a bounded inbox; [`DistributionHub::publish`] pushes a
//! copy of each record into every inbox independently. The producer is never
//! blocked: a full inbox drops that one record for that one consumer, other
//! consumers are unaffected. This is a deliberate departure from a shared
//! work queue, where each packet would reach only whichever consumer
//! happened to dequeue it first.

use tokio::sync::mpsc;
use tracing::warn;

use crate::record::TelemetryRecord;

struct Outlet {
    name: String,
    tx: mpsc::Sender<TelemetryRecord>,
    dropped: u64,
}

/// Producer side of the fan-out.
///
/// Owned by the producer worker after all consumers have registered.
pub struct DistributionHub {
    outlets: Vec<Outlet>,
}

/// Consumer side of one registered inbox.
pub struct Inbox {
    name: String,
    rx: mpsc::Receiver<TelemetryRecord>,
}

impl Inbox {
    /// Awaits the next record in the order the hub pushed it here.
    ///
    /// Returns `None` once the producer is gone and the inbox is drained; a
    /// consumer treats that as a clean end of stream. Callers select this
    /// against their cancellation token.
    pub async fn recv(&mut self) -> Option<TelemetryRecord> {
        self.rx.recv().await
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl DistributionHub {
    pub fn new() -> Self {
        Self {
            outlets: Vec::new(),
        }
    }

    /// Registers a named consumer and hands back its inbox.
    pub fn register(&mut self, name: &str, capacity: usize) -> Inbox {
        let (tx, rx) = mpsc::channel(capacity);
        self.outlets.push(Outlet {
            name: name.to_string(),
            tx,
            dropped: 0,
        });
        Inbox {
            name: name.to_string(),
            rx,
        }
    }

    /// Delivers one record to every registered consumer, enqueue-or-drop.
    ///
    /// Never awaits. On overflow the newest record is dropped for the full
    /// inbox only, with a warning naming the consumer. A consumer whose
    /// inbox was closed is detached from the fan-out.
    pub fn publish(&mut self, record: &TelemetryRecord) {
        self.outlets.retain_mut(|outlet| {
            match outlet.tx.try_send(record.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    outlet.dropped += 1;
                    warn!(
                        consumer = %outlet.name,
                        dropped = outlet.dropped,
                        "inbox full, dropping packet"
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(consumer = %outlet.name, "inbox closed, detaching consumer");
                    false
                }
            }
        });
    }

    /// Records dropped so far for the named consumer.
    pub fn dropped(&self, name: &str) -> u64 {
        self.outlets
            .iter()
            .find(|outlet| outlet.name == name)
            .map_or(0, |outlet| outlet.dropped)
    }

    pub fn consumer_count(&self) -> usize {
        self.outlets.len()
    }
}

impl Default for DistributionHub {
    fn default() -> Self {
        Self::new()
    }
}
