//! Worker lifecycle supervision.
//!
//! Every worker is spawned as its own task with a child cancellation token
//! and watched through a single `JoinSet`. A worker that finishes cleanly is
//! removed from the watch set; a worker that fails (error return or panic)
//! takes the whole group down: the group token is cancelled, remaining
//! workers get the grace period to exit on their own, and stragglers are
//! force-aborted.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::task::{Id, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{RuntimeError, WorkerError};

type WorkerFuture = Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send>>;

/// A named worker waiting to be spawned.
pub struct WorkerSpec {
    name: String,
    factory: Box<dyn FnOnce(CancellationToken) -> WorkerFuture + Send>,
}

impl WorkerSpec {
    pub fn new<F, Fut>(name: &str, factory: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            factory: Box::new(move |token| Box::pin(factory(token))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Lifecycle state the supervisor tracks per worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Finished,
    Failed,
}

/// Supervisor-owned record of one spawned worker. Workers never see each
/// other's handles.
struct WorkerHandle {
    name: String,
    state: WorkerState,
}

pub struct Supervisor {
    poll_interval: Duration,
    grace: Duration,
}

impl Supervisor {
    pub fn new(poll_interval: Duration, grace: Duration) -> Self {
        Self {
            poll_interval,
            grace,
        }
    }

    /// Spawns every spec and supervises the group until all workers exit
    /// cleanly, one of them fails, or `shutdown` is cancelled externally.
    ///
    /// Either exit path ends with the same sequence: cancel the group token,
    /// wait up to the grace period, abort whatever is left.
    pub async fn run(
        &self,
        specs: Vec<WorkerSpec>,
        shutdown: CancellationToken,
    ) -> Result<(), RuntimeError> {
        let group = CancellationToken::new();
        let mut set: JoinSet<Result<(), WorkerError>> = JoinSet::new();
        let mut handles: HashMap<Id, WorkerHandle> = HashMap::new();

        for spec in specs {
            let token = group.child_token();
            let future = (spec.factory)(token);
            let abort = set.spawn(future);
            info!(worker = %spec.name, "worker started");
            handles.insert(
                abort.id(),
                WorkerHandle {
                    name: spec.name,
                    state: WorkerState::Running,
                },
            );
        }

        let failure = self.watch(&mut set, &mut handles, &shutdown).await;
        if set.is_empty() {
            return failure.map_or(Ok(()), Err);
        }

        group.cancel();
        let drained = self.drain_with_grace(&mut set, &mut handles).await;

        match (failure, drained) {
            (Some(failure), Err(grace)) => {
                warn!(error = %grace, "forced termination during failure shutdown");
                Err(failure)
            }
            (Some(failure), Ok(())) => Err(failure),
            (None, drained) => drained,
        }
    }

    /// Watch phase: runs until every worker is done, one fails, or shutdown
    /// is requested. Returns the failure to report, if any.
    async fn watch(
        &self,
        set: &mut JoinSet<Result<(), WorkerError>>,
        handles: &mut HashMap<Id, WorkerHandle>,
        shutdown: &CancellationToken,
    ) -> Option<RuntimeError> {
        let mut poll = time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("shutdown requested, stopping workers");
                    return None;
                }
                joined = set.join_next_with_id() => match joined {
                    None => {
                        info!("all workers exited cleanly");
                        return None;
                    }
                    Some(exit) => {
                        if let Some(failure) = record_exit(handles, exit) {
                            return Some(failure);
                        }
                    }
                },
                _ = poll.tick() => {
                    let alive = handles
                        .values()
                        .filter(|handle| handle.state == WorkerState::Running)
                        .count();
                    debug!(alive, "liveness poll");
                }
            }
        }
    }

    /// Shutdown phase: the group token is already cancelled. Waits out the
    /// grace period, then aborts the stragglers.
    async fn drain_with_grace(
        &self,
        set: &mut JoinSet<Result<(), WorkerError>>,
        handles: &mut HashMap<Id, WorkerHandle>,
    ) -> Result<(), RuntimeError> {
        let deadline = time::sleep(self.grace);
        tokio::pin!(deadline);

        loop {
            if set.is_empty() {
                return Ok(());
            }
            tokio::select! {
                _ = &mut deadline => {
                    let stuck: Vec<String> = handles
                        .values()
                        .filter(|handle| handle.state == WorkerState::Running)
                        .map(|handle| handle.name.clone())
                        .collect();
                    warn!(?stuck, grace = ?self.grace, "grace period exceeded, aborting workers");
                    set.abort_all();
                    while set.join_next().await.is_some() {}
                    return Err(RuntimeError::GraceExceeded {
                        grace: self.grace,
                        stuck,
                    });
                }
                joined = set.join_next_with_id() => match joined {
                    None => return Ok(()),
                    // Failures during shutdown don't trigger anything new.
                    Some(exit) => {
                        let _ = record_exit(handles, exit);
                    }
                },
            }
        }
    }
}

/// Marks the exited worker's handle and maps a failed exit to the error the
/// supervisor escalates.
fn record_exit(
    handles: &mut HashMap<Id, WorkerHandle>,
    exit: Result<(Id, Result<(), WorkerError>), tokio::task::JoinError>,
) -> Option<RuntimeError> {
    match exit {
        Ok((id, Ok(()))) => {
            if let Some(handle) = handles.get_mut(&id) {
                handle.state = WorkerState::Finished;
                info!(worker = %handle.name, "worker exited cleanly");
            }
            None
        }
        Ok((id, Err(e))) => {
            let name = mark_failed(handles, id);
            error!(worker = %name, error = %e, "worker failed");
            Some(RuntimeError::WorkerFailed {
                name,
                reason: e.to_string(),
            })
        }
        Err(join_err) => {
            let id = join_err.id();
            let name = mark_failed(handles, id);
            if join_err.is_cancelled() {
                // Aborted by us during forced termination.
                info!(worker = %name, "worker aborted");
                return None;
            }
            error!(worker = %name, error = %join_err, "worker panicked");
            Some(RuntimeError::WorkerFailed {
                name,
                reason: join_err.to_string(),
            })
        }
    }
}

fn mark_failed(handles: &mut HashMap<Id, WorkerHandle>, id: Id) -> String {
    match handles.get_mut(&id) {
        Some(handle) => {
            handle.state = WorkerState::Failed;
            handle.name.clone()
        }
        None => "unknown".to_string(),
    }
}
