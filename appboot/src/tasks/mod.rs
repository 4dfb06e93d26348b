//! Supervised background tasks.
//!
//! Startup hands work that must not delay the synchronous sequence to a
//! [`BackgroundTaskSet`]. Every task runs on the shared tokio runtime behind
//! its own supervision boundary:
//!
//! ```text
//! spawn(name, fut) ──► worker task ── Ok / Err / panic
//!                          │
//!                          ▼
//!                      tracker task ──► TaskReport
//!                          │
//!                          └── Failed / Panicked ──► FaultHandler
//! ```
//!
//! A failing or panicking task never reaches its siblings or the caller that
//! dispatched it. Tasks are not cancelled and have no timeout; they run to
//! completion or failure.

mod warmup;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::fault::{panic_message, FaultHandler, FaultSource};
use crate::subsystems::{DatabaseError, SubsystemError};

pub use warmup::{dispatch_warmup, DATABASE_WARMUP_TASK, TEXT_SEGMENTER_TASK};

/// Errors a background task can finish with.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Subsystem(#[from] SubsystemError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The task was cancelled by the runtime (e.g. during runtime shutdown).
    #[error("Task did not complete: {0}")]
    Join(String),
}

/// How a background task ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(String),
    Panicked(String),
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Completed => write!(f, "completed"),
            TaskOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            TaskOutcome::Panicked(message) => write!(f, "panicked: {}", message),
        }
    }
}

/// Final report for one background task.
#[derive(Clone, Debug)]
pub struct TaskReport {
    pub name: &'static str,
    pub outcome: TaskOutcome,
    pub elapsed: Duration,
}

/// Supervised group of fire-and-forget tasks sharing one runtime.
pub struct BackgroundTaskSet {
    runtime: Handle,
    faults: Arc<FaultHandler>,
    trackers: Mutex<Vec<(&'static str, JoinHandle<TaskReport>)>>,
}

impl BackgroundTaskSet {
    /// Create a task set spawning onto `runtime` and reporting to `faults`.
    pub fn new(runtime: Handle, faults: Arc<FaultHandler>) -> Self {
        Self {
            runtime,
            faults,
            trackers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn `future` under supervision. Returns immediately.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let started = Instant::now();
        let worker = self.runtime.spawn(future);
        let faults = Arc::clone(&self.faults);

        let tracker = self.runtime.spawn(async move {
            let outcome = match worker.await {
                Ok(Ok(())) => TaskOutcome::Completed,
                Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
                Err(e) if e.is_panic() => TaskOutcome::Panicked(panic_message(&*e.into_panic())),
                Err(e) => TaskOutcome::Failed(TaskError::Join(e.to_string()).to_string()),
            };
            let elapsed = started.elapsed();

            match &outcome {
                TaskOutcome::Completed => {
                    info!(
                        task = name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Background task completed"
                    );
                }
                TaskOutcome::Failed(message) | TaskOutcome::Panicked(message) => {
                    faults.report(
                        FaultSource::Task {
                            name: name.to_string(),
                        },
                        message.clone(),
                    );
                }
            }

            TaskReport {
                name,
                outcome,
                elapsed,
            }
        });

        debug!(task = name, "Background task dispatched");
        self.trackers.lock().push((name, tracker));
    }

    /// Tasks dispatched and not yet joined.
    pub fn pending(&self) -> usize {
        self.trackers.lock().len()
    }

    /// Wait for every task dispatched so far, in dispatch order.
    ///
    /// Reports are handed out once; a second call only covers tasks spawned
    /// after the first.
    pub async fn join(&self) -> Vec<TaskReport> {
        let trackers = std::mem::take(&mut *self.trackers.lock());
        let (names, handles): (Vec<_>, Vec<_>) = trackers.into_iter().unzip();

        join_all(handles)
            .await
            .into_iter()
            .zip(names)
            .map(|(result, name)| {
                result.unwrap_or_else(|e| TaskReport {
                    name,
                    outcome: TaskOutcome::Failed(e.to_string()),
                    elapsed: Duration::ZERO,
                })
            })
            .collect()
    }
}

impl fmt::Debug for BackgroundTaskSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundTaskSet")
            .field("pending", &self.pending())
            .finish()
    }
}
