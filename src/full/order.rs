use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::access::DiffRecordAccess;
use crate::error::{ConsistencyError, Result};
use crate::full::{StoreProcessor, StoreProcessorTask};
use crate::progress::ProgressMonitorFactory;
use crate::store::RecordKind;

/// How the store tasks of a run are scheduled. All orders find the same
/// violations; they differ in parallelism and in how often stores are read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskExecutionOrder {
    /// Tasks run one after the other in scheduling order, each in one pass.
    SingleThreaded,
    /// Every task runs on its own worker thread, each in one pass.
    MultiThreaded,
    /// Tasks run one after the other, each store walked once per filter.
    MultiPass,
}

impl TaskExecutionOrder {
    /// Every order.
    pub const ALL: [TaskExecutionOrder; 3] = [
        TaskExecutionOrder::SingleThreaded,
        TaskExecutionOrder::MultiThreaded,
        TaskExecutionOrder::MultiPass,
    ];

    /// Configuration name of the order.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskExecutionOrder::SingleThreaded => "SINGLE_THREADED",
            TaskExecutionOrder::MultiThreaded => "MULTI_THREADED",
            TaskExecutionOrder::MultiPass => "MULTI_PASS",
        }
    }

    /// Runs every task to completion, or stops at the first fatal failure.
    ///
    /// `everything` is the processor used by the single pass orders; the multi
    /// pass order uses each task's own filtered processors instead.
    pub fn execute(
        self,
        everything: &StoreProcessor<'_>,
        tasks: &[StoreProcessorTask<'_>],
        access: &dyn DiffRecordAccess,
        progress: &dyn ProgressMonitorFactory,
    ) -> Result<()> {
        debug!(order = %self, tasks = tasks.len(), "consistency.order.execute");
        let abort = AtomicBool::new(false);
        match self {
            TaskExecutionOrder::SingleThreaded => tasks
                .iter()
                .try_for_each(|task| task.run_single_pass(everything, access, progress, &abort)),
            TaskExecutionOrder::MultiPass => tasks
                .iter()
                .try_for_each(|task| task.run_multi_pass(access, progress, &abort)),
            TaskExecutionOrder::MultiThreaded => {
                run_threaded(everything, tasks, access, progress, &abort)
            }
        }
    }
}

impl fmt::Display for TaskExecutionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskExecutionOrder {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace('-', "_");
        TaskExecutionOrder::ALL
            .into_iter()
            .find(|order| order.as_str() == normalized)
            .ok_or_else(|| format!("unknown execution order '{value}'"))
    }
}

/// Raises the abort flag when a worker unwinds, so siblings stop early.
struct AbortOnPanic<'a>(&'a AtomicBool);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

fn run_threaded(
    everything: &StoreProcessor<'_>,
    tasks: &[StoreProcessorTask<'_>],
    access: &dyn DiffRecordAccess,
    progress: &dyn ProgressMonitorFactory,
    abort: &AtomicBool,
) -> Result<()> {
    let outcomes: Vec<(RecordKind, Result<()>)> = thread::scope(|scope| {
        let handles: Vec<_> = tasks
            .iter()
            .map(|task| {
                let spawned = thread::Builder::new()
                    .name(format!("consistency-{}", task.kind().as_str().replace(' ', "-")))
                    .spawn_scoped(scope, move || {
                        let _guard = AbortOnPanic(abort);
                        let result = task.run_single_pass(everything, access, progress, abort);
                        if result.is_err() {
                            abort.store(true, Ordering::Relaxed);
                        }
                        result
                    });
                if spawned.is_err() {
                    abort.store(true, Ordering::Relaxed);
                }
                (task.kind(), spawned)
            })
            .collect();
        handles
            .into_iter()
            .map(|(kind, spawned)| {
                let outcome = match spawned {
                    Err(err) => Err(ConsistencyError::Spawn(err)),
                    Ok(handle) => handle
                        .join()
                        .unwrap_or(Err(ConsistencyError::WorkerPanicked { store: kind })),
                };
                (kind, outcome)
            })
            .collect()
    });

    // Report the failure that caused the abort, not the siblings it stopped.
    let mut aborted = false;
    let mut root_cause = None;
    for (kind, outcome) in outcomes {
        match outcome {
            Ok(()) => {}
            Err(ConsistencyError::Aborted) => aborted = true,
            Err(err) => {
                warn!(store = %kind, error = %err, "consistency.order.task_failed");
                root_cause.get_or_insert(err);
            }
        }
    }
    match (root_cause, aborted) {
        (Some(err), _) => Err(err),
        (None, true) => Err(ConsistencyError::Aborted),
        (None, false) => Ok(()),
    }
}
