//! Background execution of mutating operations.
//!
//! Each submitted [`Operation`] runs on its own named worker thread and
//! streams [`EngineEvent`]s over a `flume` channel. Every job ends with
//! exactly one `Finished` event, also when the body panics.

pub mod events;
pub mod operations;

use std::any::Any;
use std::collections::HashSet;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use crate::config::ArchiveContext;
use crate::error::{EngineError, STATUS_OK};

pub use events::{Emitter, EngineEvent, JobId, Severity};
pub use operations::{Operation, OperationKind, OperationOutput};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Another job of the same kind has not finished yet.
    #[error("A '{0}' job is already running")]
    Busy(&'static str),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => JobState::Created,
            1 => JobState::Running,
            2 => JobState::Succeeded,
            _ => JobState::Failed,
        }
    }
}

/// Result of a finished job as returned by [`JobHandle::wait`].
#[derive(Debug)]
pub struct JobOutcome {
    pub id: JobId,
    pub operation: &'static str,
    pub status: i32,
    pub result: Result<OperationOutput, EngineError>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

pub struct JobHandle {
    id: JobId,
    operation: &'static str,
    state: Arc<AtomicU8>,
    thread: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Blocks until the worker exits.
    pub fn wait(self) -> JobOutcome {
        match self.thread.join() {
            Ok(outcome) => outcome,
            // The body runs under catch_unwind; only the bookkeeping around it
            // can end up here.
            Err(payload) => {
                let error = EngineError::WorkerPanicked(panic_message(payload.as_ref()));
                JobOutcome {
                    id: self.id,
                    operation: self.operation,
                    status: error.status_code(),
                    result: Err(error),
                }
            }
        }
    }
}

/// Spawns workers for operations against one shared [`ArchiveContext`].
pub struct JobRunner {
    context: Arc<ArchiveContext>,
    sender: flume::Sender<EngineEvent>,
    next_id: AtomicU64,
    in_flight: Arc<Mutex<HashSet<OperationKind>>>,
}

impl JobRunner {
    /// Returns the runner and the receiving end of its event stream.
    pub fn new(context: Arc<ArchiveContext>) -> (Self, flume::Receiver<EngineEvent>) {
        let (sender, receiver) = flume::unbounded();
        let runner = Self {
            context,
            sender,
            next_id: AtomicU64::new(1),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        };
        (runner, receiver)
    }

    pub fn context(&self) -> &Arc<ArchiveContext> {
        &self.context
    }

    /// Starts `operation` on a new worker thread.
    ///
    /// Refused with [`JobError::Busy`] while another job of the same kind is
    /// running.
    pub fn submit(&self, operation: Operation) -> Result<JobHandle, JobError> {
        let kind = operation.kind();
        let name = operation.name();
        if !lock(&self.in_flight).insert(kind) {
            return Err(JobError::Busy(name));
        }

        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let state = Arc::new(AtomicU8::new(JobState::Created as u8));
        let emitter = Emitter::new(id, self.sender.clone());
        let context = Arc::clone(&self.context);
        let in_flight = Arc::clone(&self.in_flight);
        let worker_state = Arc::clone(&state);

        let spawned = thread::Builder::new()
            .name(format!("verarc-{}-{}", name, id.0))
            .spawn(move || {
                worker_state.store(JobState::Running as u8, Ordering::Release);
                tracing::info!(job = %id, operation = name, "job started");
                let result = guarded(|| operations::execute(&operation, &context, &emitter));
                let status = match &result {
                    Ok(_) => {
                        emitter.notify(Severity::Info, format!("{} finished", name));
                        STATUS_OK
                    }
                    Err(e) => {
                        tracing::warn!(job = %id, operation = name, error = %e, "job failed");
                        emitter.notify(Severity::Error, e.to_string());
                        e.status_code()
                    }
                };
                let done = if status == STATUS_OK {
                    JobState::Succeeded
                } else {
                    JobState::Failed
                };
                worker_state.store(done as u8, Ordering::Release);
                // Release the slot before announcing completion so a listener
                // reacting to Finished can submit the same kind again.
                lock(&in_flight).remove(&kind);
                emitter.finished(name, status);
                tracing::info!(job = %id, operation = name, status, "job finished");
                JobOutcome {
                    id,
                    operation: name,
                    status,
                    result,
                }
            });

        match spawned {
            Ok(thread) => Ok(JobHandle {
                id,
                operation: name,
                state,
                thread,
            }),
            Err(e) => {
                lock(&self.in_flight).remove(&kind);
                Err(JobError::Spawn(e))
            }
        }
    }

    /// Submits `operation` to a worker thread and blocks until it finishes.
    pub fn run(&self, operation: Operation) -> Result<JobOutcome, JobError> {
        Ok(self.submit(operation)?.wait())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs `body`, turning a panic into [`EngineError::WorkerPanicked`].
pub(crate) fn guarded<T>(body: impl FnOnce() -> Result<T, EngineError>) -> Result<T, EngineError> {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => Err(EngineError::WorkerPanicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArchiveConfig;
    use crate::crypto::keystore::generate_key;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn runner() -> (TempDir, JobRunner, flume::Receiver<EngineEvent>) {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        fs::create_dir_all(&root).unwrap();
        let config = ArchiveConfig::with_root(Path::new("store"), dir.path());
        let context = ArchiveContext::from_parts(config, &root, generate_key().unwrap());
        let (runner, events) = JobRunner::new(Arc::new(context));
        (dir, runner, events)
    }

    fn finished_events(events: &flume::Receiver<EngineEvent>) -> Vec<(JobId, i32)> {
        events
            .try_iter()
            .filter_map(|e| match e {
                EngineEvent::Finished { job, status, .. } => Some((job, status)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_guarded_reports_panic() {
        let result: Result<(), EngineError> = guarded(|| panic!("boom"));
        match result {
            Err(EngineError::WorkerPanicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_successful_job_emits_single_finished() {
        let (_dir, runner, events) = runner();
        let handle = runner
            .submit(Operation::CreateGroup {
                group: "Alpha".into(),
            })
            .unwrap();
        let id = handle.id();
        let outcome = handle.wait();
        assert!(outcome.is_success());
        assert_eq!(outcome.operation, "create_group");
        assert!(runner.context().catalog().group_path("Alpha").is_dir());
        assert_eq!(finished_events(&events), vec![(id, STATUS_OK)]);
    }

    #[test]
    fn test_failed_job_reports_nonzero_status() {
        let (_dir, runner, events) = runner();
        let outcome = runner
            .run(Operation::DeleteGroup {
                group: "Missing".into(),
            })
            .unwrap();
        assert!(!outcome.is_success());
        assert!(matches!(outcome.result, Err(EngineError::NotFound(_))));

        let collected: Vec<EngineEvent> = events.try_iter().collect();
        assert!(collected.iter().any(|e| matches!(
            e,
            EngineEvent::Notify {
                severity: Severity::Error,
                ..
            }
        )));
        let finished: Vec<_> = collected
            .iter()
            .filter(|e| matches!(e, EngineEvent::Finished { .. }))
            .collect();
        assert_eq!(finished.len(), 1);
        assert!(matches!(
            finished[0],
            EngineEvent::Finished { status: 6, .. }
        ));
    }

    #[test]
    fn test_same_kind_is_busy_until_finished() {
        let (_dir, runner, _events) = runner();
        // Hold the slot by hand to make the race deterministic.
        lock(&runner.in_flight).insert(OperationKind::Download);
        let refused = runner.submit(Operation::Download {
            group: "A".into(),
            version: "v".into(),
            destination: "out".into(),
        });
        assert!(matches!(refused, Err(JobError::Busy("download"))));

        // Other kinds still go through.
        let outcome = runner
            .run(Operation::CreateGroup { group: "B".into() })
            .unwrap();
        assert!(outcome.is_success());

        lock(&runner.in_flight).remove(&OperationKind::Download);
        let outcome = runner
            .run(Operation::Download {
                group: "A".into(),
                version: "v".into(),
                destination: "out".into(),
            })
            .unwrap();
        assert_eq!(outcome.status, 6);
    }

    #[test]
    fn test_invalid_name_is_rejected_before_touching_disk() {
        let (_dir, runner, _events) = runner();
        let outcome = runner
            .run(Operation::CreateGroup {
                group: "../escape".into(),
            })
            .unwrap();
        assert!(matches!(outcome.result, Err(EngineError::InvalidName(_))));
        assert_eq!(outcome.status, 9);
        assert!(runner.context().catalog().list_groups().is_empty());
    }
}
