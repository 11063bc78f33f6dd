use std::fmt;

/// Identifier assigned to each submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Messages from workers to whoever renders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress {
        job: JobId,
        text: String,
        percent: u8,
    },
    Notify {
        job: Option<JobId>,
        severity: Severity,
        message: String,
    },
    /// Sent exactly once per job. `status` is 0 on success.
    Finished {
        job: JobId,
        operation: &'static str,
        status: i32,
    },
}

/// The sending half a worker uses for one job.
///
/// Sends never block and never fail the job: if the receiver is gone the
/// event is dropped.
#[derive(Debug, Clone)]
pub struct Emitter {
    job: JobId,
    sender: flume::Sender<EngineEvent>,
}

impl Emitter {
    pub fn new(job: JobId, sender: flume::Sender<EngineEvent>) -> Self {
        Self { job, sender }
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    fn send(&self, event: EngineEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!(job = %self.job, "event receiver dropped");
        }
    }

    pub fn progress(&self, text: &str, percent: u8) {
        self.send(EngineEvent::Progress {
            job: self.job,
            text: text.to_string(),
            percent,
        });
    }

    pub fn notify(&self, severity: Severity, message: impl Into<String>) {
        self.send(EngineEvent::Notify {
            job: Some(self.job),
            severity,
            message: message.into(),
        });
    }

    pub(crate) fn finished(&self, operation: &'static str, status: i32) {
        self.send(EngineEvent::Finished {
            job: self.job,
            operation,
            status,
        });
    }
}
