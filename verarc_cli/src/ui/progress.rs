//! Renders a job's event stream as an indicatif bar.

use std::time::Duration;
use flume::RecvTimeoutError;
use indicatif::{ProgressBar, ProgressStyle};
use verarc::jobs::{EngineEvent, JobHandle, JobOutcome, Severity};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{msg}] [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Consumes events until `handle`'s job finishes, then joins it.
pub fn follow(handle: JobHandle, events: &flume::Receiver<EngineEvent>) -> JobOutcome {
    let id = handle.id();
    let pb = bar();
    loop {
        let event = match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event,
            // A worker that died without reporting must not hang the CLI.
            Err(RecvTimeoutError::Timeout) if handle.is_finished() => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        match event {
            EngineEvent::Progress { job, text, percent } if job == id => {
                pb.set_message(text);
                pb.set_position(u64::from(percent));
            }
            EngineEvent::Notify {
                severity: Severity::Info,
                message,
                ..
            } => pb.suspend(|| println!("{}", message)),
            // Failures are reported once, from the outcome.
            EngineEvent::Notify { .. } => {}
            EngineEvent::Finished { job, .. } if job == id => break,
            _ => {}
        }
    }
    pb.finish_and_clear();
    handle.wait()
}
