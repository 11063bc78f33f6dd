/// Receives `(stage_text, percent)` updates from a transfer.
pub trait ProgressSink {
    fn report(&mut self, stage: &str, percent: u8);
}

impl<F> ProgressSink for F
where
    F: FnMut(&str, u8),
{
    fn report(&mut self, stage: &str, percent: u8) {
        self(stage, percent)
    }
}

/// A sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _stage: &str, _percent: u8) {}
}

/// Turns per-file completion into strictly increasing percentages.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a mut dyn ProgressSink,
    stage: String,
    total: usize,
    done: usize,
    last: Option<u8>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a mut dyn ProgressSink, stage: &str, total: usize) -> Self {
        Self {
            sink,
            stage: stage.to_string(),
            total,
            done: 0,
            last: None,
        }
    }

    /// Emits `percent` unless it would not advance the last emitted value.
    pub(crate) fn emit(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last.is_none_or(|last| percent > last) {
            self.sink.report(&self.stage, percent);
            self.last = Some(percent);
        }
    }

    pub(crate) fn start(&mut self) {
        self.emit(0);
    }

    /// Marks one unit done: `done / total * 100`, rounded down.
    pub(crate) fn advance(&mut self) {
        self.done = (self.done + 1).min(self.total);
        if self.total > 0 {
            let percent = (self.done * 100 / self.total) as u8;
            self.emit(percent);
        }
    }

    pub(crate) fn finish(&mut self) {
        self.emit(100);
    }
}
