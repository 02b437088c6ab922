//! Progress handler trait and events

use crate::prompt::PromptType;
use std::time::Duration;

/// Events emitted while a pipeline run progresses
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started over this many log files
    Started { log_files: usize, signatures: usize },

    /// A pair was written to storage
    PairWritten { id: String, prompt_type: PromptType },

    /// A completed pair could not be written
    WriteFailed { id: String, error: String },

    /// Run finished
    Completed {
        pairs_written: usize,
        unmatched: usize,
        total_time: Duration,
    },

    /// Run aborted
    Failed { error: String },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
