//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                log_files,
                signatures,
            } => {
                info!(log_files, signatures, "Starting extraction");
            }
            ProgressEvent::PairWritten { id, prompt_type } => {
                debug!(id = %id, prompt_type = %prompt_type, "Pair written");
            }
            ProgressEvent::WriteFailed { id, error } => {
                warn!(id = %id, error = %error, "Pair not written");
            }
            ProgressEvent::Completed {
                pairs_written,
                unmatched,
                total_time,
            } => {
                info!(
                    pairs = pairs_written,
                    unmatched,
                    total_time_ms = total_time.as_millis(),
                    "Extraction complete"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Extraction failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptType;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::Started {
                log_files: 2,
                signatures: 15,
            },
            ProgressEvent::PairWritten {
                id: "42".to_string(),
                prompt_type: PromptType::EvaluateMood,
            },
            ProgressEvent::WriteFailed {
                id: "43".to_string(),
                error: "permission denied".to_string(),
            },
            ProgressEvent::Completed {
                pairs_written: 1,
                unmatched: 1,
                total_time: Duration::from_secs(1),
            },
            ProgressEvent::Failed {
                error: "no input".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
