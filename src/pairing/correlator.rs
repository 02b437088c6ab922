//! Identifier-keyed request/response correlation
//!
//! Each identifier moves through `unseen -> pending -> complete`. A request
//! makes its identifier pending; the next response with that identifier
//! completes it and removes it from the pending map. A response with no
//! pending request (including one logged before its request) is an orphan.

use super::pair::RequestResponsePair;
use crate::classify::ClassifiedRequest;
use crate::logstream::{LogRecord, RecordSource};
use crate::prompt::PromptType;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("response {id} at {location} has no pending request")]
pub struct OrphanResponse {
    pub id: String,
    pub location: RecordSource,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("request {id} ({prompt_type}) at {location} never received a response")]
pub struct UnmatchedRequest {
    pub id: String,
    pub prompt_type: PromptType,
    pub location: RecordSource,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorrelationStats {
    pub requests: usize,
    pub responses: usize,
    pub pairs: usize,
    pub orphans: usize,
    pub duplicates: usize,
}

#[derive(Debug)]
pub struct CorrelationOutcome {
    /// Requests still pending at end of stream, sorted by identifier
    pub unmatched: Vec<UnmatchedRequest>,
    pub stats: CorrelationStats,
}

#[derive(Debug, Default)]
pub struct PairCorrelator {
    pending: HashMap<String, ClassifiedRequest>,
    stats: CorrelationStats,
}

impl PairCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the request's identifier pending.
    ///
    /// If the identifier is already pending, the new request replaces the
    /// old one, which is returned.
    pub fn observe_request(&mut self, request: ClassifiedRequest) -> Option<ClassifiedRequest> {
        self.stats.requests += 1;
        let replaced = self.pending.insert(request.record.id.clone(), request);
        if let Some(old) = &replaced {
            self.stats.duplicates += 1;
            warn!(
                id = %old.record.id,
                previous = %old.record.source,
                "Duplicate request identifier, keeping the later request"
            );
        }
        replaced
    }

    /// Completes the pending request with the same identifier.
    pub fn observe_response(
        &mut self,
        response: LogRecord,
    ) -> Result<RequestResponsePair, OrphanResponse> {
        self.stats.responses += 1;
        match self.pending.remove(&response.id) {
            Some(request) => {
                self.stats.pairs += 1;
                debug!(id = %response.id, prompt_type = %request.prompt_type, "Paired response");
                Ok(RequestResponsePair::new(request, response))
            }
            None => {
                self.stats.orphans += 1;
                let orphan = OrphanResponse {
                    id: response.id,
                    location: response.source,
                };
                warn!(%orphan, "Dropping orphan response");
                Err(orphan)
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn stats(&self) -> CorrelationStats {
        self.stats
    }

    /// Ends the stream; whatever is still pending is unmatched.
    pub fn finish(self) -> CorrelationOutcome {
        let mut unmatched: Vec<UnmatchedRequest> = self
            .pending
            .into_values()
            .map(|request| UnmatchedRequest {
                prompt_type: request.prompt_type,
                id: request.record.id,
                location: request.record.source,
            })
            .collect();
        unmatched.sort_by(|a, b| a.id.cmp(&b.id));

        for request in &unmatched {
            warn!(%request, "Unmatched request");
        }

        CorrelationOutcome {
            unmatched,
            stats: self.stats,
        }
    }
}
