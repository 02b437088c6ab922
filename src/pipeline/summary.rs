use crate::prompt::PromptType;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// End-of-run counts for every non-fatal condition
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub log_files: usize,
    pub unreadable_files: usize,

    /// Opened files whose reading stopped on an I/O error
    pub read_errors: usize,
    pub records: usize,
    pub requests: usize,
    pub responses: usize,
    pub parse_errors: usize,
    pub ambiguous_matches: usize,
    pub duplicate_requests: usize,
    pub write_errors: usize,

    /// Signature artifacts that exist but could not be loaded
    pub signature_failures: Vec<String>,

    /// Known types with no usable signature; their requests go to `unknown`
    pub missing_signatures: Vec<PromptType>,

    /// Requests per assigned type, including ones never answered
    pub classified: BTreeMap<PromptType, usize>,
    pub pairs_written: BTreeMap<PromptType, usize>,

    /// Identifiers of requests that never received a response, sorted
    pub unmatched_requests: Vec<String>,

    /// Identifiers of dropped responses, in stream order
    pub orphan_responses: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_report: Option<PathBuf>,
}

impl RunSummary {
    pub fn total_pairs_written(&self) -> usize {
        self.pairs_written.values().sum()
    }

    pub fn pairs_written_for(&self, prompt_type: PromptType) -> usize {
        self.pairs_written.get(&prompt_type).copied().unwrap_or(0)
    }

    /// Whether any record, pair, file or signature was skipped or needed a
    /// tie-break.
    pub fn has_warnings(&self) -> bool {
        self.unreadable_files > 0
            || self.read_errors > 0
            || self.parse_errors > 0
            || self.ambiguous_matches > 0
            || self.duplicate_requests > 0
            || self.write_errors > 0
            || !self.unmatched_requests.is_empty()
            || !self.orphan_responses.is_empty()
            || !self.signature_failures.is_empty()
            || !self.missing_signatures.is_empty()
    }

    pub(crate) fn count_classified(&mut self, prompt_type: PromptType) {
        *self.classified.entry(prompt_type).or_default() += 1;
    }

    pub(crate) fn count_written(&mut self, prompt_type: PromptType) {
        *self.pairs_written.entry(prompt_type).or_default() += 1;
    }
}
