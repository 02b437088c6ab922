use crate::classify::ClassifiedRequest;
use crate::logstream::LogRecord;
use crate::prompt::PromptType;

/// A classified request and the response that shares its identifier.
///
/// Only the correlator builds these, so both halves always carry the same
/// identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResponsePair {
    pub request: ClassifiedRequest,
    pub response: LogRecord,
}

impl RequestResponsePair {
    pub(crate) fn new(request: ClassifiedRequest, response: LogRecord) -> Self {
        debug_assert_eq!(request.record.id, response.id);
        Self { request, response }
    }

    pub fn id(&self) -> &str {
        &self.request.record.id
    }

    pub fn prompt_type(&self) -> PromptType {
        self.request.prompt_type
    }

    pub fn request_text(&self) -> &str {
        &self.request.record.payload
    }

    pub fn response_text(&self) -> &str {
        &self.response.payload
    }

    /// Seconds between the request and response timestamps, when both parse.
    pub fn response_time(&self) -> Option<f64> {
        let sent = self.request.record.parsed_timestamp?;
        let received = self.response.parsed_timestamp?;
        (received - sent)
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
    }
}
