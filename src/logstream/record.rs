use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Timestamp layout of record headers, fractional seconds optional
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Request,
    Response,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Request => f.write_str("request"),
            Role::Response => f.write_str("response"),
        }
    }
}

/// File and 1-based header line a record was read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSource {
    pub path: PathBuf,
    pub line: usize,
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// One request or response entry from a raw log
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub id: String,
    pub role: Role,

    /// Header timestamp exactly as logged
    pub timestamp: String,
    pub parsed_timestamp: Option<NaiveDateTime>,

    /// Request message contents or response text
    pub payload: String,
    pub source: RecordSource,
}

impl LogRecord {
    pub fn new(
        id: impl Into<String>,
        role: Role,
        timestamp: impl Into<String>,
        payload: impl Into<String>,
        source: RecordSource,
    ) -> Self {
        let timestamp = timestamp.into();
        Self {
            id: id.into(),
            role,
            parsed_timestamp: parse_timestamp(&timestamp),
            timestamp,
            payload: payload.into(),
            source,
        }
    }

    pub fn is_request(&self) -> bool {
        self.role == Role::Request
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn source() -> RecordSource {
        RecordSource {
            path: PathBuf::from("logs/openrouter_input.log"),
            line: 12,
        }
    }

    #[test]
    fn test_parse_timestamp_with_fraction() {
        let ts = parse_timestamp("2024-01-15 10:30:45.123456").unwrap();
        assert_eq!(ts.second(), 45);
        assert_eq!(ts.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_parse_timestamp_without_fraction() {
        assert!(parse_timestamp("2024-01-15 10:30:45").is_some());
    }

    #[test]
    fn test_unparsable_timestamp_keeps_record() {
        let record = LogRecord::new("42", Role::Request, "yesterday", "body", source());
        assert_eq!(record.timestamp, "yesterday");
        assert!(record.parsed_timestamp.is_none());
        assert!(record.is_request());
    }

    #[test]
    fn test_source_display() {
        assert_eq!(source().to_string(), "logs/openrouter_input.log:12");
    }
}
