//! Record header recognition and payload extraction

use super::record::{LogRecord, RecordSource, Role};
use crate::discovery::LogKind;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Separator between message contents in a request payload
const MESSAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{location}: request {id} body is not valid JSON")]
    InvalidJson { location: RecordSource, id: String },

    #[error("{location}: request {id} has no message content")]
    NoMessages { location: RecordSource, id: String },

    #[error("{location}: record header has an empty identifier")]
    EmptyIdentifier { location: RecordSource },

    #[error("{location}: {lines} line(s) of text before the first record header")]
    StrayText { location: RecordSource, lines: usize },
}

impl ParseError {
    pub fn location(&self) -> &RecordSource {
        match self {
            ParseError::InvalidJson { location, .. }
            | ParseError::NoMessages { location, .. }
            | ParseError::EmptyIdentifier { location }
            | ParseError::StrayText { location, .. } => location,
        }
    }
}

/// A recognized record header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub role: Role,
    pub timestamp: String,
    pub id: String,

    /// Text following the header on the same line
    pub remainder: String,
}

pub struct RecordParser {
    request_header: Regex,
    response_header: Regex,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser {
    pub fn new() -> Self {
        Self {
            request_header: Regex::new(r"^\[([^\]]+)\] Generate.*?\[([^\]]+)\]:")
                .expect("valid regex"),
            response_header: Regex::new(r"^\[([^\]]+)\] Generate.*?response \[([^\]]+)\]:")
                .expect("valid regex"),
        }
    }

    /// Recognizes a header line in a log of the given kind. Request logs are
    /// matched only against the request form and response logs only against
    /// the response form.
    pub fn parse_header(&self, line: &str, kind: LogKind) -> Option<Header> {
        let line = line.trim();
        let (role, pattern) = match kind {
            LogKind::Request => (Role::Request, &self.request_header),
            LogKind::Response => (Role::Response, &self.response_header),
        };
        let caps = pattern.captures(line)?;

        let whole = caps.get(0)?;
        Some(Header {
            role,
            timestamp: caps.get(1)?.as_str().trim().to_string(),
            id: caps.get(2)?.as_str().trim().to_string(),
            remainder: line[whole.end()..].trim().to_string(),
        })
    }

    /// Builds a record from a header and the body lines that followed it.
    pub fn parse_record(
        &self,
        header: Header,
        body: &str,
        location: RecordSource,
    ) -> Result<LogRecord, ParseError> {
        if header.id.is_empty() {
            return Err(ParseError::EmptyIdentifier { location });
        }

        let text = if header.remainder.is_empty() {
            body.trim().to_string()
        } else {
            format!("{}\n{}", header.remainder, body).trim().to_string()
        };

        let payload = match header.role {
            Role::Response => text,
            Role::Request => extract_request_payload(&text).map_err(|kind| match kind {
                PayloadError::InvalidJson => ParseError::InvalidJson {
                    location: location.clone(),
                    id: header.id.clone(),
                },
                PayloadError::NoMessages => ParseError::NoMessages {
                    location: location.clone(),
                    id: header.id.clone(),
                },
            })?,
        };

        Ok(LogRecord::new(
            header.id,
            header.role,
            header.timestamp,
            payload,
            location,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    InvalidJson,
    NoMessages,
}

/// Joins the `content` of every entry in the body's `messages` array.
///
/// Bodies that are not valid JSON (truncated lines, stray control
/// characters) go through a line-oriented extraction instead.
pub fn extract_request_payload(body: &str) -> Result<String, PayloadError> {
    let contents: Vec<String> = match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let messages = value
                .get("messages")
                .and_then(Value::as_array)
                .ok_or(PayloadError::NoMessages)?;
            messages.iter().filter_map(message_content).collect()
        }
        Err(_) => {
            if !body.contains("\"messages\"") {
                return Err(PayloadError::InvalidJson);
            }
            let contents = lenient_message_contents(body);
            if contents.is_empty() {
                return Err(PayloadError::InvalidJson);
            }
            contents
        }
    };

    if contents.is_empty() {
        return Err(PayloadError::NoMessages);
    }
    Ok(contents.join(MESSAGE_SEPARATOR))
}

/// `content` as a plain string, or the `text` parts of a content array.
fn message_content(message: &Value) -> Option<String> {
    match message.get("content")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join(MESSAGE_SEPARATOR))
            }
        }
        _ => None,
    }
}

fn strip_closing_quote(s: &str) -> Option<&str> {
    s.strip_suffix("\",").or_else(|| s.strip_suffix('"'))
}

/// Decodes JSON string escapes when the fragment allows it.
fn unescape(fragment: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", fragment))
        .unwrap_or_else(|_| fragment.to_string())
}

fn lenient_message_contents(body: &str) -> Vec<String> {
    let mut contents = Vec::new();
    let mut in_messages = false;
    let mut open: Option<Vec<String>> = None;

    for line in body.lines() {
        let stripped = line.trim();

        if !in_messages {
            in_messages = stripped.contains("\"messages\"");
            continue;
        }

        if let Some(lines) = open.as_mut() {
            match strip_closing_quote(stripped) {
                Some(last) => {
                    lines.push(last.to_string());
                    contents.push(unescape(&lines.join("\n")));
                    open = None;
                }
                None => lines.push(stripped.to_string()),
            }
            continue;
        }

        if let Some((_, rest)) = stripped.split_once("\"content\":") {
            if let Some(value) = rest.trim().strip_prefix('"') {
                match strip_closing_quote(value) {
                    Some(single) => contents.push(unescape(single)),
                    None => open = Some(vec![value.to_string()]),
                }
            }
        } else if stripped == "]" || stripped == "]," {
            break;
        }
    }

    if let Some(lines) = open {
        contents.push(unescape(&lines.join("\n")));
    }
    contents
}
