//! Raw log reading
//!
//! A log is a sequence of records, each opened by a header line. Request
//! logs hold only requests:
//!
//! ```text
//! [2024-01-15 10:30:45.123] Generate chat completion [42]:
//! {"messages": [{"role": "system", "content": "..."}]}
//! ```
//!
//! and response logs only responses:
//!
//! ```text
//! [2024-01-15 10:30:47.500] Generate chat completion response [42]:
//! Happy
//! ```
//!
//! The body of a record is every line up to the next header.

pub mod parser;
pub mod reader;
pub mod record;

pub use parser::{ParseError, RecordParser};
pub use reader::{LogStreamReader, ReadError, ReadStats};
pub use record::{parse_timestamp, LogRecord, RecordSource, Role, TIMESTAMP_FORMAT};
