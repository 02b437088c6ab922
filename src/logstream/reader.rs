use super::parser::{Header, ParseError, RecordParser};
use super::record::{LogRecord, RecordSource};
use crate::discovery::{LogFile, LogKind};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to open log file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read log file {path} after line {line}: {source}")]
    Interrupted {
        path: PathBuf,
        line: usize,
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadStats {
    pub files_opened: usize,

    /// Files that could not be opened
    pub files_failed: usize,

    /// Opened files whose reading stopped on an I/O error
    pub read_errors: usize,
    pub records: usize,
    pub parse_errors: usize,
}

/// Lazy record sequence over a list of log files.
///
/// Files are read in the order given and each is streamed line by line.
/// A file's kind decides which header form opens its records.
/// Parse failures and unreadable files surface as `Err` items and the
/// sequence continues with the next record or file. A new reader over the
/// same paths replays the same sequence.
pub struct LogStreamReader {
    parser: RecordParser,
    queue: VecDeque<LogFile>,
    current: Option<FileBlocks>,
    stats: ReadStats,
}

impl LogStreamReader {
    pub fn new<I>(files: I) -> Self
    where
        I: IntoIterator<Item = LogFile>,
    {
        Self {
            parser: RecordParser::new(),
            queue: files.into_iter().collect(),
            current: None,
            stats: ReadStats::default(),
        }
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }
}

impl Iterator for LogStreamReader {
    type Item = Result<LogRecord, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(file) = self.current.as_mut() {
                match file.next_record(&self.parser) {
                    Some(Ok(record)) => {
                        self.stats.records += 1;
                        return Some(Ok(record));
                    }
                    Some(Err(err)) => {
                        match err {
                            ReadError::Parse(_) => self.stats.parse_errors += 1,
                            ReadError::Io { .. } => self.stats.files_failed += 1,
                            ReadError::Interrupted { .. } => self.stats.read_errors += 1,
                        }
                        return Some(Err(err));
                    }
                    None => self.current = None,
                }
            }

            let LogFile { path, kind } = self.queue.pop_front()?;
            match File::open(&path) {
                Ok(file) => {
                    debug!(path = %path.display(), kind = ?kind, "Reading log file");
                    self.stats.files_opened += 1;
                    self.current = Some(FileBlocks::new(path, kind, file));
                }
                Err(source) => {
                    self.stats.files_failed += 1;
                    return Some(Err(ReadError::Io { path, source }));
                }
            }
        }
    }
}

/// Splits one file into header-delimited blocks
struct FileBlocks {
    path: PathBuf,
    kind: LogKind,
    reader: BufReader<File>,
    line_no: usize,
    next_header: Option<(Header, usize)>,
    done: bool,
}

impl FileBlocks {
    fn new(path: PathBuf, kind: LogKind, file: File) -> Self {
        Self {
            path,
            kind,
            reader: BufReader::new(file),
            line_no: 0,
            next_header: None,
            done: false,
        }
    }

    fn location(&self, line: usize) -> RecordSource {
        RecordSource {
            path: self.path.clone(),
            line,
        }
    }

    fn io_error(&mut self, source: std::io::Error) -> ReadError {
        self.done = true;
        ReadError::Interrupted {
            path: self.path.clone(),
            line: self.line_no,
            source,
        }
    }

    /// Next line, invalid UTF-8 replaced.
    fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Scans to the first header, reporting any text in front of it.
    fn first_header(
        &mut self,
        parser: &RecordParser,
    ) -> Result<Option<(Header, usize)>, ReadError> {
        let mut stray_lines = 0;
        let mut stray_start = 0;

        loop {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.done = true;
                    if stray_lines > 0 {
                        return Err(ParseError::StrayText {
                            location: self.location(stray_start),
                            lines: stray_lines,
                        }
                        .into());
                    }
                    return Ok(None);
                }
                Err(e) => return Err(self.io_error(e)),
            };

            if let Some(header) = parser.parse_header(&line, self.kind) {
                let found = (header, self.line_no);
                if stray_lines > 0 {
                    self.next_header = Some(found);
                    return Err(ParseError::StrayText {
                        location: self.location(stray_start),
                        lines: stray_lines,
                    }
                    .into());
                }
                return Ok(Some(found));
            }

            if !line.trim().is_empty() {
                if stray_lines == 0 {
                    stray_start = self.line_no;
                }
                stray_lines += 1;
            }
        }
    }

    fn next_record(&mut self, parser: &RecordParser) -> Option<Result<LogRecord, ReadError>> {
        if self.done && self.next_header.is_none() {
            return None;
        }

        let (header, header_line) = match self.next_header.take() {
            Some(found) => found,
            None => match self.first_header(parser) {
                Ok(Some(found)) => found,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            },
        };

        let mut body = String::new();
        while !self.done {
            match self.next_line() {
                Ok(Some(line)) => match parser.parse_header(&line, self.kind) {
                    Some(next) => {
                        self.next_header = Some((next, self.line_no));
                        break;
                    }
                    None => body.push_str(&line),
                },
                Ok(None) => self.done = true,
                Err(e) => return Some(Err(self.io_error(e))),
            }
        }

        Some(
            parser
                .parse_record(header, &body, self.location(header_line))
                .map_err(ReadError::from),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logstream::Role;
    use std::fs;
    use tempfile::TempDir;

    const REQUEST_LOG: &str = r#"[2024-01-15 10:30:45.100] Generate chat completion [1]:
{"messages": [{"role": "system", "content": "first"}]}
[2024-01-15 10:30:46.100] Generate chat completion [2]:
{"messages": [{"role": "system", "content": "second"}]}
"#;

    fn write(dir: &TempDir, name: &str, contents: &[u8]) -> LogFile {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        LogFile::from_path(path).unwrap()
    }

    #[test]
    fn test_reads_records_in_file_order() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "openrouter_input.log", REQUEST_LOG.as_bytes());
        let output = write(
            &dir,
            "openrouter_output.log",
            b"[2024-01-15 10:30:47.000] Generate chat completion response [2]:\nSecond answer\n",
        );

        let mut reader = LogStreamReader::new([input, output]);
        let records: Vec<LogRecord> = reader.by_ref().map(|r| r.unwrap()).collect();

        let ids: Vec<_> = records.iter().map(|r| (r.id.as_str(), r.role)).collect();
        assert_eq!(
            ids,
            vec![
                ("1", Role::Request),
                ("2", Role::Request),
                ("2", Role::Response)
            ]
        );
        assert_eq!(records[1].payload, "second");
        assert_eq!(records[1].source.line, 3);
        assert_eq!(records[2].payload, "Second answer");
        assert_eq!(reader.stats().files_opened, 2);
        assert_eq!(reader.stats().records, 3);
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let dir = TempDir::new().unwrap();
        let log = write(
            &dir,
            "openrouter_input.log",
            b"[2024-01-15 10:30:45] Generate [1]:\n{ truncated\n[2024-01-15 10:30:46] Generate [2]:\n{\"messages\": [{\"content\": \"ok\"}]}\n",
        );

        let mut reader = LogStreamReader::new([log]);
        let items: Vec<_> = reader.by_ref().collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[0],
            Err(ReadError::Parse(ParseError::InvalidJson { .. }))
        ));
        assert_eq!(items[1].as_ref().unwrap().id, "2");
        assert_eq!(reader.stats().parse_errors, 1);
    }

    #[test]
    fn test_stray_text_before_first_header() {
        let dir = TempDir::new().unwrap();
        let log = write(
            &dir,
            "openrouter_output.log",
            b"leftover from a previous session\n\n[2024-01-15 10:30:47] Generate response [3]:\nDone\n",
        );

        let items: Vec<_> = LogStreamReader::new([log]).collect();
        assert_eq!(items.len(), 2);
        match &items[0] {
            Err(ReadError::Parse(ParseError::StrayText { location, lines })) => {
                assert_eq!(location.line, 1);
                assert_eq!(*lines, 1);
            }
            other => panic!("expected stray text, got {:?}", other),
        }
        assert_eq!(items[1].as_ref().unwrap().payload, "Done");
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let dir = TempDir::new().unwrap();
        let log = write(
            &dir,
            "openrouter_output.log",
            b"[2024-01-15 10:30:47] Generate response [4]:\nbad \xff byte\n",
        );

        let records: Vec<_> = LogStreamReader::new([log]).collect();
        let record = records[0].as_ref().unwrap();
        assert!(record.payload.starts_with("bad "));
        assert!(record.payload.contains('\u{FFFD}'));
    }

    #[test]
    fn test_missing_file_is_reported_and_skipped() {
        let dir = TempDir::new().unwrap();
        let log = write(&dir, "openrouter_input.log", REQUEST_LOG.as_bytes());

        let mut reader = LogStreamReader::new([
            LogFile::new(dir.path().join("openrouter_input.log.9"), LogKind::Request),
            log,
        ]);
        let items: Vec<_> = reader.by_ref().collect();
        assert!(matches!(items[0], Err(ReadError::Io { .. })));
        assert_eq!(items.iter().filter(|i| i.is_ok()).count(), 2);
        assert_eq!(reader.stats().files_failed, 1);
        assert_eq!(reader.stats().read_errors, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_failure_after_open_is_not_an_open_failure() {
        let dir = TempDir::new().unwrap();
        let unreadable = LogFile::new(dir.path(), LogKind::Request);
        let log = write(&dir, "openrouter_input.log", REQUEST_LOG.as_bytes());

        let mut reader = LogStreamReader::new([unreadable, log]);
        let items: Vec<_> = reader.by_ref().collect();
        assert!(matches!(items[0], Err(ReadError::Interrupted { .. })));
        assert_eq!(items.iter().filter(|i| i.is_ok()).count(), 2);

        let stats = reader.stats();
        assert_eq!(stats.files_opened, 2);
        assert_eq!(stats.files_failed, 0);
        assert_eq!(stats.read_errors, 1);
    }

    #[test]
    fn test_request_header_naming_a_response_type() {
        let dir = TempDir::new().unwrap();
        let input = write(
            &dir,
            "openrouter_input.log",
            b"[2024-01-15 10:30:45] Generate dialogue_response [42]:\n{\"messages\": [{\"content\": \"Speak.\"}]}\n",
        );
        let output = write(
            &dir,
            "openrouter_output.log",
            b"[2024-01-15 10:30:47] Generate dialogue_response response [42]:\nHello\n",
        );

        let records: Vec<LogRecord> = LogStreamReader::new([input, output])
            .map(|r| r.unwrap())
            .collect();
        let roles: Vec<_> = records.iter().map(|r| (r.id.as_str(), r.role)).collect();
        assert_eq!(roles, vec![("42", Role::Request), ("42", Role::Response)]);
        assert_eq!(records[0].payload, "Speak.");
    }

    #[test]
    fn test_restart_replays_same_sequence() {
        let dir = TempDir::new().unwrap();
        let log = write(&dir, "openrouter_input.log", REQUEST_LOG.as_bytes());

        let first: Vec<_> = LogStreamReader::new([log.clone()])
            .map(|r| r.unwrap())
            .collect();
        let second: Vec<_> = LogStreamReader::new([log])
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let log = write(&dir, "openrouter_input.log", b"");
        assert_eq!(LogStreamReader::new([log]).count(), 0);
    }
}
