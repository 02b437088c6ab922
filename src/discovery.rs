//! Log file discovery
//!
//! Request logs are named `openrouter_input.log*` and response logs
//! `openrouter_output.log*`; a numeric suffix marks a rotated file, larger
//! numbers being older.

use ignore::WalkBuilder;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const REQUEST_LOG_PREFIX: &str = "openrouter_input.log";
pub const RESPONSE_LOG_PREFIX: &str = "openrouter_output.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Request,
    Response,
}

impl LogKind {
    /// Classifies a file name, returning the part after the log prefix.
    pub fn from_file_name(name: &str) -> Option<(LogKind, &str)> {
        if let Some(suffix) = name.strip_prefix(REQUEST_LOG_PREFIX) {
            Some((LogKind::Request, suffix))
        } else {
            name.strip_prefix(RESPONSE_LOG_PREFIX)
                .map(|suffix| (LogKind::Response, suffix))
        }
    }
}

/// A log file and the kind of records it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    pub kind: LogKind,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>, kind: LogKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Kind taken from the file name; `None` for names that are not logs.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let (kind, _) = LogKind::from_file_name(path.file_name()?.to_str()?)?;
        Some(Self { path, kind })
    }
}

/// Files to read, in processing order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveredLogs {
    pub files: Vec<LogFile>,
    pub request_logs: usize,
    pub response_logs: usize,
    pub missing_dirs: Vec<PathBuf>,
}

impl DiscoveredLogs {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Sort key placing rotated files oldest first: `.N` by descending N, any
/// other suffix by name, the live file last.
fn rotation_key(suffix: &str) -> (u8, Reverse<u64>, String) {
    if suffix.is_empty() {
        return (2, Reverse(0), String::new());
    }
    match suffix.strip_prefix('.').and_then(|n| n.parse::<u64>().ok()) {
        Some(n) => (0, Reverse(n), String::new()),
        None => (1, Reverse(0), suffix.to_string()),
    }
}

#[derive(Default)]
struct DirLogs {
    requests: Vec<((u8, Reverse<u64>, String), PathBuf)>,
    responses: Vec<((u8, Reverse<u64>, String), PathBuf)>,
}

/// Recursively finds request and response logs below `base_dirs`.
///
/// Directories are processed in lexical order; within a directory all
/// request logs come before all response logs so every request of a session
/// is pending before its responses are read.
pub fn discover_logs(base_dirs: &[PathBuf]) -> DiscoveredLogs {
    let mut discovered = DiscoveredLogs::default();
    let mut by_dir: BTreeMap<PathBuf, DirLogs> = BTreeMap::new();

    for base in base_dirs {
        if !base.is_dir() {
            warn!(dir = %base.display(), "Log directory not found");
            discovered.missing_dirs.push(base.clone());
            continue;
        }
        collect_dir(base, &mut by_dir);
    }

    for (dir, mut logs) in by_dir {
        logs.requests.sort();
        logs.responses.sort();
        logs.requests.dedup();
        logs.responses.dedup();
        debug!(
            dir = %dir.display(),
            requests = logs.requests.len(),
            responses = logs.responses.len(),
            "Found session logs"
        );

        discovered.request_logs += logs.requests.len();
        discovered.response_logs += logs.responses.len();
        discovered.files.extend(
            logs.requests
                .into_iter()
                .map(|(_, path)| LogFile::new(path, LogKind::Request)),
        );
        discovered.files.extend(
            logs.responses
                .into_iter()
                .map(|(_, path)| LogFile::new(path, LogKind::Response)),
        );
    }

    info!(
        request_logs = discovered.request_logs,
        response_logs = discovered.response_logs,
        "Discovered log files"
    );
    discovered
}

fn collect_dir(base: &Path, by_dir: &mut BTreeMap<PathBuf, DirLogs>) {
    for result in WalkBuilder::new(base).standard_filters(false).build() {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "Failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().map_or(false, |ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((kind, suffix)) = LogKind::from_file_name(name) else {
            continue;
        };

        let parent = path.parent().unwrap_or(base).to_path_buf();
        let logs = by_dir.entry(parent).or_default();
        let item = (rotation_key(suffix), path.to_path_buf());
        match kind {
            LogKind::Request => logs.requests.push(item),
            LogKind::Response => logs.responses.push(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn names(root: &Path, logs: &DiscoveredLogs) -> Vec<String> {
        logs.files
            .iter()
            .map(|f| f.path.strip_prefix(root).unwrap().display().to_string())
            .collect()
    }

    #[test]
    fn test_rotation_order() {
        let dir = TempDir::new().unwrap();
        for name in [
            "openrouter_input.log",
            "openrouter_input.log.1",
            "openrouter_input.log.10",
            "openrouter_input.log.2",
            "openrouter_output.log",
            "openrouter_output.log.1",
            "unrelated.log",
        ] {
            touch(dir.path(), name);
        }

        let logs = discover_logs(&[dir.path().to_path_buf()]);
        assert_eq!(
            names(dir.path(), &logs),
            vec![
                "openrouter_input.log.10",
                "openrouter_input.log.2",
                "openrouter_input.log.1",
                "openrouter_input.log",
                "openrouter_output.log.1",
                "openrouter_output.log",
            ]
        );
        assert_eq!(logs.request_logs, 4);
        assert_eq!(logs.response_logs, 2);
        assert_eq!(logs.files[3].kind, LogKind::Request);
        assert_eq!(logs.files[4].kind, LogKind::Response);
    }

    #[test]
    fn test_directories_in_lexical_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "session_b/openrouter_output.log");
        touch(dir.path(), "session_b/openrouter_input.log");
        touch(dir.path(), "session_a/nested/openrouter_input.log");
        touch(dir.path(), ".hidden/openrouter_input.log");

        let logs = discover_logs(&[dir.path().to_path_buf()]);
        assert_eq!(
            names(dir.path(), &logs),
            vec![
                ".hidden/openrouter_input.log",
                "session_a/nested/openrouter_input.log",
                "session_b/openrouter_input.log",
                "session_b/openrouter_output.log",
            ]
        );
    }

    #[test]
    fn test_missing_and_overlapping_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "inner/openrouter_input.log");

        let logs = discover_logs(&[
            dir.path().to_path_buf(),
            dir.path().join("inner"),
            dir.path().join("absent"),
        ]);
        assert_eq!(logs.files.len(), 1);
        assert_eq!(logs.missing_dirs, vec![dir.path().join("absent")]);
    }

    #[test]
    fn test_log_kind_from_file_name() {
        assert_eq!(
            LogKind::from_file_name("openrouter_input.log.3"),
            Some((LogKind::Request, ".3"))
        );
        assert_eq!(
            LogKind::from_file_name("openrouter_output.log"),
            Some((LogKind::Response, ""))
        );
        assert_eq!(LogKind::from_file_name("server.log"), None);
    }

    #[test]
    fn test_log_file_from_path() {
        let file = LogFile::from_path("logs/openrouter_output.log.2").unwrap();
        assert_eq!(file.kind, LogKind::Response);
        assert!(LogFile::from_path("logs/server.log").is_none());
    }
}
