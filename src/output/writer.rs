use crate::pairing::RequestResponsePair;
use crate::prompt::PromptType;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const REQUEST_DIR: &str = "request";
const RESPONSE_DIR: &str = "response";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("identifier {0:?} is not usable as a file name")]
    InvalidIdentifier(String),

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Paths written for one pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPair {
    pub request_path: PathBuf,
    pub response_path: PathBuf,
}

/// Stores pairs as `<root>/request/<type>/<id>` and
/// `<root>/response/<type>/<id>`, each file holding the raw payload.
#[derive(Debug, Clone)]
pub struct PairWriter {
    root: PathBuf,
}

impl PairWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn request_dir(&self, prompt_type: PromptType) -> PathBuf {
        self.root.join(REQUEST_DIR).join(prompt_type.as_str())
    }

    pub fn response_dir(&self, prompt_type: PromptType) -> PathBuf {
        self.root.join(RESPONSE_DIR).join(prompt_type.as_str())
    }

    pub fn request_path(&self, prompt_type: PromptType, id: &str) -> PathBuf {
        self.request_dir(prompt_type).join(id)
    }

    pub fn response_path(&self, prompt_type: PromptType, id: &str) -> PathBuf {
        self.response_dir(prompt_type).join(id)
    }

    /// Creates the request and response directory of every prompt type.
    pub fn prepare(&self) -> Result<(), WriteError> {
        for prompt_type in PromptType::all_variants() {
            for dir in [self.request_dir(*prompt_type), self.response_dir(*prompt_type)] {
                std::fs::create_dir_all(&dir)
                    .map_err(|source| WriteError::CreateDir { path: dir, source })?;
            }
        }
        debug!(root = %self.root.display(), "Prepared output layout");
        Ok(())
    }

    /// Writes both halves of a pair, replacing earlier files for the same
    /// identifier.
    ///
    /// Each half is staged next to its target and renamed into place. On
    /// failure nothing of the new pair is left behind.
    pub fn write(&self, pair: &RequestResponsePair) -> Result<WrittenPair, WriteError> {
        validate_identifier(pair.id())?;

        let prompt_type = pair.prompt_type();
        let written = WrittenPair {
            request_path: self.request_path(prompt_type, pair.id()),
            response_path: self.response_path(prompt_type, pair.id()),
        };

        let request_staged = stage_file(&written.request_path, pair.request_text())?;
        let response_staged = match stage_file(&written.response_path, pair.response_text()) {
            Ok(staged) => staged,
            Err(e) => {
                discard(&request_staged);
                return Err(e);
            }
        };

        if let Err(e) = commit(&request_staged, &written.request_path) {
            discard(&request_staged);
            discard(&response_staged);
            return Err(e);
        }
        if let Err(e) = commit(&response_staged, &written.response_path) {
            discard(&response_staged);
            discard(&written.request_path);
            return Err(e);
        }

        debug!(id = %pair.id(), prompt_type = %prompt_type, "Wrote pair");
        Ok(written)
    }
}

/// Writes `contents` to a hidden sibling of `path`, returning the sibling.
fn stage_file(path: &Path, contents: &str) -> Result<PathBuf, WriteError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
        path: parent.to_path_buf(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staged = parent.join(format!(".{}.partial", name));
    std::fs::write(&staged, contents).map_err(|source| WriteError::Io {
        path: staged.clone(),
        source,
    })?;
    Ok(staged)
}

fn commit(staged: &Path, target: &Path) -> Result<(), WriteError> {
    std::fs::rename(staged, target).map_err(|source| WriteError::Io {
        path: target.to_path_buf(),
        source,
    })
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial output");
        }
    }
}

/// Rejects identifiers that would escape or collapse the type directory.
pub fn validate_identifier(id: &str) -> Result<(), WriteError> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0']);
    if invalid {
        Err(WriteError::InvalidIdentifier(id.to_string()))
    } else {
        Ok(())
    }
}
