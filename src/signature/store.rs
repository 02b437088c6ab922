//! On-disk type-definition artifacts
//!
//! One `<type>.json` per prompt type, next to a `<type>.example.txt` holding
//! the sample the signature was derived from.

use super::builder::{BuildReport, BuiltSignature};
use super::{PromptTypeSignature, SignatureSet};
use crate::prompt::PromptType;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("signature directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid signature artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize signature for {prompt_type}: {source}")]
    Serialize {
        prompt_type: PromptType,
        source: serde_json::Error,
    },

    #[error("{path} declares prompt type {found}, expected {expected}")]
    TypeMismatch {
        path: PathBuf,
        expected: PromptType,
        found: PromptType,
    },
}

/// Result of loading every artifact in a store
#[derive(Debug, Default)]
pub struct LoadedSignatures {
    pub signatures: SignatureSet,

    /// Artifacts that exist but could not be used
    pub failures: Vec<StoreError>,

    /// Known types without an artifact
    pub missing: Vec<PromptType>,
}

/// Files touched when storing a build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedBuild {
    pub written: Vec<PathBuf>,

    /// Types whose previous artifact was deleted because they no longer build
    pub removed: Vec<PromptType>,
}

#[derive(Debug, Clone)]
pub struct SignatureStore {
    dir: PathBuf,
}

impl SignatureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, prompt_type: PromptType) -> PathBuf {
        self.dir.join(format!("{}.json", prompt_type))
    }

    pub fn example_path(&self, prompt_type: PromptType) -> PathBuf {
        self.dir.join(format!("{}.example.txt", prompt_type))
    }

    /// Writes (or overwrites) the artifact and example for one signature.
    pub fn save(
        &self,
        signature: &PromptTypeSignature,
        example: &str,
    ) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let mut json =
            serde_json::to_string_pretty(signature).map_err(|source| StoreError::Serialize {
                prompt_type: signature.prompt_type,
                source,
            })?;
        json.push('\n');

        let path = self.artifact_path(signature.prompt_type);
        std::fs::write(&path, json).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;

        let example_path = self.example_path(signature.prompt_type);
        std::fs::write(&example_path, example).map_err(|source| StoreError::Write {
            path: example_path,
            source,
        })?;

        debug!(prompt_type = %signature.prompt_type, path = %path.display(), "Saved signature");
        Ok(path)
    }

    pub fn save_all(&self, built: &[BuiltSignature]) -> Result<Vec<PathBuf>, StoreError> {
        built
            .iter()
            .map(|b| self.save(&b.signature, &b.example))
            .collect()
    }

    /// Deletes the artifact and example of one type, returning whether an
    /// artifact was present.
    pub fn remove(&self, prompt_type: PromptType) -> Result<bool, StoreError> {
        let removed = remove_if_present(&self.artifact_path(prompt_type))?;
        remove_if_present(&self.example_path(prompt_type))?;
        if removed {
            debug!(prompt_type = %prompt_type, "Removed signature");
        }
        Ok(removed)
    }

    /// Stores a build: saves every built signature and deletes the artifacts
    /// of types that failed, so the directory mirrors the latest build.
    pub fn save_report(&self, report: &BuildReport) -> Result<SavedBuild, StoreError> {
        let mut saved = SavedBuild {
            written: self.save_all(&report.built)?,
            removed: Vec::new(),
        };

        for prompt_type in report.failures.iter().filter_map(|e| e.prompt_type()) {
            if self.remove(prompt_type)? {
                warn!(prompt_type = %prompt_type, "Removed stale signature artifact");
                saved.removed.push(prompt_type);
            }
        }
        Ok(saved)
    }

    pub fn load(&self, prompt_type: PromptType) -> Result<PromptTypeSignature, StoreError> {
        let path = self.artifact_path(prompt_type);
        let contents = std::fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        let signature: PromptTypeSignature =
            serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?;

        if signature.prompt_type != prompt_type {
            return Err(StoreError::TypeMismatch {
                path,
                expected: prompt_type,
                found: signature.prompt_type,
            });
        }
        Ok(signature)
    }

    /// Loads the artifact of every known prompt type.
    ///
    /// Only a missing directory is an error; unusable artifacts are collected
    /// in [`LoadedSignatures::failures`] and absent ones in `missing`.
    pub fn load_all(&self) -> Result<LoadedSignatures, StoreError> {
        if !self.dir.is_dir() {
            return Err(StoreError::MissingDirectory(self.dir.clone()));
        }

        let mut loaded = LoadedSignatures::default();
        for prompt_type in PromptType::known() {
            if !self.artifact_path(prompt_type).is_file() {
                loaded.missing.push(prompt_type);
                continue;
            }
            match self.load(prompt_type) {
                Ok(signature) if signature.is_matchable() => {
                    loaded.signatures.insert(signature);
                }
                Ok(_) => {
                    warn!(prompt_type = %prompt_type, "Signature has no markers or variants");
                    loaded.missing.push(prompt_type);
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unusable signature artifact");
                    loaded.failures.push(e);
                }
            }
        }

        info!(
            loaded = loaded.signatures.len(),
            missing = loaded.missing.len(),
            failed = loaded.failures.len(),
            "Loaded signatures"
        );
        Ok(loaded)
    }
}

fn remove_if_present(path: &Path) -> Result<bool, StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}
