use crate::prompt::PromptType;
use ignore::{DirEntry, WalkBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const SAMPLE_EXTENSION: &str = "prompt";
const IGNORED_FOLDERS: &[&str] = &["web", "submodules", "documentation"];

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("prompts directory not found: {0}")]
    MissingDirectory(PathBuf),
}

/// One sample prompt template labeled with its type
#[derive(Debug, Clone)]
pub struct Sample {
    pub prompt_type: PromptType,
    pub source: PathBuf,
    pub text: String,
}

impl Sample {
    pub fn new(
        prompt_type: PromptType,
        source: impl Into<PathBuf>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            prompt_type,
            source: source.into(),
            text: text.into(),
        }
    }
}

/// Samples grouped by prompt type
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    by_type: BTreeMap<PromptType, Vec<Sample>>,
}

impl SampleSet {
    pub fn insert(&mut self, sample: Sample) {
        self.by_type.entry(sample.prompt_type).or_default().push(sample);
    }

    pub fn get(&self, prompt_type: PromptType) -> &[Sample] {
        self.by_type
            .get(&prompt_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn types(&self) -> impl Iterator<Item = PromptType> + '_ {
        self.by_type.keys().copied()
    }

    pub fn total(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

fn is_ignored_folder(entry: &DirEntry) -> bool {
    entry.file_type().map_or(false, |ft| ft.is_dir())
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| IGNORED_FOLDERS.contains(&name))
}

/// Recursively collects `*.prompt` templates below `dir`.
///
/// The file stem names the prompt type. Files are visited in path order so
/// the first sample of each type is stable across runs.
pub fn collect_samples(dir: &Path) -> Result<SampleSet, SampleError> {
    if !dir.is_dir() {
        return Err(SampleError::MissingDirectory(dir.to_path_buf()));
    }

    let mut set = SampleSet::default();

    for result in WalkBuilder::new(dir)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| !is_ignored_folder(entry))
        .build()
    {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "Failed to read directory entry");
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(SAMPLE_EXTENSION)
        {
            continue;
        }

        let Some(prompt_type) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(PromptType::from_name)
            .filter(|t| !t.is_unknown())
        else {
            debug!(path = %path.display(), "Skipping template with unrecognized name");
            continue;
        };

        match std::fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                set.insert(Sample::new(prompt_type, path, text));
            }
            Err(err) => warn!(path = %path.display(), error = %err, "Failed to read template"),
        }
    }

    info!(
        samples = set.total(),
        types = set.by_type.len(),
        "Collected prompt samples"
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_samples_groups_by_stem() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("b/evaluate_mood.prompt"), "second").unwrap();
        fs::write(dir.path().join("a/evaluate_mood.prompt"), "first").unwrap();
        fs::write(dir.path().join("memory_builder.prompt"), "memory").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("weather.prompt"), "unrecognized").unwrap();
        fs::write(dir.path().join("unknown.prompt"), "fallback bucket").unwrap();

        let set = collect_samples(dir.path()).unwrap();
        assert_eq!(set.total(), 3);

        let moods: Vec<_> = set
            .get(PromptType::EvaluateMood)
            .iter()
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(moods, vec!["first", "second"]);
        assert_eq!(set.get(PromptType::MemoryBuilder).len(), 1);
        assert!(set.get(PromptType::PlayerThoughts).is_empty());
    }

    #[test]
    fn test_collect_samples_skips_ignored_folders() {
        let dir = TempDir::new().unwrap();
        for folder in ["web", "submodules", "documentation"] {
            fs::create_dir_all(dir.path().join(folder)).unwrap();
            fs::write(dir.path().join(folder).join("evaluate_mood.prompt"), "x").unwrap();
        }

        let set = collect_samples(dir.path()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_collect_samples_missing_directory() {
        let err = collect_samples(Path::new("/nonexistent/prompts")).unwrap_err();
        assert!(matches!(err, SampleError::MissingDirectory(_)));
    }
}
