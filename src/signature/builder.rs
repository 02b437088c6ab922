//! Signature derivation from sample prompt templates
//!
//! Each sample is a prompt template: instruction text interleaved with
//! `{{ variable }}` substitutions and `{% control %}` tags. The builder takes
//! the leading sentences of the instruction block, reduces the template
//! syntax to `[VAR]` gaps, and keeps the literal fragments between the gaps as
//! markers. With several samples of one type, only the markers that recur in
//! every sample survive.

use super::samples::{Sample, SampleSet};
use super::{char_prefix, collapse_whitespace, normalize, PromptTypeSignature, SignatureSet};
use crate::prompt::PromptType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const DEFAULT_MAX_SENTENCES: usize = 4;
const DEFAULT_SIGNATURE_TARGET_LEN: usize = 150;
const DEFAULT_MAX_RAW_LENGTH: usize = 200;
const DEFAULT_MIN_MARKER_LEN: usize = 12;
const MIN_SIMPLIFIED_LEN: usize = 20;
const FALLBACK_SIGNATURE_LEN: usize = 100;

/// Phrases that make a sentence unique among the roleplay prompts, which
/// otherwise share their opening lines.
const DISTINGUISHING_PHRASES: &[&str] = &[
    "thinking to yourself",
    "reacting verbally",
    "speak as they would",
    "reacting internally",
    "speaking to",
    "in character and speak",
    "thoughts about",
    "verbal response",
    "internal thoughts",
    "remain completely in character",
    "verbally to a",
    "just occurred",
    "about the current situation",
];

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no samples found for prompt type {0}")]
    NoSamples(PromptType),

    #[error("none of the {samples} sample(s) for {prompt_type} has usable instruction text")]
    NoUsableSamples {
        prompt_type: PromptType,
        samples: usize,
    },

    #[error("no markers could be extracted for prompt type {0}")]
    NoMarkers(PromptType),

    #[error("no marker of {prompt_type} recurs across all {samples} samples")]
    NoRecurringMarkers {
        prompt_type: PromptType,
        samples: usize,
    },

    #[error("failed to read exceptions file {path}: {source}")]
    ExceptionsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse exceptions file {path}: {source}")]
    ExceptionsParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl BuildError {
    pub fn prompt_type(&self) -> Option<PromptType> {
        match self {
            BuildError::NoSamples(prompt_type) | BuildError::NoMarkers(prompt_type) => {
                Some(*prompt_type)
            }
            BuildError::NoUsableSamples { prompt_type, .. }
            | BuildError::NoRecurringMarkers { prompt_type, .. } => Some(*prompt_type),
            BuildError::ExceptionsRead { .. } | BuildError::ExceptionsParse { .. } => None,
        }
    }
}

/// Tuning for signature derivation
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Maximum number of leading sentences in a signature
    pub max_sentences: usize,

    /// Stop adding sentences once the signature reaches this many characters
    pub signature_target_len: usize,

    /// Truncation length for templates without a system block
    pub max_raw_length: usize,

    /// Shortest fragment (in characters) kept as a marker
    pub min_marker_len: usize,

    /// Types whose templates have no `[ system ]` block
    pub exception_types: BTreeSet<PromptType>,

    pub distinguishing_phrases: Vec<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_sentences: DEFAULT_MAX_SENTENCES,
            signature_target_len: DEFAULT_SIGNATURE_TARGET_LEN,
            max_raw_length: DEFAULT_MAX_RAW_LENGTH,
            min_marker_len: DEFAULT_MIN_MARKER_LEN,
            exception_types: BTreeSet::new(),
            distinguishing_phrases: DISTINGUISHING_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ExceptionsFile {
    #[serde(default)]
    exception_files: ExceptionFiles,
    #[serde(default)]
    configuration: ExceptionConfiguration,
}

#[derive(Debug, Default, Deserialize)]
struct ExceptionFiles {
    #[serde(default)]
    files: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExceptionConfiguration {
    max_signature_length: Option<usize>,
}

impl BuilderConfig {
    /// Applies an exceptions file listing templates without a system block.
    ///
    /// Format: `{"exception_files": {"files": ["x.prompt"]},
    /// "configuration": {"max_signature_length": 200}}`.
    pub fn with_exceptions_file(mut self, path: &Path) -> Result<Self, BuildError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| BuildError::ExceptionsRead {
                path: path.to_path_buf(),
                source,
            })?;
        let parsed: ExceptionsFile =
            serde_json::from_str(&contents).map_err(|source| BuildError::ExceptionsParse {
                path: path.to_path_buf(),
                source,
            })?;

        for file in &parsed.exception_files.files {
            let stem = Path::new(file)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(file.as_str());
            match PromptType::from_name(stem) {
                Some(prompt_type) if !prompt_type.is_unknown() => {
                    self.exception_types.insert(prompt_type);
                }
                _ => warn!(file = %file, "Exception entry does not name a known prompt type"),
            }
        }

        if let Some(max) = parsed.configuration.max_signature_length {
            self.max_raw_length = max;
        }

        debug!(
            exceptions = self.exception_types.len(),
            max_raw_length = self.max_raw_length,
            "Loaded exceptions file"
        );
        Ok(self)
    }
}

/// A derived signature together with the sample it was taken from
#[derive(Debug, Clone)]
pub struct BuiltSignature {
    pub signature: PromptTypeSignature,
    pub example: String,
}

/// Outcome of building every known prompt type
#[derive(Debug, Default)]
pub struct BuildReport {
    pub built: Vec<BuiltSignature>,
    pub failures: Vec<BuildError>,
}

impl BuildReport {
    pub fn signatures(&self) -> SignatureSet {
        self.built.iter().map(|b| b.signature.clone()).collect()
    }

    pub fn summary(&self) -> BuildSummary {
        BuildSummary {
            built: self
                .built
                .iter()
                .map(|b| BuiltEntry {
                    prompt_type: b.signature.prompt_type,
                    markers: b.signature.markers.len(),
                    samples: b.signature.sample_count,
                })
                .collect(),
            failed: self
                .failures
                .iter()
                .map(|e| FailedEntry {
                    prompt_type: e.prompt_type(),
                    reason: e.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub built: Vec<BuiltEntry>,
    pub failed: Vec<FailedEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuiltEntry {
    pub prompt_type: PromptType,
    pub markers: usize,
    pub samples: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedEntry {
    pub prompt_type: Option<PromptType>,
    pub reason: String,
}

pub struct SignatureBuilder {
    config: BuilderConfig,
    system_block: Regex,
    template_var: Regex,
    control_tag: Regex,
    sentence_end: Regex,
    marker_boundary: Regex,
    adjacent_vars: Regex,
    leading_markup: Vec<Regex>,
}

impl Default for SignatureBuilder {
    fn default() -> Self {
        Self::new(BuilderConfig::default())
    }
}

impl SignatureBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            config,
            system_block: Regex::new(r"(?is)\[\s*system\s*\](.*?)\[\s*end\s+system\s*\]")
                .expect("valid regex"),
            template_var: Regex::new(r"\{\{[^}]*\}\}").expect("valid regex"),
            control_tag: Regex::new(r"\{%[^%]*%\}").expect("valid regex"),
            sentence_end: Regex::new(r"[.!?]+\s+").expect("valid regex"),
            marker_boundary: Regex::new(r"[.!?]+(?:\s+|$)").expect("valid regex"),
            adjacent_vars: Regex::new(r"\[VAR\](?:\s*,\s*|\s+)\[VAR\]").expect("valid regex"),
            leading_markup: vec![
                Regex::new(r"^```[a-zA-Z]*\s*").expect("valid regex"),
                Regex::new(r"^---\s*").expect("valid regex"),
                Regex::new(r"^#[^\n]*\n").expect("valid regex"),
            ],
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Builds a signature for every known prompt type present in `samples`.
    ///
    /// Types without samples are reported as failures; the remaining types
    /// are unaffected.
    pub fn build_all(&self, samples: &SampleSet) -> BuildReport {
        let mut report = BuildReport::default();

        for prompt_type in PromptType::known() {
            match self.build(prompt_type, samples.get(prompt_type)) {
                Ok(built) => {
                    debug!(
                        prompt_type = %prompt_type,
                        markers = built.signature.markers.len(),
                        "Built signature"
                    );
                    report.built.push(built);
                }
                Err(e) => {
                    warn!(prompt_type = %prompt_type, error = %e, "Prompt type left unmatched");
                    report.failures.push(e);
                }
            }
        }

        info!(
            built = report.built.len(),
            failed = report.failures.len(),
            "Signature build complete"
        );
        report
    }

    /// Derives the signature of one prompt type from its samples.
    pub fn build(
        &self,
        prompt_type: PromptType,
        samples: &[Sample],
    ) -> Result<BuiltSignature, BuildError> {
        if samples.is_empty() {
            return Err(BuildError::NoSamples(prompt_type));
        }

        let usable: Vec<(&Sample, String)> = samples
            .iter()
            .filter_map(|sample| match self.extract_instructions(prompt_type, &sample.text) {
                Some(instructions) => Some((sample, instructions)),
                None => {
                    warn!(
                        prompt_type = %prompt_type,
                        source = %sample.source.display(),
                        "Sample has no instruction block"
                    );
                    None
                }
            })
            .collect();

        let Some((first, first_instructions)) = usable.first() else {
            return Err(BuildError::NoUsableSamples {
                prompt_type,
                samples: samples.len(),
            });
        };

        let original_signature = if self.config.exception_types.contains(&prompt_type) {
            first_instructions.clone()
        } else {
            self.original_signature(first_instructions)
        };
        let simplified_signature = self.simplify(&original_signature);

        let candidates = self.markers(&simplified_signature);
        if candidates.is_empty() {
            return Err(BuildError::NoMarkers(prompt_type));
        }

        let other_texts: Vec<String> = usable[1..]
            .iter()
            .map(|(_, instructions)| self.literal_text(instructions))
            .collect();
        let markers: Vec<String> = candidates
            .into_iter()
            .filter(|marker| other_texts.iter().all(|text| text.contains(marker.as_str())))
            .collect();

        if markers.is_empty() {
            return Err(BuildError::NoRecurringMarkers {
                prompt_type,
                samples: usable.len(),
            });
        }

        Ok(BuiltSignature {
            signature: PromptTypeSignature {
                prompt_type,
                markers,
                variants: Vec::new(),
                original_signature,
                simplified_signature,
                sample_count: usable.len(),
            },
            example: first.text.clone(),
        })
    }

    /// Returns the instruction region a signature is derived from.
    ///
    /// Normally the `[ system ] ... [ end system ]` block; exception types
    /// use their leading raw content instead.
    pub fn extract_instructions(&self, prompt_type: PromptType, text: &str) -> Option<String> {
        let instructions = if self.config.exception_types.contains(&prompt_type) {
            self.extract_raw_content(text)
        } else {
            self.extract_system_block(text)?
        };

        if instructions.trim().is_empty() {
            None
        } else {
            Some(instructions)
        }
    }

    pub fn extract_system_block(&self, text: &str) -> Option<String> {
        self.system_block
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    /// Leading content of a template without a system block, cut at a
    /// sentence (or failing that, word) boundary near `max_raw_length`.
    pub fn extract_raw_content(&self, text: &str) -> String {
        let mut stripped = text.trim_start().to_string();
        for pattern in &self.leading_markup {
            stripped = pattern.replace(&stripped, "").into_owned();
        }

        let cleaned = collapse_whitespace(&stripped);
        let max = self.config.max_raw_length;
        if cleaned.chars().count() <= max {
            return cleaned;
        }

        let truncated = char_prefix(&cleaned, max);
        if let Some(idx) = truncated.rfind(['.', '!', '?']) {
            if truncated[..idx].chars().count() > max / 2 {
                return truncated[..=idx].trim().to_string();
            }
        }
        if let Some(idx) = truncated.rfind(' ') {
            if truncated[..idx].chars().count() > max * 7 / 10 {
                return format!("{}...", truncated[..idx].trim());
            }
        }
        format!("{}...", truncated)
    }

    /// Leading instruction sentences, enough to tell this type apart.
    pub fn original_signature(&self, instructions: &str) -> String {
        let cleaned = collapse_whitespace(instructions);
        let sentences = self.split_sentences(&cleaned);

        let mut parts: Vec<&str> = Vec::new();
        for sentence in sentences.iter().take(self.config.max_sentences) {
            parts.push(sentence);

            let lower = sentence.to_lowercase();
            if self
                .config
                .distinguishing_phrases
                .iter()
                .any(|phrase| lower.contains(phrase.as_str()))
            {
                break;
            }
            if parts.join(". ").chars().count() >= self.config.signature_target_len {
                break;
            }
        }

        if parts.is_empty() {
            return if cleaned.chars().count() > FALLBACK_SIGNATURE_LEN {
                format!("{}...", char_prefix(&cleaned, FALLBACK_SIGNATURE_LEN))
            } else {
                cleaned
            };
        }

        let mut signature = parts.join(". ");
        if !signature.ends_with(['.', '!', '?']) {
            signature.push('.');
        }
        signature
    }

    /// Reduces template syntax to `[VAR]` placeholders.
    pub fn simplify(&self, signature: &str) -> String {
        let replaced = self.template_var.replace_all(signature, "[VAR]");
        let without_tags = self.control_tag.replace_all(&replaced, "");
        let merged = self.adjacent_vars.replace_all(&without_tags, "[VAR]");
        let collapsed = collapse_whitespace(&merged);
        let simplified = collapsed.trim_end_matches('.').to_string();

        if simplified.chars().count() < MIN_SIMPLIFIED_LEN {
            collapse_whitespace(signature)
                .trim_end_matches('.')
                .to_string()
        } else {
            simplified
        }
    }

    /// Literal fragments of a (simplified) signature, in order, deduplicated.
    pub fn markers(&self, signature: &str) -> Vec<String> {
        let literal = self.literal_form(signature);
        let mut markers: Vec<String> = Vec::new();

        for sentence in self.marker_boundary.split(&literal) {
            for fragment in sentence.split("[VAR]") {
                let normalized = normalize(fragment);
                let trimmed = normalized
                    .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':'));
                if trimmed.chars().count() >= self.config.min_marker_len
                    && !markers.iter().any(|m| m == trimmed)
                {
                    markers.push(trimmed.to_string());
                }
            }
        }

        markers
    }

    /// Normalized text with template syntax reduced, used for recurrence
    /// checks against other samples.
    fn literal_text(&self, text: &str) -> String {
        normalize(&self.literal_form(text))
    }

    fn literal_form(&self, text: &str) -> String {
        let replaced = self.template_var.replace_all(text, "[VAR]");
        self.control_tag.replace_all(&replaced, "").into_owned()
    }

    /// Splits on sentence terminators, ignoring any inside `{{ ... }}`.
    fn split_sentences(&self, text: &str) -> Vec<String> {
        // Mask template variables with same-length filler so byte offsets
        // found in the mask are valid in the original text.
        let mut masked = text.to_string();
        for m in self.template_var.find_iter(text) {
            masked.replace_range(m.range(), &"x".repeat(m.len()));
        }

        let mut sentences = Vec::new();
        let mut start = 0;
        for m in self.sentence_end.find_iter(&masked) {
            let sentence = text[start..m.start()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = m.end();
        }
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
        sentences
    }
}
