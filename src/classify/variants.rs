//! Extra match phrases per prompt type
//!
//! Templates drift between game versions; a variants file lets old and new
//! phrasings map to the same type without rebuilding signatures.
//!
//! ```json
//! {
//!   "prompt_type_variants": {
//!     "native_action_selector": {
//!       "description": "Action selection",
//!       "patterns": ["You are an expect at determining"]
//!     }
//!   },
//!   "fuzzy_matching": { "enabled": true, "min_similarity_threshold": 0.7 }
//! }
//! ```

use super::classifier::{ClassifierConfig, FuzzyConfig, DEFAULT_FUZZY_THRESHOLD};
use crate::prompt::PromptType;
use crate::signature::{PromptTypeSignature, SignatureSet};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum VariantsError {
    #[error("failed to read variants file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse variants file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariantsFile {
    #[serde(default)]
    pub prompt_type_variants: BTreeMap<String, VariantPatterns>,

    #[serde(default)]
    pub fuzzy_matching: Option<FuzzyMatching>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariantPatterns {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FuzzyMatching {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_threshold")]
    pub min_similarity_threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_FUZZY_THRESHOLD
}

impl VariantsFile {
    pub fn load(path: &Path) -> Result<Self, VariantsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| VariantsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| VariantsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Adds the patterns to `signatures` and enables fuzzy matching when
    /// the file asks for it. Returns the number of types that gained
    /// patterns.
    ///
    /// A type with patterns but no built signature becomes matchable through
    /// its patterns alone. Entries naming no known type are skipped.
    pub fn apply(&self, signatures: &mut SignatureSet, config: &mut ClassifierConfig) -> usize {
        let mut applied = 0;

        for (name, entry) in &self.prompt_type_variants {
            let prompt_type = match PromptType::from_name(name) {
                Some(t) if !t.is_unknown() => t,
                _ => {
                    warn!(prompt_type = %name, "Variants entry does not name a known prompt type");
                    continue;
                }
            };
            if entry.patterns.is_empty() {
                continue;
            }

            match signatures.get_mut(prompt_type) {
                Some(signature) => signature.add_variants(entry.patterns.clone()),
                None => {
                    signatures.insert(PromptTypeSignature::from_variants(
                        prompt_type,
                        entry.patterns.clone(),
                    ));
                }
            }
            applied += 1;
        }

        if let Some(fuzzy) = &self.fuzzy_matching {
            if fuzzy.enabled {
                config.fuzzy = Some(FuzzyConfig {
                    threshold: fuzzy.min_similarity_threshold,
                });
            }
        }

        debug!(types = applied, fuzzy = config.fuzzy.is_some(), "Applied variants");
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARIANTS: &str = r#"{
        "prompt_type_variants": {
            "native_action_selector": {
                "description": "Action selection",
                "patterns": ["You are an expect at determining", "Select the best action"]
            },
            "evaluate_mood": {"patterns": ["Rate the mood of"]},
            "weather_report": {"patterns": ["ignored"]},
            "memory_builder": {"patterns": []}
        },
        "fuzzy_matching": {"enabled": true, "min_similarity_threshold": 0.8}
    }"#;

    #[test]
    fn test_apply_extends_and_creates_signatures() {
        let file: VariantsFile = serde_json::from_str(VARIANTS).unwrap();
        let mut signatures: SignatureSet = vec![PromptTypeSignature::new(
            PromptType::EvaluateMood,
            vec!["you are an ai mood analyzer".to_string()],
        )]
        .into_iter()
        .collect();
        let mut config = ClassifierConfig::default();

        let applied = file.apply(&mut signatures, &mut config);
        assert_eq!(applied, 2);

        let mood = signatures.get(PromptType::EvaluateMood).unwrap();
        assert_eq!(mood.markers, vec!["you are an ai mood analyzer"]);
        assert_eq!(mood.variants, vec!["rate the mood of"]);

        let action = signatures.get(PromptType::NativeActionSelector).unwrap();
        assert!(action.markers.is_empty());
        assert_eq!(action.variants.len(), 2);

        assert!(signatures.get(PromptType::MemoryBuilder).is_none());
        assert_eq!(config.fuzzy, Some(FuzzyConfig { threshold: 0.8 }));
    }

    #[test]
    fn test_fuzzy_disabled_leaves_config() {
        let file: VariantsFile =
            serde_json::from_str(r#"{"fuzzy_matching": {"enabled": false}}"#).unwrap();
        let mut config = ClassifierConfig::default();
        file.apply(&mut SignatureSet::new(), &mut config);
        assert!(config.fuzzy.is_none());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("variants.json");
        assert!(matches!(
            VariantsFile::load(&path),
            Err(VariantsError::Read { .. })
        ));

        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            VariantsFile::load(&path),
            Err(VariantsError::Parse { .. })
        ));
    }
}
