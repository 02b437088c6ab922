//! Prompt-type signatures: derivation, persistence and the loaded set
//!
//! A signature is the compact fingerprint of one prompt type: the literal
//! instruction fragments ("markers") that every rendered request of that type
//! repeats verbatim, regardless of the game state substituted around them.
//!
//! - [`builder`]: derives signatures from sample prompt templates
//! - [`samples`]: discovers sample templates on disk
//! - [`store`]: reads and writes one JSON artifact per prompt type

pub mod builder;
pub mod samples;
pub mod store;

pub use builder::{
    BuildError, BuildReport, BuildSummary, BuilderConfig, BuiltSignature, SignatureBuilder,
};
pub use samples::{collect_samples, Sample, SampleError, SampleSet};
pub use store::{LoadedSignatures, SavedBuild, SignatureStore, StoreError};

use crate::prompt::PromptType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Matching fingerprint for one prompt type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTypeSignature {
    pub prompt_type: PromptType,

    /// Lowercase literal fragments that must all appear in a matching request
    pub markers: Vec<String>,

    /// Alternative phrases; any one of them present is a full match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,

    /// Leading instruction sentences as written in the template
    #[serde(default)]
    pub original_signature: String,

    /// `original_signature` with template variables reduced to `[VAR]`
    #[serde(default)]
    pub simplified_signature: String,

    #[serde(default)]
    pub sample_count: usize,
}

impl PromptTypeSignature {
    pub fn new(prompt_type: PromptType, markers: Vec<String>) -> Self {
        let simplified_signature = markers.join(" [VAR] ");
        Self {
            prompt_type,
            markers: markers.iter().map(|m| normalize(m)).collect(),
            variants: Vec::new(),
            original_signature: simplified_signature.clone(),
            simplified_signature,
            sample_count: 0,
        }
    }

    /// A signature recognized only through variant phrases.
    pub fn from_variants(prompt_type: PromptType, variants: Vec<String>) -> Self {
        Self {
            prompt_type,
            markers: Vec::new(),
            variants: variants.iter().map(|v| normalize(v)).collect(),
            original_signature: String::new(),
            simplified_signature: String::new(),
            sample_count: 0,
        }
    }

    pub fn with_variants(mut self, variants: Vec<String>) -> Self {
        self.add_variants(variants);
        self
    }

    pub fn add_variants(&mut self, variants: Vec<String>) {
        for variant in variants {
            let variant = normalize(&variant);
            if !variant.is_empty() && !self.variants.contains(&variant) {
                self.variants.push(variant);
            }
        }
    }

    /// Number of required markers; higher means more specific.
    pub fn specificity(&self) -> usize {
        self.markers.len()
    }

    pub fn is_matchable(&self) -> bool {
        !self.markers.is_empty() || !self.variants.is_empty()
    }
}

/// Signatures keyed by prompt type, iterated in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureSet {
    signatures: BTreeMap<PromptType, PromptTypeSignature>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the signature for its prompt type.
    ///
    /// `Unknown` is the fallback classification and never carries a
    /// signature; such entries are dropped.
    pub fn insert(&mut self, signature: PromptTypeSignature) -> Option<PromptTypeSignature> {
        if signature.prompt_type.is_unknown() {
            warn!("Ignoring signature declared for the unknown bucket");
            return None;
        }
        self.signatures.insert(signature.prompt_type, signature)
    }

    pub fn get(&self, prompt_type: PromptType) -> Option<&PromptTypeSignature> {
        self.signatures.get(&prompt_type)
    }

    pub fn get_mut(&mut self, prompt_type: PromptType) -> Option<&mut PromptTypeSignature> {
        self.signatures.get_mut(&prompt_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PromptTypeSignature> {
        self.signatures.values()
    }

    pub fn types(&self) -> impl Iterator<Item = PromptType> + '_ {
        self.signatures.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl FromIterator<PromptTypeSignature> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = PromptTypeSignature>>(iter: I) -> Self {
        let mut set = SignatureSet::new();
        for signature in iter {
            set.insert(signature);
        }
        set
    }
}

/// Lowercases and collapses every whitespace run to a single space.
///
/// Both marker extraction and request matching go through this, so line
/// wrapping and indentation differences never affect a match.
pub fn normalize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.extend(word.chars().flat_map(char::to_lowercase));
    }
    normalized
}

/// Collapses whitespace runs without changing case.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The first `max_chars` characters of `text`, never splitting a code point.
pub(crate) fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(
            normalize("  You are\n an AI\tMood   Analyzer "),
            "you are an ai mood analyzer"
        );
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_char_prefix_respects_code_points() {
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("abc", 10), "abc");
        assert_eq!(char_prefix("", 3), "");
    }

    #[test]
    fn test_signature_new_normalizes_markers() {
        let sig = PromptTypeSignature::new(
            PromptType::EvaluateMood,
            vec!["You are an AI mood analyzer".to_string()],
        );
        assert_eq!(sig.markers, vec!["you are an ai mood analyzer"]);
        assert_eq!(sig.specificity(), 1);
        assert!(sig.is_matchable());
    }

    #[test]
    fn test_add_variants_deduplicates() {
        let mut sig = PromptTypeSignature::new(PromptType::NativeActionSelector, vec![]);
        assert!(!sig.is_matchable());

        sig.add_variants(vec![
            "You are an expect at determining".to_string(),
            "you are an EXPECT at determining".to_string(),
            "   ".to_string(),
        ]);
        assert_eq!(sig.variants, vec!["you are an expect at determining"]);
        assert!(sig.is_matchable());
    }

    #[test]
    fn test_set_iterates_in_declaration_order() {
        let set: SignatureSet = vec![
            PromptTypeSignature::new(PromptType::PlayerThoughts, vec!["a".into()]),
            PromptTypeSignature::new(PromptType::CharacterProfileUpdate, vec!["b".into()]),
            PromptTypeSignature::new(PromptType::EvaluateMood, vec!["c".into()]),
        ]
        .into_iter()
        .collect();

        let order: Vec<_> = set.types().collect();
        assert_eq!(
            order,
            vec![
                PromptType::CharacterProfileUpdate,
                PromptType::EvaluateMood,
                PromptType::PlayerThoughts
            ]
        );
    }

    #[test]
    fn test_set_rejects_unknown_signature() {
        let mut set = SignatureSet::new();
        set.insert(PromptTypeSignature::new(PromptType::Unknown, vec!["x".into()]));
        assert!(set.is_empty());
    }

    #[test]
    fn test_signature_json_shape() {
        let sig = PromptTypeSignature::new(
            PromptType::GenerateSearchQuery,
            vec!["you are a memory search query generator".to_string()],
        );
        let json = serde_json::to_value(&sig).unwrap();
        assert_eq!(json["prompt_type"], "generate_search_query");
        assert!(json.get("variants").is_none());

        let parsed: PromptTypeSignature = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, sig);
    }
}
