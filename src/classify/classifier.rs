use super::scoring::{fuzzy_similarity, is_tie, prepare_window, rank, score_signature};
use crate::logstream::LogRecord;
use crate::prompt::PromptType;
use crate::signature::SignatureSet;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;
const DEFAULT_PREFIX_WINDOW: usize = 2000;
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyConfig {
    pub threshold: f64,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    /// Minimum marker score for a signature to be selected
    pub min_confidence: f64,

    /// Characters of normalized request text considered; `None` for all
    pub prefix_window: Option<usize>,

    /// Edit-distance fallback, used only when no signature reaches
    /// `min_confidence`
    pub fuzzy: Option<FuzzyConfig>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            prefix_window: Some(DEFAULT_PREFIX_WINDOW),
            fuzzy: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Markers,
    Variant,
    Fuzzy,
    None,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchMethod::Markers => "markers",
            MatchMethod::Variant => "variant",
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::None => "none",
        };
        f.write_str(name)
    }
}

/// Equal best candidates resolved by declaration order
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("ambiguous match: chose {chosen}, tied with {tied_with:?} at score {score:.2}")]
pub struct AmbiguousMatch {
    pub chosen: PromptType,
    pub tied_with: Vec<PromptType>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub prompt_type: PromptType,
    pub score: f64,
    pub method: MatchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambiguity: Option<AmbiguousMatch>,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            prompt_type: PromptType::Unknown,
            score: 0.0,
            method: MatchMethod::None,
            ambiguity: None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.ambiguity.is_some()
    }
}

/// A request record with its assigned prompt type
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRequest {
    pub record: LogRecord,
    pub prompt_type: PromptType,
    pub score: f64,
    pub ambiguous: bool,
}

impl ClassifiedRequest {
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

/// Assigns one prompt type to each request text
pub struct RequestClassifier {
    signatures: SignatureSet,
    config: ClassifierConfig,
}

impl RequestClassifier {
    pub fn new(signatures: SignatureSet, config: ClassifierConfig) -> Self {
        Self { signatures, config }
    }

    pub fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Best-matching prompt type for `text`, or `Unknown`.
    ///
    /// Deterministic for a given text, signature set and config.
    pub fn classify(&self, text: &str) -> Classification {
        let window = prepare_window(text, self.config.prefix_window);

        let mut candidates: Vec<_> = self
            .signatures
            .iter()
            .map(|signature| score_signature(&window, signature))
            .filter(|s| s.score > 0.0 && s.score >= self.config.min_confidence)
            .collect();

        if !candidates.is_empty() {
            candidates.sort_by(rank);
            let best = &candidates[0];
            let tied_with: Vec<PromptType> = candidates[1..]
                .iter()
                .take_while(|other| is_tie(best, other))
                .map(|other| other.prompt_type)
                .collect();

            let ambiguity = if tied_with.is_empty() {
                None
            } else {
                let ambiguity = AmbiguousMatch {
                    chosen: best.prompt_type,
                    tied_with,
                    score: best.score,
                };
                warn!(%ambiguity, "Resolved tie by declaration order");
                Some(ambiguity)
            };

            return Classification {
                prompt_type: best.prompt_type,
                score: best.score,
                method: if best.via_variant {
                    MatchMethod::Variant
                } else {
                    MatchMethod::Markers
                },
                ambiguity,
            };
        }

        if let Some(fuzzy) = self.config.fuzzy {
            if let Some(classification) = self.classify_fuzzy(&window, fuzzy) {
                return classification;
            }
        }

        Classification::unknown()
    }

    fn classify_fuzzy(&self, window: &str, fuzzy: FuzzyConfig) -> Option<Classification> {
        let mut best: Option<(PromptType, f64)> = None;
        for signature in self.signatures.iter() {
            let similarity = fuzzy_similarity(window, signature);
            if similarity >= fuzzy.threshold && best.map_or(true, |(_, s)| similarity > s) {
                best = Some((signature.prompt_type, similarity));
            }
        }

        best.map(|(prompt_type, score)| {
            debug!(prompt_type = %prompt_type, score, "Fuzzy match");
            Classification {
                prompt_type,
                score,
                method: MatchMethod::Fuzzy,
                ambiguity: None,
            }
        })
    }

    pub fn classify_record(&self, record: LogRecord) -> ClassifiedRequest {
        let classification = self.classify(&record.payload);
        debug!(
            id = %record.id,
            prompt_type = %classification.prompt_type,
            score = classification.score,
            "Classified request"
        );
        ClassifiedRequest {
            prompt_type: classification.prompt_type,
            score: classification.score,
            ambiguous: classification.is_ambiguous(),
            record,
        }
    }
}
