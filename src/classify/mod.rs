//! Request classification against learned signatures

pub mod classifier;
pub mod scoring;
pub mod variants;

pub use classifier::{
    AmbiguousMatch, Classification, ClassifiedRequest, ClassifierConfig, FuzzyConfig,
    MatchMethod, RequestClassifier,
};
pub use scoring::MatchScore;
pub use variants::{VariantsError, VariantsFile};
