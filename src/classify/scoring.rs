//! Pure matching functions over (request text, signature)

use crate::prompt::PromptType;
use crate::signature::{char_prefix, normalize, PromptTypeSignature};
use std::cmp::Ordering;

/// Characters of the request compared in fuzzy matching
pub const FUZZY_PREFIX_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchScore {
    pub prompt_type: PromptType,
    pub matched: usize,
    pub required: usize,
    pub score: f64,
    pub via_variant: bool,
}

/// Normalized request text, cut to `prefix_window` characters.
pub fn prepare_window(text: &str, prefix_window: Option<usize>) -> String {
    let normalized = normalize(text);
    match prefix_window {
        Some(limit) => char_prefix(&normalized, limit).to_string(),
        None => normalized,
    }
}

/// Fraction of the signature's markers present in `window`.
///
/// A variant phrase present in the window is a full match.
pub fn score_signature(window: &str, signature: &PromptTypeSignature) -> MatchScore {
    let required = signature.markers.len();

    if signature
        .variants
        .iter()
        .any(|variant| window.contains(variant.as_str()))
    {
        return MatchScore {
            prompt_type: signature.prompt_type,
            matched: required,
            required,
            score: 1.0,
            via_variant: true,
        };
    }

    let matched = signature
        .markers
        .iter()
        .filter(|marker| window.contains(marker.as_str()))
        .count();
    let score = if required == 0 {
        0.0
    } else {
        matched as f64 / required as f64
    };

    MatchScore {
        prompt_type: signature.prompt_type,
        matched,
        required,
        score,
        via_variant: false,
    }
}

/// Orders candidates best first: higher score, then more required
/// markers, then prompt type declaration order.
pub fn rank(a: &MatchScore, b: &MatchScore) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.required.cmp(&a.required))
        .then_with(|| a.prompt_type.cmp(&b.prompt_type))
}

/// Whether two candidates survive every tie-break but declaration order.
pub fn is_tie(a: &MatchScore, b: &MatchScore) -> bool {
    a.score == b.score && a.required == b.required
}

/// Edit-distance similarity between the head of the window and the
/// signature's simplified text, in `[0, 1]`.
pub fn fuzzy_similarity(window: &str, signature: &PromptTypeSignature) -> f64 {
    let reference = normalize(&signature.simplified_signature);
    if reference.is_empty() || window.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(
        char_prefix(window, FUZZY_PREFIX_LEN),
        char_prefix(&reference, FUZZY_PREFIX_LEN),
    )
}
