//! Claim support matching.
//!
//! The validator only ever asks one question: does this chunk support this
//! claim? Any matcher must answer deterministically, and raising a matcher's
//! strictness may only remove support, never add it.

use crate::core::KnowledgeChunk;
use crate::grounding::claims::Claim;
use crate::grounding::tokens::token_set;

/// Decides whether a chunk supports a claim.
pub trait SupportMatcher: Send + Sync {
    /// Whether `chunk` supports `claim`.
    fn supports(&self, claim: &Claim, chunk: &KnowledgeChunk) -> bool;

    /// Matcher name for logging.
    fn name(&self) -> &'static str;
}

/// Lexical-overlap matcher.
///
/// A chunk supports a claim when it contains at least `threshold` of the
/// claim's distinct content words.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalOverlapMatcher {
    threshold: f64,
}

impl LexicalOverlapMatcher {
    /// Create a matcher. The threshold is clamped into (0.0, 1.0].
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_finite() {
            threshold.clamp(f64::MIN_POSITIVE, 1.0)
        } else {
            1.0
        };
        Self { threshold }
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Fraction of the claim's distinct content words found in the chunk.
    pub fn overlap(claim: &str, chunk: &str) -> f64 {
        let claim_tokens = token_set(claim);
        if claim_tokens.is_empty() {
            return 0.0;
        }
        let chunk_tokens = token_set(chunk);
        let shared = claim_tokens.intersection(&chunk_tokens).count();
        shared as f64 / claim_tokens.len() as f64
    }
}

impl SupportMatcher for LexicalOverlapMatcher {
    fn supports(&self, claim: &Claim, chunk: &KnowledgeChunk) -> bool {
        Self::overlap(&claim.text, &chunk.text) >= self.threshold
    }

    fn name(&self) -> &'static str {
        "lexical_overlap"
    }
}
