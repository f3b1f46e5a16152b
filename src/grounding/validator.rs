//! Source grounding validation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GroundingConfig;
use crate::core::{DraftAnswer, KnowledgeChunk};
use crate::error::Result;
use crate::grounding::claims::{extract_claims, Claim};
use crate::grounding::matcher::{LexicalOverlapMatcher, SupportMatcher};

/// Verdict for one extracted claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimVerdict {
    /// The claim, with its supporting chunk filled in when found.
    pub claim: Claim,
    /// Whether any chunk supports the claim.
    pub grounded: bool,
    /// Whether the supporting chunk is one the draft says it used.
    pub cited: bool,
}

/// Outcome of grounding a draft against its chunks.
///
/// `grounding_score` is grounded claims over total claims, and 1.0 when the
/// draft has no claims at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingResult {
    /// No claim is ungrounded.
    pub fully_grounded: bool,
    /// Some but not all claims are grounded.
    pub partially_grounded: bool,
    /// Grounded claims / total claims, in [0, 1].
    pub grounding_score: f64,
    /// Claims no chunk supports, in draft order.
    pub ungrounded_claims: Vec<Claim>,
    /// Per-claim verdicts, in draft order.
    pub per_claim_results: Vec<ClaimVerdict>,
}

impl GroundingResult {
    /// Build a result from per-claim verdicts.
    pub fn from_verdicts(verdicts: Vec<ClaimVerdict>) -> Self {
        let total = verdicts.len();
        let grounded = verdicts.iter().filter(|v| v.grounded).count();
        let ungrounded_claims: Vec<Claim> = verdicts
            .iter()
            .filter(|v| !v.grounded)
            .map(|v| v.claim.clone())
            .collect();

        let grounding_score = if total == 0 {
            1.0
        } else {
            grounded as f64 / total as f64
        };
        let fully_grounded = ungrounded_claims.is_empty();

        Self {
            fully_grounded,
            partially_grounded: grounding_score > 0.0 && !fully_grounded,
            grounding_score,
            ungrounded_claims,
            per_claim_results: verdicts,
        }
    }

    /// Number of claims checked.
    pub fn total_claims(&self) -> usize {
        self.per_claim_results.len()
    }
}

/// Checks that every factual claim in a draft is supported by a chunk.
#[derive(Debug, Clone)]
pub struct SourceGroundingValidator<M: SupportMatcher = LexicalOverlapMatcher> {
    matcher: M,
    min_claim_tokens: usize,
}

impl SourceGroundingValidator<LexicalOverlapMatcher> {
    /// Create a validator using lexical overlap at the configured threshold.
    pub fn new(config: &GroundingConfig) -> Self {
        Self::with_matcher(LexicalOverlapMatcher::new(config.overlap_threshold), config)
    }
}

impl<M: SupportMatcher> SourceGroundingValidator<M> {
    /// Create a validator with a custom matcher.
    pub fn with_matcher(matcher: M, config: &GroundingConfig) -> Self {
        Self {
            matcher,
            min_claim_tokens: config.min_claim_tokens,
        }
    }

    /// Validate a draft against the chunks it was drafted from.
    ///
    /// A draft with no `text` is rejected. Chunks the draft cites are
    /// preferred as the supporting chunk; any supplied chunk may ground a
    /// claim, so adding chunks can only raise the score.
    pub fn validate(
        &self,
        draft: &DraftAnswer,
        chunks: &[KnowledgeChunk],
    ) -> Result<GroundingResult> {
        let text = draft.text()?;
        let claims = extract_claims(text, self.min_claim_tokens);

        let is_cited = |chunk: &KnowledgeChunk| draft.chunk_ids_used.iter().any(|id| *id == chunk.id);

        let verdicts: Vec<ClaimVerdict> = claims
            .into_iter()
            .map(|mut claim| {
                let support = chunks
                    .iter()
                    .filter(|c| is_cited(*c))
                    .chain(chunks.iter().filter(|c| !is_cited(*c)))
                    .find(|c| self.matcher.supports(&claim, c));

                let cited = support.map(is_cited).unwrap_or(false);
                claim.supporting_chunk_id = support.map(|c| c.id.clone());
                ClaimVerdict {
                    grounded: claim.supporting_chunk_id.is_some(),
                    cited,
                    claim,
                }
            })
            .collect();

        let result = GroundingResult::from_verdicts(verdicts);
        debug!(
            matcher = self.matcher.name(),
            claims = result.total_claims(),
            ungrounded = result.ungrounded_claims.len(),
            score = result.grounding_score,
            "validated grounding"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuidanceError;
    use proptest::prelude::*;

    fn validator() -> SourceGroundingValidator {
        SourceGroundingValidator::new(&GroundingConfig::default())
    }

    fn chunks() -> Vec<KnowledgeChunk> {
        vec![
            KnowledgeChunk::new("c1", "UCT engineering requires an APS of 35 and pure Mathematics.")
                .with_source("institution"),
            KnowledgeChunk::new("c2", "NSFAS covers tuition and accommodation for qualifying students.")
                .with_source("bursary"),
        ]
    }

    #[test]
    fn test_empty_draft_is_vacuously_grounded() {
        let result = validator().validate(&DraftAnswer::new(""), &chunks()).unwrap();
        assert_eq!(result.grounding_score, 1.0);
        assert!(result.fully_grounded);
        assert!(!result.partially_grounded);
        assert_eq!(result.total_claims(), 0);
    }

    #[test]
    fn test_missing_text_is_invalid_input() {
        let draft = DraftAnswer::default();
        let err = validator().validate(&draft, &chunks()).unwrap_err();
        assert!(matches!(err, GuidanceError::InvalidInput { .. }));
    }

    #[test]
    fn test_fully_grounded_draft() {
        let draft = DraftAnswer::new(
            "UCT engineering requires an APS of 35. NSFAS covers tuition and accommodation.",
        )
        .with_chunks(["c1", "c2"]);

        let result = validator().validate(&draft, &chunks()).unwrap();

        assert!(result.fully_grounded);
        assert_eq!(result.grounding_score, 1.0);
        assert_eq!(
            result.per_claim_results[0].claim.supporting_chunk_id.as_deref(),
            Some("c1")
        );
        assert_eq!(
            result.per_claim_results[1].claim.supporting_chunk_id.as_deref(),
            Some("c2")
        );
        assert!(result.per_claim_results.iter().all(|v| v.cited));
    }

    #[test]
    fn test_partially_grounded_draft() {
        let draft = DraftAnswer::new(
            "UCT engineering requires an APS of 35. Stellenbosch offers free residence to everyone.",
        );

        let result = validator().validate(&draft, &chunks()).unwrap();

        assert!(!result.fully_grounded);
        assert!(result.partially_grounded);
        assert!((result.grounding_score - 0.5).abs() < f64::EPSILON);
        assert_eq!(result.ungrounded_claims.len(), 1);
        assert!(result.ungrounded_claims[0].text.contains("Stellenbosch"));
    }

    #[test]
    fn test_no_chunks_means_every_claim_ungrounded() {
        let draft = DraftAnswer::new("UCT engineering requires an APS of 35. NSFAS covers tuition.");
        let result = validator().validate(&draft, &[]).unwrap();

        assert_eq!(result.grounding_score, 0.0);
        assert!(!result.fully_grounded);
        assert!(!result.partially_grounded);
        assert_eq!(result.ungrounded_claims.len(), 2);
    }

    #[test]
    fn test_uncited_support_still_grounds() {
        let draft = DraftAnswer::new("NSFAS covers tuition and accommodation.").with_chunks(["c1"]);
        let result = validator().validate(&draft, &chunks()).unwrap();

        assert!(result.fully_grounded);
        assert!(!result.per_claim_results[0].cited);
    }

    #[test]
    fn test_cited_chunk_preferred_as_support() {
        let mut all = chunks();
        all.push(KnowledgeChunk::new("c3", "NSFAS covers tuition and accommodation costs."));
        let draft = DraftAnswer::new("NSFAS covers tuition and accommodation.").with_chunks(["c3"]);

        let result = validator().validate(&draft, &all).unwrap();

        assert_eq!(
            result.per_claim_results[0].claim.supporting_chunk_id.as_deref(),
            Some("c3")
        );
        assert!(result.per_claim_results[0].cited);
    }

    #[test]
    fn test_custom_matcher() {
        struct NeverSupports;
        impl SupportMatcher for NeverSupports {
            fn supports(&self, _claim: &Claim, _chunk: &KnowledgeChunk) -> bool {
                false
            }
            fn name(&self) -> &'static str {
                "never"
            }
        }

        let validator =
            SourceGroundingValidator::with_matcher(NeverSupports, &GroundingConfig::default());
        let result = validator
            .validate(&DraftAnswer::new("UCT engineering requires an APS of 35."), &chunks())
            .unwrap();
        assert_eq!(result.grounding_score, 0.0);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = validator().validate(&DraftAnswer::new(""), &[]).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["fullyGrounded"], true);
        assert_eq!(json["groundingScore"], 1.0);
        assert!(json["ungroundedClaims"].as_array().unwrap().is_empty());
    }

    const WORDS: &[&str] = &[
        "UCT", "Wits", "NSFAS", "engineering", "medicine", "requires", "covers", "tuition",
        "Mathematics", "APS", "35", "bursary", "residence", "nursing", "four", "years",
    ];

    fn sentence() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(WORDS), 2..7).prop_map(|w| w.join(" ") + ".")
    }

    fn chunk_set() -> impl Strategy<Value = Vec<KnowledgeChunk>> {
        prop::collection::vec(sentence(), 0..6).prop_map(|texts| {
            texts
                .into_iter()
                .enumerate()
                .map(|(i, t)| KnowledgeChunk::new(format!("c{}", i), t))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_adding_chunks_never_lowers_score(
            draft in prop::collection::vec(sentence(), 0..5),
            chunks in chunk_set(),
            extra in chunk_set(),
        ) {
            let draft = DraftAnswer::new(draft.join(" "));
            let before = validator().validate(&draft, &chunks).unwrap();

            let mut more = chunks.clone();
            more.extend(extra.into_iter().map(|mut c| {
                c.id = format!("x{}", c.id);
                c
            }));
            let after = validator().validate(&draft, &more).unwrap();

            prop_assert!(after.grounding_score >= before.grounding_score);
        }

        #[test]
        fn prop_score_matches_claim_counts(
            draft in prop::collection::vec(sentence(), 0..5),
            chunks in chunk_set(),
        ) {
            let result = validator().validate(&DraftAnswer::new(draft.join(" ")), &chunks).unwrap();
            let total = result.total_claims();
            if total == 0 {
                prop_assert_eq!(result.grounding_score, 1.0);
            } else {
                let grounded = total - result.ungrounded_claims.len();
                prop_assert!((result.grounding_score - grounded as f64 / total as f64).abs() < 1e-12);
            }
            prop_assert_eq!(result.fully_grounded, result.ungrounded_claims.is_empty());
            prop_assert!(result
                .per_claim_results
                .iter()
                .all(|v| v.grounded == v.claim.supporting_chunk_id.is_some()));
        }

        #[test]
        fn prop_validate_is_idempotent(
            draft in prop::collection::vec(sentence(), 0..5),
            chunks in chunk_set(),
        ) {
            let draft = DraftAnswer::new(draft.join(" "));
            let first = serde_json::to_string(&validator().validate(&draft, &chunks).unwrap()).unwrap();
            let second = serde_json::to_string(&validator().validate(&draft, &chunks).unwrap()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
