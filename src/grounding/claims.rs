//! Claim extraction.
//!
//! A draft is cut into sentences, non-factual sentences are dropped, and
//! compound sentences are split at clause boundaries. Splitting only happens
//! at `;`, at a comma followed by a coordinating conjunction, and before
//! contrastive conjunctions, so "requires Mathematics and Physical Sciences"
//! stays one claim.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::OnceLock;

use crate::grounding::tokens::content_tokens;

/// An atomic factual assertion extracted from a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    /// Claim text as it appears in the draft.
    pub text: String,
    /// The chunk that supports this claim, once validated.
    #[serde(default)]
    pub supporting_chunk_id: Option<String>,
}

impl Claim {
    /// Create an unvalidated claim.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            supporting_chunk_id: None,
        }
    }

    /// Whether a supporting chunk was found.
    pub fn is_grounded(&self) -> bool {
        self.supporting_chunk_id.is_some()
    }
}

/// Openers that mark a sentence as a call to action.
const CALL_TO_ACTION: &[&str] = &[
    "apply now",
    "ask ",
    "check out",
    "click",
    "consider",
    "contact",
    "don't forget",
    "do not forget",
    "feel free",
    "good luck",
    "let me know",
    "make sure",
    "please",
    "reach out",
    "remember to",
    "speak to",
    "talk to",
    "try ",
    "visit",
];

/// Openers that mark a sentence as a transition or pleasantry.
const TRANSITIONS: &[&str] = &[
    "great question",
    "here are",
    "here is",
    "here's",
    "hope this",
    "i hope",
    "in conclusion",
    "in summary",
    "let us",
    "let's",
    "to summarise",
    "to summarize",
];

fn sentence_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"[.!?]+["')\]]*\s+|\n+"#).expect("sentence boundary pattern is valid")
    })
}

fn clause_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i);\s*|,\s+(?:and|but|so|yet)\s+|,?\s+(?:but|whereas|while)\s+")
            .expect("clause boundary pattern is valid")
    })
}

fn list_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*\u{2022}]|\d+[.)])\s+").expect("list marker pattern is valid")
    })
}

/// Split text into trimmed sentences, keeping terminal punctuation.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in sentence_boundary().find_iter(text) {
        let end = m.start() + m.as_str().trim_end().len();
        push_trimmed(&mut sentences, &text[start..end]);
        start = m.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, s: &'a str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s);
    }
}

/// Whether a sentence asserts something checkable.
///
/// Questions, calls to action, transitions, headings and sentences with
/// fewer than `min_tokens` content words are not claims.
pub fn is_factual(sentence: &str, min_tokens: usize) -> bool {
    let s = sentence.trim();
    if s.ends_with('?') || s.ends_with(':') {
        return false;
    }

    let lower = s.to_lowercase();
    if CALL_TO_ACTION
        .iter()
        .chain(TRANSITIONS.iter())
        .any(|opener| lower.starts_with(opener))
    {
        return false;
    }

    content_tokens(s).len() >= min_tokens.max(1)
}

/// Split a sentence at clause boundaries.
///
/// A fragment too short to stand alone is folded back into its neighbour,
/// so a split never produces a clause with fewer than `min_tokens` words.
pub fn split_clauses(sentence: &str, min_tokens: usize) -> Vec<&str> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut start = 0;
    for m in clause_boundary().find_iter(sentence) {
        ranges.push(start..m.start());
        start = m.end();
    }
    ranges.push(start..sentence.len());

    let mut merged: Vec<Range<usize>> = Vec::new();
    for range in ranges {
        let long_enough = content_tokens(&sentence[range.clone()]).len() >= min_tokens.max(1);
        match merged.last_mut() {
            Some(prev) if !long_enough => prev.end = range.end,
            _ => merged.push(range),
        }
    }

    // A short leading fragment has no predecessor; fold it forward.
    if merged.len() > 1
        && content_tokens(&sentence[merged[0].clone()]).len() < min_tokens.max(1)
    {
        let first = merged.remove(0);
        merged[0].start = first.start;
    }

    merged
        .into_iter()
        .map(|r| sentence[r].trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract the factual claims from a draft.
///
/// Recomputed on every call; nothing is cached.
pub fn extract_claims(text: &str, min_tokens: usize) -> Vec<Claim> {
    let mut claims = Vec::new();

    for sentence in split_sentences(text) {
        let sentence = match list_marker().find(sentence) {
            Some(m) => &sentence[m.end()..],
            None => sentence,
        };
        if !is_factual(sentence, min_tokens) {
            continue;
        }
        for clause in split_clauses(sentence, min_tokens) {
            if content_tokens(clause).len() >= min_tokens.max(1) {
                claims.push(Claim::new(clause));
            }
        }
    }

    claims
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(claims: &[Claim]) -> Vec<&str> {
        claims.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_empty_text_has_no_claims() {
        assert!(extract_claims("", 2).is_empty());
        assert!(extract_claims("   \n\n  ", 2).is_empty());
    }

    #[test]
    fn test_split_sentences() {
        let sentences =
            split_sentences("UCT requires an APS of 35. Wits requires 34!\nIs that enough?");
        assert_eq!(
            sentences,
            vec!["UCT requires an APS of 35.", "Wits requires 34!", "Is that enough?"]
        );
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        let sentences = split_sentences("Fees are about R65.5 thousand per year.");
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn test_questions_and_calls_to_action_are_excluded() {
        let claims = extract_claims(
            "Engineering requires pure Mathematics. Have you considered Physics? \
             Contact the faculty office for details. Good luck with your applications!",
            2,
        );
        assert_eq!(texts(&claims), vec!["Engineering requires pure Mathematics."]);
    }

    #[test]
    fn test_transitions_are_excluded() {
        let claims = extract_claims(
            "Here is what you need to know:\nIn summary, UCT is competitive.\nNSFAS covers tuition.",
            2,
        );
        assert_eq!(texts(&claims), vec!["NSFAS covers tuition."]);
    }

    #[test]
    fn test_compound_sentence_is_split() {
        let claims = extract_claims(
            "UCT requires an APS of 35, and Wits requires an APS of 34.",
            2,
        );
        assert_eq!(
            texts(&claims),
            vec!["UCT requires an APS of 35", "Wits requires an APS of 34."]
        );
    }

    #[test]
    fn test_noun_conjunction_is_not_split() {
        let claims = extract_claims(
            "Engineering requires Mathematics and Physical Sciences.",
            2,
        );
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_short_fragment_folds_into_neighbour() {
        let clauses = split_clauses("Nursing is offered at UWC, but rarely", 2);
        assert_eq!(clauses, vec!["Nursing is offered at UWC, but rarely"]);
    }

    #[test]
    fn test_semicolon_splits() {
        let clauses = split_clauses("Medicine takes six years; Nursing takes four years", 2);
        assert_eq!(
            clauses,
            vec!["Medicine takes six years", "Nursing takes four years"]
        );
    }

    #[test]
    fn test_list_markers_are_stripped() {
        let claims = extract_claims("- NSFAS covers tuition fees\n2) Bursaries cover books", 2);
        assert_eq!(
            texts(&claims),
            vec!["NSFAS covers tuition fees", "Bursaries cover books"]
        );
    }

    #[test]
    fn test_short_sentences_are_not_claims() {
        assert!(!is_factual("Yes.", 2));
        assert!(!is_factual("Absolutely!", 2));
        assert!(is_factual("Pilots need Mathematics.", 2));
    }

    #[test]
    fn test_claims_start_ungrounded() {
        let claims = extract_claims("Pilots need Mathematics.", 2);
        assert!(!claims[0].is_grounded());
    }
}
