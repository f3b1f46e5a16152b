//! Source grounding: every factual claim in a draft must trace back to a
//! retrieved chunk.

pub mod claims;
pub mod matcher;
pub mod tokens;
pub mod validator;

pub use claims::{extract_claims, Claim};
pub use matcher::{LexicalOverlapMatcher, SupportMatcher};
pub use validator::{ClaimVerdict, GroundingResult, SourceGroundingValidator};
