//! Grade-specific eligibility gates.

pub mod engine;

pub use engine::{any_blocking, sort_by_severity, EligibilityGateEngine};
