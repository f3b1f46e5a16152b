//! Core types for the guidance pipeline.
//!
//! Everything here except [`Gate`] is request-scoped: built at the start of
//! a pipeline run and dropped at its end.

pub mod assessment;
pub mod gate;
pub mod knowledge;
pub mod profile;

pub use assessment::{AssessmentRecord, CareerMatch, FinancialConstraint, RiskFlag, RiskLevel};
pub use gate::{Gate, GateSeverity, SelectorType, TriggeredGate};
pub use knowledge::{DraftAnswer, KnowledgeChunk};
pub use profile::{GradeTier, LearnerProfile};
