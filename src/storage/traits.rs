//! Gate repository trait.
//!
//! The repository owns gate reference data. The engine only queries it, and
//! every backend shares the matching rules in [`GateSelector::matches`] so
//! that swapping backends never changes which gates a query returns.

use std::sync::Arc;

use crate::core::{Gate, GradeTier, SelectorType};
use crate::error::Result;

/// Query mode for a gate lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateSelector {
    /// Subject gates whose key equals this subject (trimmed, case-insensitive).
    Subject {
        /// Subject name.
        name: String,
    },
    /// Institution gates whose key contains this fragment (case-insensitive).
    InstitutionContains {
        /// Fragment of an institution name.
        fragment: String,
    },
    /// Every gate of a selector type.
    AllOfType {
        /// The selector type to return.
        selector_type: SelectorType,
    },
}

impl GateSelector {
    /// Exact subject lookup.
    pub fn subject(name: impl Into<String>) -> Self {
        Self::Subject { name: name.into() }
    }

    /// Institution "contains" lookup.
    pub fn institution_contains(fragment: impl Into<String>) -> Self {
        Self::InstitutionContains {
            fragment: fragment.into(),
        }
    }

    /// All gates of one type.
    pub fn all_of(selector_type: SelectorType) -> Self {
        Self::AllOfType { selector_type }
    }

    /// Whether a gate satisfies this selector. Tier is checked separately.
    pub fn matches(&self, gate: &Gate) -> bool {
        match self {
            GateSelector::Subject { name } => {
                gate.selector_type == SelectorType::Subject
                    && gate.selector_key.trim().eq_ignore_ascii_case(name.trim())
            }
            GateSelector::InstitutionContains { fragment } => {
                let fragment = fragment.trim().to_lowercase();
                !fragment.is_empty()
                    && gate.selector_type == SelectorType::Institution
                    && gate.selector_key.to_lowercase().contains(&fragment)
            }
            GateSelector::AllOfType { selector_type } => gate.selector_type == *selector_type,
        }
    }
}

impl std::fmt::Display for GateSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateSelector::Subject { name } => write!(f, "subject = '{}'", name),
            GateSelector::InstitutionContains { fragment } => {
                write!(f, "institution contains '{}'", fragment)
            }
            GateSelector::AllOfType { selector_type } => write!(f, "all {}", selector_type),
        }
    }
}

/// Source of eligibility gate records.
///
/// Implementations return gates in their stored order and must report a
/// failed read as `RepositoryUnavailable` rather than an empty list.
pub trait GateRepository: Send + Sync {
    /// Fetch the gates for a tier that satisfy the selector, in stored order.
    fn fetch_gates(&self, tier: GradeTier, selector: &GateSelector) -> Result<Vec<Gate>>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

impl<T: GateRepository + ?Sized> GateRepository for Arc<T> {
    fn fetch_gates(&self, tier: GradeTier, selector: &GateSelector) -> Result<Vec<Gate>> {
        (**self).fetch_gates(tier, selector)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Filter gates in order by tier and selector.
pub(crate) fn select_gates<'a, I>(gates: I, tier: GradeTier, selector: &GateSelector) -> Vec<Gate>
where
    I: IntoIterator<Item = &'a Gate>,
{
    gates
        .into_iter()
        .filter(|g| g.grade_tier == tier && selector.matches(g))
        .cloned()
        .collect()
}
