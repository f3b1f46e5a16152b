//! In-memory gate repository.
//!
//! Thread-safe `RwLock<Vec<Gate>>` store. Gates keep insertion order, which
//! is the order the engine reports them in.

use std::sync::RwLock;

use crate::core::{Gate, GradeTier};
use crate::error::{GuidanceError, Result};
use crate::storage::traits::{select_gates, GateRepository, GateSelector};

/// In-memory gate repository.
#[derive(Debug, Default)]
pub struct MemoryGateRepository {
    gates: RwLock<Vec<Gate>>,
}

impl MemoryGateRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            gates: RwLock::new(Vec::new()),
        }
    }

    /// Create a repository holding the given gates.
    ///
    /// Rejects any gate that violates the record invariant.
    pub fn with_gates(gates: Vec<Gate>) -> Result<Self> {
        for gate in &gates {
            gate.validate()?;
        }
        Ok(Self {
            gates: RwLock::new(gates),
        })
    }

    /// Append a gate.
    pub fn insert(&self, gate: Gate) -> Result<()> {
        gate.validate()?;
        self.gates
            .write()
            .map_err(|_| GuidanceError::repository_unavailable("gate store lock poisoned"))?
            .push(gate);
        Ok(())
    }

    /// Number of gates held.
    pub fn len(&self) -> usize {
        self.gates.read().map(|g| g.len()).unwrap_or(0)
    }

    /// Check if the repository is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GateRepository for MemoryGateRepository {
    fn fetch_gates(&self, tier: GradeTier, selector: &GateSelector) -> Result<Vec<Gate>> {
        let gates = self
            .gates
            .read()
            .map_err(|_| GuidanceError::repository_unavailable("gate store lock poisoned"))?;
        Ok(select_gates(gates.iter(), tier, selector))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GateSeverity, SelectorType};
    use crate::storage::traits::tests::{sample_gates, test_gate_repository_contract};

    #[test]
    fn test_memory_repository_contract() {
        let repo = MemoryGateRepository::with_gates(sample_gates()).unwrap();
        test_gate_repository_contract(&repo);
    }

    #[test]
    fn test_new_repository_is_empty() {
        let repo = MemoryGateRepository::new();
        assert!(repo.is_empty());
        let gates = repo
            .fetch_gates(GradeTier::Twelve, &GateSelector::all_of(SelectorType::Logistics))
            .unwrap();
        assert!(gates.is_empty());
    }

    #[test]
    fn test_insert_preserves_order() {
        let repo = MemoryGateRepository::new();
        for key in ["Transport", "Accommodation", "Deadlines"] {
            repo.insert(Gate::new(
                GradeTier::Twelve,
                SelectorType::Logistics,
                key,
                format!("{} guidance", key),
                GateSeverity::Advise,
            ))
            .unwrap();
        }
        assert_eq!(repo.len(), 3);

        let keys: Vec<String> = repo
            .fetch_gates(GradeTier::Twelve, &GateSelector::all_of(SelectorType::Logistics))
            .unwrap()
            .into_iter()
            .map(|g| g.selector_key)
            .collect();
        assert_eq!(keys, vec!["Transport", "Accommodation", "Deadlines"]);
    }

    #[test]
    fn test_insert_rejects_invalid_gate() {
        let repo = MemoryGateRepository::new();
        let gate = Gate::new(
            GradeTier::Twelve,
            SelectorType::Logistics,
            "Deadlines",
            "",
            GateSeverity::Advise,
        );
        assert!(repo.insert(gate).is_err());
        assert!(repo.is_empty());
    }
}
