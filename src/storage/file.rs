//! File-backed gate repository.
//!
//! Gates are stored as a JSON array in a single file and re-read on every
//! fetch, so edits to the file take effect without a restart. Any read or
//! parse failure surfaces as `RepositoryUnavailable`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{Gate, GradeTier};
use crate::error::{GuidanceError, Result};
use crate::storage::traits::{select_gates, GateRepository, GateSelector};

/// JSON file gate repository.
#[derive(Debug, Clone)]
pub struct FileGateRepository {
    path: PathBuf,
}

impl FileGateRepository {
    /// Create a repository reading from `path`.
    ///
    /// The file is not touched until the first fetch.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate every gate in the file.
    pub fn load_all(&self) -> Result<Vec<Gate>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            GuidanceError::repository_unavailable(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let gates: Vec<Gate> = serde_json::from_str(&content).map_err(|e| {
            GuidanceError::repository_unavailable(format!(
                "cannot parse {}: {}",
                self.path.display(),
                e
            ))
        })?;

        for gate in &gates {
            gate.validate().map_err(|e| {
                GuidanceError::repository_unavailable(format!(
                    "invalid gate record in {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        }

        Ok(gates)
    }

    /// Write gates to the backing file atomically (temp file + rename).
    pub fn save_all(&self, gates: &[Gate]) -> Result<()> {
        let json = serde_json::to_string_pretty(gates)?;
        let temp_path = self.path.with_extension("json.tmp");

        fs::write(&temp_path, json).map_err(|e| GuidanceError::storage(&temp_path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| GuidanceError::storage(&self.path, e))?;

        Ok(())
    }
}

impl GateRepository for FileGateRepository {
    fn fetch_gates(&self, tier: GradeTier, selector: &GateSelector) -> Result<Vec<Gate>> {
        let gates = self.load_all()?;
        Ok(select_gates(gates.iter(), tier, selector))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
