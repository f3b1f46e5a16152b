//! Gate repository backends.
//!
//! The repository is the only external collaborator the pipeline reads
//! from. In-memory and JSON file backends are provided.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileGateRepository;
pub use memory::MemoryGateRepository;
pub use traits::{GateRepository, GateSelector};
