//! CLI commands for the `guidance` binary.
//!
//! - **evaluate**: run a request through the quality pipeline
//! - **gates**: show the gates a profile triggers
//! - **config**: print the effective configuration

pub mod config_cmd;
pub mod evaluate;
pub mod gates_cmd;

pub use config_cmd::ConfigCommand;
pub use evaluate::EvaluateCommand;
pub use gates_cmd::GatesCommand;
