//! Config command.
//!
//! Prints the effective configuration after every layer is merged.

use crate::config::Config;
use crate::error::Result;

/// Options for the config command.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Output as JSON instead of TOML.
    pub json: bool,
}

/// The config command implementation.
pub struct ConfigCommand {
    config: Config,
}

impl ConfigCommand {
    /// Create a new config command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Render the effective configuration.
    pub fn run(&self, options: &ConfigOptions) -> Result<String> {
        if options.json {
            Ok(serde_json::to_string_pretty(&self.config)? + "\n")
        } else {
            self.config.to_toml()
        }
    }
}
