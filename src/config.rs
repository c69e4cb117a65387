//! Dispatcher configuration.
//!
//! The dispatch section of the server configuration file. Deserialized with
//! serde and validated separately, so a malformed file fails at startup
//! with a defect naming the bad value.

use serde::Deserialize;

use crate::error::WiringError;

/// Configuration for a [`crate::CommandDispatcher`].
///
/// ```toml
/// [dispatch]
/// mandatory_commands = ["HELO", "MAIL", "RCPT", "DATA", "QUIT"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Command names that must have at least one handler after wiring.
    pub mandatory_commands: Vec<String>,
}

impl DispatchConfig {
    /// Parse a configuration section from TOML.
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Check that every configured command name is usable as a table key.
    pub fn validate(&self) -> Result<(), WiringError> {
        for name in &self.mandatory_commands {
            if name.trim().is_empty() {
                return Err(WiringError::InvalidConfig(
                    "mandatory command name is empty".into(),
                ));
            }
            if name.chars().any(char::is_whitespace) {
                return Err(WiringError::InvalidConfig(format!(
                    "mandatory command {name:?} contains whitespace"
                )));
            }
        }
        Ok(())
    }
}
