//! Engine configuration.
//!
//! A plain serde-derived parameter struct, copyable and loadable from TOML
//! for host applications that keep their settings in files.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable engine behavior. All fields have defaults, so a TOML file only
/// needs to name what it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Whether circuits deliver their beeps and messages at the end of each
    /// round. Disabling this runs circuit discovery for the graphics stream
    /// but leaves every received buffer empty.
    pub send_beeps_and_messages: bool,

    /// Emit a snapshot on the frame channel every this many rounds.
    pub frame_interval: u32,

    /// Upper bound on the rounds executed by [`run`]; `None` runs until the
    /// termination predicate holds.
    ///
    /// [`run`]: crate::system::ParticleSystem::run
    pub max_rounds: Option<u32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            send_beeps_and_messages: true,
            frame_interval: 1,
            max_rounds: None,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&raw)?)
    }
}
