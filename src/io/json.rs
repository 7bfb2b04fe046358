//! JSON save-state export and import.

use crate::io::SimulationState;
use std::path::Path;

pub fn export_state(
    state: &SimulationState,
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json_data = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json_data)?;

    Ok(())
}

pub fn import_state(path: impl AsRef<Path>) -> Result<SimulationState, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
