//! Binary save-state persistence via bincode.

use crate::io::SimulationState;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Writes a save state to a binary file, creating parent directories as
/// needed.
pub fn save_state(
    state: &SimulationState,
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, state)?;

    Ok(())
}

/// Reads a save state back from a binary file.
pub fn load_state(path: impl AsRef<Path>) -> Result<SimulationState, Box<dyn std::error::Error>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(format!("save state not found: {}", path.display()).into());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(bincode::deserialize_from(reader)?)
}
