//! # IO Module - Save States
//!
//! A [`SimulationState`] is the versioned, purely structural record of a
//! simulation: round bounds, anchor history and the per-particle and
//! per-object histories. It captures replay in full: restoring a state and
//! stepping through its rounds reproduces the original run exactly.
//!
//! Two byte-level encodings are provided, both driven by the same serde
//! model:
//!
//! - [`bin`]: compact binary via bincode
//! - [`json`]: human-readable JSON for inspection and tooling

// Binary persistence
pub mod bin;
// JSON export/import
pub mod json;

use crate::algorithm::Algorithm;
use crate::config::SimulationConfig;
use crate::error::{SimResult, SimulationError};
use crate::grid::{Chirality, Direction, GridPos, GridVec};
use crate::history::ValueHistory;
use crate::object::Object;
use crate::particle::{AttrValue, AttributeStore, BondState, Particle};
use crate::pins::{PinConfiguration, ReceivedSignals};
use crate::system::{BondSnapshot, ParticleSystem, SystemRequest};
use serde::{Deserialize, Serialize};

/// Current save-state format version.
pub const STATE_VERSION: u32 = 1;

/// The saved histories of one particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub chirality: Chirality,
    pub compass: Direction,
    pub head: ValueHistory<GridPos>,
    pub head_dir: ValueHistory<Option<Direction>>,
    pub pins: ValueHistory<PinConfiguration>,
    pub received: ValueHistory<ReceivedSignals>,
    pub bonds: ValueHistory<BondState>,
    pub attributes: Vec<(String, ValueHistory<AttrValue>)>,
}

/// The saved shape and position history of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub cells: Vec<GridVec>,
    pub position: ValueHistory<GridPos>,
}

/// A complete, self-contained simulation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub version: u32,
    pub earliest_round: u32,
    pub latest_round: u32,
    pub finished_round: Option<u32>,
    pub pins_per_edge: u8,
    pub anchor: ValueHistory<usize>,
    pub bond_snapshots: ValueHistory<BondSnapshot>,
    pub particles: Vec<ParticleRecord>,
    pub objects: Vec<ObjectRecord>,
}

impl ParticleSystem {
    /// Captures the full simulation history as a save state.
    pub fn save_state(&self) -> SimulationState {
        SimulationState {
            version: STATE_VERSION,
            earliest_round: self.earliest_round(),
            latest_round: self.latest_round(),
            finished_round: self.finished_round(),
            pins_per_edge: self.pins_per_edge(),
            anchor: self.anchor_history.clone(),
            bond_snapshots: self.bond_snapshots.clone(),
            particles: self
                .particles
                .iter()
                .map(|p| ParticleRecord {
                    chirality: p.chirality(),
                    compass: p.compass(),
                    head: p.head_history.clone(),
                    head_dir: p.head_dir_history.clone(),
                    pins: p.pin_history.clone(),
                    received: p.received_history.clone(),
                    bonds: p.bond_history.clone(),
                    attributes: p.attrs.to_records(),
                })
                .collect(),
            objects: self
                .objects
                .iter()
                .map(|o| ObjectRecord {
                    cells: o.cells().to_vec(),
                    position: o.position_history.clone(),
                })
                .collect(),
        }
    }

    /// Rebuilds a system from a save state, positioned at the latest round
    /// and tracking. The algorithm must be the one the state was recorded
    /// with (same pins per edge); attribute values come from the record.
    pub fn restore(
        state: SimulationState,
        algorithm: Box<dyn Algorithm>,
        config: SimulationConfig,
    ) -> SimResult<ParticleSystem> {
        if state.version != STATE_VERSION {
            return Err(SimulationError::UnsupportedVersion(state.version));
        }
        if algorithm.pins_per_edge() != state.pins_per_edge {
            return Err(SimulationError::InvalidSetup(format!(
                "algorithm expects {} pins per edge, save state has {}",
                algorithm.pins_per_edge(),
                state.pins_per_edge
            )));
        }

        // start from an empty shell and splice the histories in
        let request = SystemRequest {
            particles: Vec::new(),
            objects: Vec::new(),
            anchor: 0,
            config,
        };
        let mut system = ParticleSystem::new(request, algorithm)?;
        system.particles = state
            .particles
            .into_iter()
            .map(|record| {
                Particle::from_histories(
                    record.chirality,
                    record.compass,
                    record.head,
                    record.head_dir,
                    record.pins,
                    record.received,
                    record.bonds,
                    AttributeStore::from_histories(record.attributes),
                )
            })
            .collect();
        system.objects = state
            .objects
            .into_iter()
            .map(|record| Object::from_history(record.cells, record.position))
            .collect();
        system.anchor_history = state.anchor;
        system.bond_snapshots = state.bond_snapshots;
        system.earliest_round = state.earliest_round;
        system.current_round = state.latest_round;
        system.latest_round = state.latest_round;
        system.finished_round = state.finished_round;

        if !system.particles.is_empty()
            && *system.anchor_history.last_value() >= system.particles.len()
        {
            return Err(SimulationError::InvalidSetup(
                "anchor history points outside the particle array".to_string(),
            ));
        }
        system.sync_working_state();
        system
            .build_position_map()
            .map_err(|pos| SimulationError::InvalidSetup(format!("node {pos} is occupied twice")))?;
        Ok(system)
    }
}
