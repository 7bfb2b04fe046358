//! # System Module - The Particle System Engine
//!
//! [`ParticleSystem`] owns the particle and object arenas, the node→entity
//! position map and the anchor, and drives the fully synchronous round
//! schedule: move activations, bond resolution, joint movements, beep
//! activations, circuit discovery and signal delivery, then a single history
//! commit. Everything an algorithm touches goes through stable arena
//! indices; no references escape a round.
//!
//! ## Submodules
//!
//! - [`round`]: The two-phase round driver with exception isolation
//! - [`bonds`]: Translation of scheduled actions into global bond flags
//! - [`movement`]: The joint-movement BFS and the static bond pass
//! - [`circuits`]: Circuit discovery and beep/message distribution
//! - [`view`]: The particle view handed to algorithm callbacks
//! - [`tests`]: Unit tests for the engine core

// Bond/action resolution
pub(crate) mod bonds;
// Circuit discovery and signal distribution
pub(crate) mod circuits;
// Joint-movement engine and static bond pass
pub(crate) mod movement;
// Round scheduler
pub(crate) mod round;
// Unit tests
pub mod tests;
// Algorithm-facing particle view
pub mod view;

pub use circuits::CircuitAssignment;
pub use view::{Neighbor, NeighborSearch, NeighborView, ParticleView};

use crate::algorithm::Algorithm;
use crate::config::SimulationConfig;
use crate::error::{SimResult, SimulationError};
use crate::grid::{Chirality, Direction, GridPos, GridVec};
use crate::history::{ReplayHistory, ValueHistory};
use crate::object::Object;
use crate::particle::{Action, AttributeStore, Particle};
use log::error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc;

/// What occupies a grid node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Particle(usize),
    Object(usize),
}

/// Initial description of one particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleSpec {
    pub head: GridPos,
    /// Global head direction; `None` places the particle contracted.
    pub head_dir: Option<Direction>,
    pub chirality: Chirality,
    pub compass: Direction,
}

impl ParticleSpec {
    /// A contracted particle with the default compass orientation.
    pub fn contracted(head: GridPos) -> Self {
        ParticleSpec {
            head,
            head_dir: None,
            chirality: Chirality::CounterClockwise,
            compass: Direction::E,
        }
    }

    /// An expanded particle with the default compass orientation.
    pub fn expanded(head: GridPos, head_dir: Direction) -> Self {
        ParticleSpec {
            head,
            head_dir: Some(head_dir),
            chirality: Chirality::CounterClockwise,
            compass: Direction::E,
        }
    }

    pub fn with_chirality(mut self, chirality: Chirality) -> Self {
        self.chirality = chirality;
        self
    }

    pub fn with_compass(mut self, compass: Direction) -> Self {
        self.compass = compass;
        self
    }
}

/// Initial description of one object: a position plus relative cell shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    pub position: GridPos,
    pub cells: Vec<GridVec>,
}

/// Everything needed to initialize a system. Mirrors the request pattern of
/// the simulation constructor: validated once, then owned by the engine.
#[derive(Debug, Clone)]
pub struct SystemRequest {
    pub particles: Vec<ParticleSpec>,
    pub objects: Vec<ObjectSpec>,
    /// Index of the anchor particle.
    pub anchor: usize,
    pub config: SimulationConfig,
}

/// One bond edge for the graphics sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondGraphic {
    pub from: GridPos,
    pub to: GridPos,
    /// At least one endpoint asked for the bond not to be drawn.
    pub hidden: bool,
}

/// All bonds of one round, as emitted by the movement engine or the static
/// bond pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondSnapshot(pub Vec<BondGraphic>);

/// Per-particle movement summary for the graphics sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementGraphic {
    pub particle: usize,
    /// Rigid displacement imposed by the joint movement.
    pub offset: GridVec,
    pub action: Option<Action>,
}

/// The per-round stream element consumed by a graphics layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round: u32,
    pub bonds: BondSnapshot,
    pub movements: Vec<MovementGraphic>,
    pub circuits: Option<CircuitAssignment>,
}

/// The simulation engine. See the module documentation for the round
/// structure; the replay contract lives directly on this type.
pub struct ParticleSystem {
    pub(crate) particles: Vec<Particle>,
    pub(crate) objects: Vec<Object>,
    pub(crate) position_map: HashMap<GridPos, Entity>,
    pub(crate) anchor: usize,
    pub(crate) anchor_history: ValueHistory<usize>,
    pub(crate) bond_snapshots: ValueHistory<BondSnapshot>,
    pub(crate) algorithm: Rc<dyn Algorithm>,
    pub(crate) config: SimulationConfig,
    pub(crate) pins_per_edge: u8,
    pub(crate) earliest_round: u32,
    pub(crate) current_round: u32,
    pub(crate) latest_round: u32,
    pub(crate) finished_round: Option<u32>,
    pub(crate) tracking: bool,
    pub(crate) frame_sender: Option<mpsc::Sender<RoundSnapshot>>,
    pub(crate) last_movements: Vec<MovementGraphic>,
    pub(crate) last_circuits: Option<CircuitAssignment>,
}

impl ParticleSystem {
    /// Validates a request and builds the system at round zero.
    ///
    /// Fails with [`SimulationError::InvalidSetup`] on overlapping
    /// occupancy, a dangling anchor index or non-cardinal compass/head
    /// directions.
    pub fn new(request: SystemRequest, algorithm: Box<dyn Algorithm>) -> SimResult<Self> {
        let algorithm: Rc<dyn Algorithm> = Rc::from(algorithm);
        let pins_per_edge = algorithm.pins_per_edge();
        let defaults = algorithm.attributes();

        if !request.particles.is_empty() && request.anchor >= request.particles.len() {
            return Err(SimulationError::InvalidSetup(format!(
                "anchor index {} out of range",
                request.anchor
            )));
        }

        let mut particles = Vec::with_capacity(request.particles.len());
        for spec in &request.particles {
            if !spec.compass.is_cardinal() {
                return Err(SimulationError::InvalidSetup(format!(
                    "compass {:?} is not cardinal",
                    spec.compass
                )));
            }
            if let Some(hd) = spec.head_dir {
                if !hd.is_cardinal() {
                    return Err(SimulationError::InvalidSetup(format!(
                        "head direction {:?} is not cardinal",
                        hd
                    )));
                }
            }
            particles.push(Particle::new(
                spec.head,
                spec.head_dir,
                spec.chirality,
                spec.compass,
                pins_per_edge,
                AttributeStore::new(&defaults, 0),
                0,
            ));
        }

        let objects: Vec<Object> = request
            .objects
            .iter()
            .map(|spec| Object::new(spec.position, spec.cells.clone(), 0))
            .collect();

        let mut system = ParticleSystem {
            particles,
            objects,
            position_map: HashMap::new(),
            anchor: request.anchor,
            anchor_history: ValueHistory::new(request.anchor, 0),
            bond_snapshots: ValueHistory::new(BondSnapshot::default(), 0),
            algorithm,
            config: request.config,
            pins_per_edge,
            earliest_round: 0,
            current_round: 0,
            latest_round: 0,
            finished_round: None,
            tracking: true,
            frame_sender: None,
            last_movements: Vec::new(),
            last_circuits: None,
        };
        system.build_position_map().map_err(|pos| {
            SimulationError::InvalidSetup(format!("node {pos} is occupied twice"))
        })?;
        Ok(system)
    }

    /// Attaches the snapshot channel the graphics sink listens on.
    pub fn with_frame_channel(mut self, sender: mpsc::Sender<RoundSnapshot>) -> Self {
        self.frame_sender = Some(sender);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn pins_per_edge(&self) -> u8 {
        self.pins_per_edge
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particle(&self, index: usize) -> &Particle {
        &self.particles[index]
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object(&self, index: usize) -> &Object {
        &self.objects[index]
    }

    /// What occupies a node, if anything.
    pub fn entity_at(&self, pos: GridPos) -> Option<Entity> {
        self.position_map.get(&pos).copied()
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// Re-anchors the system on another particle. Only available while
    /// tracking; the change is committed with the next round.
    pub fn set_anchor(&mut self, index: usize) -> SimResult<()> {
        if !self.tracking {
            return Err(SimulationError::NotTracking);
        }
        if index >= self.particles.len() {
            return Err(SimulationError::InvalidSetup(format!(
                "anchor index {index} out of range"
            )));
        }
        self.anchor = index;
        Ok(())
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn latest_round(&self) -> u32 {
        self.latest_round
    }

    pub fn earliest_round(&self) -> u32 {
        self.earliest_round
    }

    /// Whether every particle reported local termination in some committed
    /// round that is still part of the history.
    pub fn is_finished(&self) -> bool {
        self.finished_round.is_some()
    }

    pub fn finished_round(&self) -> Option<u32> {
        self.finished_round
    }

    /// Whether the system accepts new rounds (as opposed to replaying).
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// The bond snapshot recorded for a round.
    pub fn bond_snapshot_at(&self, round: u32) -> &BondSnapshot {
        self.bond_snapshots.value_at(round)
    }

    /// The circuit assignment of the last simulated round, if any.
    pub fn circuits(&self) -> Option<&CircuitAssignment> {
        self.last_circuits.as_ref()
    }

    // ---- replay contract ----

    /// Moves the history marker to `round` and enters read-only replay.
    pub fn set_marker_to_round(&mut self, round: u32) -> SimResult<()> {
        if round < self.earliest_round || round > self.latest_round {
            return Err(SimulationError::RoundOutOfRange {
                round,
                earliest: self.earliest_round,
                latest: self.latest_round,
            });
        }
        self.current_round = round;
        self.tracking = false;
        self.sync_working_state();
        Ok(())
    }

    /// Steps one round back in replay; returns `false` at the earliest
    /// round.
    pub fn step_back(&mut self) -> SimResult<bool> {
        if self.current_round == self.earliest_round {
            return Ok(false);
        }
        self.set_marker_to_round(self.current_round - 1)?;
        Ok(true)
    }

    /// Steps one round forward in replay; returns `false` at the latest
    /// round.
    pub fn step_forward(&mut self) -> SimResult<bool> {
        if self.current_round == self.latest_round {
            return Ok(false);
        }
        self.set_marker_to_round(self.current_round + 1)?;
        Ok(true)
    }

    /// Leaves replay: restores the latest round and re-enables
    /// `simulate_round`.
    pub fn continue_tracking(&mut self) {
        self.current_round = self.latest_round;
        self.tracking = true;
        self.sync_working_state();
    }

    /// Truncates all history after the marker, making the marked round the
    /// latest one, and re-enters tracking. Idempotent.
    pub fn cut_off_at_marker(&mut self) {
        for particle in &mut self.particles {
            particle.set_marker(self.current_round);
            particle.cut_off_at_marker();
        }
        for object in &mut self.objects {
            object.set_marker(self.current_round);
            object.cut_off_at_marker();
        }
        self.anchor_history.set_marker(self.current_round);
        self.anchor_history.cut_off_at_marker();
        self.bond_snapshots.set_marker(self.current_round);
        self.bond_snapshots.cut_off_at_marker();

        self.latest_round = self.current_round;
        if self.finished_round.is_some_and(|r| r > self.latest_round) {
            self.finished_round = None;
        }
        self.tracking = true;
        self.sync_working_state();
    }

    /// Shifts every recorded round number by `offset`.
    pub fn shift_timescale(&mut self, offset: i32) -> SimResult<()> {
        if (self.earliest_round as i64 + offset as i64) < 0 {
            return Err(SimulationError::InvalidTimescaleShift(offset));
        }
        for particle in &mut self.particles {
            particle.shift_timescale(offset);
        }
        for object in &mut self.objects {
            object.shift_timescale(offset);
        }
        self.anchor_history.shift_timescale(offset);
        self.bond_snapshots.shift_timescale(offset);
        let shift = |r: u32| (r as i64 + offset as i64) as u32;
        self.earliest_round = shift(self.earliest_round);
        self.current_round = shift(self.current_round);
        self.latest_round = shift(self.latest_round);
        self.finished_round = self.finished_round.map(shift);
        Ok(())
    }

    // ---- internal state maintenance ----

    /// Reloads all working state from the histories at `current_round` and
    /// rebuilds the position map.
    pub(crate) fn sync_working_state(&mut self) {
        let round = self.current_round;
        for particle in &mut self.particles {
            particle.restore_to(round);
        }
        for object in &mut self.objects {
            object.restore_to(round);
        }
        self.anchor_history.set_marker(round);
        self.anchor = *self.anchor_history.marked_value();
        self.bond_snapshots.set_marker(round);
        let rebuilt = self.build_position_map();
        debug_assert!(rebuilt.is_ok(), "inconsistent occupancy in histories");
    }

    /// Rebuilds the position map from working state. Returns the first
    /// doubly-claimed node on failure.
    pub(crate) fn build_position_map(&mut self) -> Result<(), GridPos> {
        self.position_map.clear();
        for (i, particle) in self.particles.iter().enumerate() {
            for node in particle.occupied_nodes() {
                if self.position_map.insert(node, Entity::Particle(i)).is_some() {
                    return Err(node);
                }
            }
        }
        for (i, object) in self.objects.iter().enumerate() {
            for node in object.occupied_nodes() {
                if self.position_map.insert(node, Entity::Object(i)).is_some() {
                    return Err(node);
                }
            }
        }
        Ok(())
    }

    /// Sends the round snapshot to the graphics sink, if one is attached.
    /// Non-blocking: a vanished receiver only logs an error.
    pub(crate) fn send_frame_data(&self, bonds: BondSnapshot) {
        if let Some(sender) = &self.frame_sender {
            let frame = RoundSnapshot {
                round: self.current_round,
                bonds,
                movements: self.last_movements.clone(),
                circuits: self.last_circuits.clone(),
            };
            if let Err(err) = sender.send(frame) {
                error!("failed to send frame data: {err}");
            }
        }
    }
}
