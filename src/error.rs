//! Error kinds of the simulation engine.
//!
//! [`InvalidAction`] is returned by the scheduler and builder methods of the
//! particle view; a callback may recover from it. Everything that aborts a
//! round is a [`SimulationError`]; the round driver rolls the system back to
//! the previous round and reports it. No error is retried.

use crate::grid::{Direction, GridPos};
use thiserror::Error;

/// An algorithm requested something inapplicable to its particle's current
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidAction {
    #[error("particle is already expanded")]
    AlreadyExpanded,
    #[error("particle is already contracted")]
    AlreadyContracted,
    #[error("direction {0:?} is not a cardinal direction")]
    NotCardinal(Direction),
    #[error("direction points into the particle itself")]
    SelfDirected,
    #[error("no handover partner at the target node")]
    NoHandoverPartner,
    #[error("handover partner has the wrong expansion state")]
    IncompatiblePartner,
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),
    #[error("attribute `{0}` holds a different kind of value")]
    AttributeKindMismatch(String),
    #[error("partition set {0} is out of range")]
    InvalidPartitionSet(usize),
    #[error("pin offset {0} is out of range")]
    InvalidPinOffset(u8),
    #[error("pin configuration does not match the particle shape")]
    MismatchedPinConfiguration,
    #[error("operation is not available in the {0} phase")]
    WrongPhase(&'static str),
}

/// A condition that aborts the current round.
///
/// The variants cover the engine-detected conflicts, the replay-layer state
/// guards and algorithm failures (caught panics and propagated
/// [`InvalidAction`]s, tagged with the offending particle).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("movement conflict: {0}")]
    MovementConflict(String),
    #[error("collision: node {0} is claimed twice")]
    Collision(GridPos),
    #[error("bond structure is disconnected: {unvisited} particle(s) unreachable from the anchor")]
    Disconnected { unvisited: usize },
    #[error("object {object} is dragged towards conflicting offsets")]
    ObjectConflict { object: usize },
    #[error("algorithm failed on particle {particle}: {reason}")]
    Algorithm { particle: usize, reason: String },
    #[error("round {round} is outside the recorded range {earliest}..={latest}")]
    RoundOutOfRange { round: u32, earliest: u32, latest: u32 },
    #[error("the system is replaying history; call continue_tracking() first")]
    NotTracking,
    #[error("timescale shift by {0} would move the earliest round below zero")]
    InvalidTimescaleShift(i32),
    #[error("invalid system setup: {0}")]
    InvalidSetup(String),
    #[error("unsupported save state version {0}")]
    UnsupportedVersion(u32),
}

pub type SimResult<T> = Result<T, SimulationError>;
