//! # Algorithm Module - The Distributed Algorithm Contract
//!
//! The engine treats the algorithm as an opaque collaborator: one shared
//! object whose callbacks are invoked for every particle each round, first
//! the move activation, then the beep activation, under the fully
//! synchronous scheduler. Callbacks see the world only through a
//! [`ParticleView`], which confines writes to the activated particle.
//!
//! Returning an [`InvalidAction`] from a callback (or letting a scheduler
//! error propagate with `?`) aborts the round; the driver also catches
//! panics inside callbacks and turns them into round-aborting algorithm
//! errors, so a faulty algorithm cannot corrupt committed state.

use crate::error::InvalidAction;
use crate::particle::AttrValue;
use crate::system::view::ParticleView;

/// A distributed amoebot algorithm.
///
/// One instance drives every particle of the system. Implementations are
/// expected to be stateless apart from configuration: all per-particle state
/// lives in registered attributes, which is what makes replay and save
/// states cover algorithm state for free.
pub trait Algorithm {
    /// Number of pins on every edge, fixed for the lifetime of the system.
    fn pins_per_edge(&self) -> u8 {
        1
    }

    /// The named attributes each particle starts with. The value kind of an
    /// attribute is fixed by its default.
    fn attributes(&self) -> Vec<(&'static str, AttrValue)> {
        Vec::new()
    }

    /// Move activation: read neighbors, update attributes, adjust bond
    /// flags, schedule at most one movement action.
    fn activate_move(&self, particle: &mut ParticleView<'_>) -> Result<(), InvalidAction>;

    /// Beep activation: read last round's received signals, build a pin
    /// configuration, plan beeps and messages.
    fn activate_beep(&self, particle: &mut ParticleView<'_>) -> Result<(), InvalidAction>;

    /// Local termination predicate; the system is finished once every
    /// particle reports `true` in the same round.
    fn is_finished(&self, particle: &ParticleView<'_>) -> bool {
        let _ = particle;
        false
    }
}
