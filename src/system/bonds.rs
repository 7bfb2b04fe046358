//! Bond and action resolution.
//!
//! After every particle has run its move activation, the scheduled actions
//! and bond overrides are translated into the global per-label flags the
//! joint-movement engine works on. A particle that recorded no override is
//! in automatic-bonds mode: every bond active, the leading bond of an
//! expansion marked, and all bonds at the vacated node of a contraction
//! marked so that bonded neighbors are dragged along. A particle that did
//! record overrides takes full control: its released/marked/hidden sets are
//! used verbatim.

use crate::grid::GridVec;
use crate::particle::{Action, BondState};
use crate::system::{Entity, ParticleSystem};
use log::warn;

/// What the move phase produced, deciding which movement pass runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MovePhaseOutcome {
    /// At least one particle scheduled an action.
    pub any_action: bool,
    /// At least one particle released a bond.
    pub any_release: bool,
}

impl ParticleSystem {
    /// Computes `is_head_origin`, `movement_offset` and the global bond
    /// flags for every particle. Infallible; questionable requests only
    /// produce warnings.
    pub(crate) fn resolve_bonds(&mut self) -> MovePhaseOutcome {
        let mut outcome = MovePhaseOutcome::default();

        for index in 0..self.particles.len() {
            let particle = &self.particles[index];
            let expanded = particle.is_expanded();
            let action = particle.action;
            let labels = particle.label_count();

            let is_head_origin = (!expanded && action.is_none())
                || matches!(action, Some(Action::ContractHead | Action::PullHead(_)));

            let movement_offset = match action {
                None => GridVec::ZERO,
                Some(Action::Expand(d) | Action::Push(d)) => GridVec::unit(d),
                Some(Action::ContractHead | Action::PullHead(_)) => {
                    particle.head_direction().map_or(GridVec::ZERO, GridVec::unit)
                }
                Some(Action::ContractTail | Action::PullTail(_)) => particle
                    .head_direction()
                    .map_or(GridVec::ZERO, |hd| -GridVec::unit(hd)),
            };

            let overrides = particle.overrides;
            let mut bonds = BondState::all_active(labels);
            if overrides.any() {
                // manual mode: the algorithm's flags, verbatim
                bonds.active &= !overrides.released;
                bonds.marked = overrides.marked & bonds.active;
                bonds.visible &= !overrides.hidden;
            } else {
                // automatic mode: marks derived from the scheduled action
                match action {
                    None => {}
                    Some(Action::Expand(d) | Action::Push(d)) => {
                        if let Some(label) = particle.label_in_direction(d, true) {
                            bonds.marked |= 1 << label;
                        }
                        if matches!(action, Some(Action::Expand(_)))
                            && self
                                .position_map
                                .contains_key(&particle.head().neighbor(d, 1))
                        {
                            warn!("particle {index} expands into an occupied node");
                        }
                    }
                    Some(Action::ContractHead | Action::PullHead(_)) => {
                        // drag everything bonded to the vanishing tail
                        for label in 0..labels {
                            if !particle.label_is_head(label) {
                                bonds.marked |= 1 << label;
                            }
                        }
                    }
                    Some(Action::ContractTail | Action::PullTail(_)) => {
                        for label in 0..labels {
                            if particle.label_is_head(label) {
                                bonds.marked |= 1 << label;
                            }
                        }
                    }
                }
            }

            outcome.any_action |= action.is_some();
            outcome.any_release |= overrides.released != 0;

            let particle = &mut self.particles[index];
            particle.is_head_origin = is_head_origin;
            particle.movement_offset = movement_offset;
            particle.bonds = bonds;
        }

        outcome
    }

    /// Looks up the bonded counterpart of `label` on particle `index`.
    ///
    /// Returns the neighboring entity together with the reverse label when
    /// the neighbor is a particle. `None` when the adjacent node is free or
    /// the bond is not active on both sides; a one-sided release between two
    /// particles that both took manual control is reported as a warning.
    pub(crate) fn bonded_neighbor(&self, index: usize, label: u8) -> Option<(Entity, u8)> {
        let particle = &self.particles[index];
        if !particle.bonds.is_active(label) {
            return None;
        }
        let node = particle.node_of_label(label);
        let dir = particle.direction_of_label(label);
        let target = node.neighbor(dir, 1);
        match self.position_map.get(&target)? {
            &Entity::Particle(j) if j != index => {
                let other = &self.particles[j];
                let reverse = other.label_in_direction(dir.opposite(), target == other.head())?;
                if !other.bonds.is_active(reverse) {
                    if particle.overrides.any() && other.overrides.any() {
                        warn!(
                            "bond flag disagreement between particles {index} and {j}; \
                             treating the bond as released"
                        );
                    }
                    return None;
                }
                Some((Entity::Particle(j), reverse))
            }
            &Entity::Object(o) => Some((Entity::Object(o), 0)),
            _ => None,
        }
    }
}
