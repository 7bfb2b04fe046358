//! The joint-movement engine.
//!
//! Starting from the anchor, a BFS over the bond graph assigns every
//! particle and every bonded object a rigid displacement (`jm_offset`) such
//! that all local movements compose into one consistent motion. The
//! per-bond arithmetic reduces to a single rule: each side of a bond
//! contributes the shift its half of the edge performs (its movement offset
//! if the bond is marked and rides the moving half, zero if it stays on the
//! origin), and a matching push/pull pair cancels out into a handover.
//! Disagreements between two assignments of the same entity are conflicts
//! and abort the round at the first edge that exposes them.
//!
//! When no particle scheduled an action the engine is skipped and the
//! static bond pass only walks the bond graph to publish a snapshot for the
//! graphics stream; that pass does not check connectivity.

use crate::error::{SimResult, SimulationError};
use crate::grid::{GridPos, GridVec};
use crate::particle::{Action, BondState, Particle};
use crate::pins::PinConfiguration;
use crate::system::{BondGraphic, BondSnapshot, Entity, MovementGraphic, ParticleSystem};
use std::collections::{HashMap, VecDeque};

/// The fully resolved outcome of a movement pass, applied in one step after
/// every check passed. Nothing in the system is mutated before a placement
/// exists, which is what makes round rollback trivial.
pub(crate) struct Placement {
    pub new_map: HashMap<GridPos, Entity>,
    pub jm: Vec<GridVec>,
    pub object_offsets: Vec<GridVec>,
    pub snapshot: BondSnapshot,
    pub movements: Vec<MovementGraphic>,
}

/// The displacement the given bond endpoint performs in its particle's own
/// frame: the movement offset if the bond rides the moving half, zero if it
/// stays with the origin. A kept bond at a vacated node that is not marked
/// cannot be satisfied and is a conflict.
fn bond_shift(particle: &Particle, index: usize, label: u8) -> SimResult<GridVec> {
    let Some(action) = particle.action else {
        return Ok(GridVec::ZERO);
    };
    let marked = particle.bonds.is_marked(label);
    match action {
        Action::Expand(_) | Action::Push(_) => Ok(if marked {
            particle.movement_offset
        } else {
            GridVec::ZERO
        }),
        Action::ContractHead
        | Action::ContractTail
        | Action::PullHead(_)
        | Action::PullTail(_) => {
            if particle.label_is_head(label) == particle.is_head_origin {
                // the bond sits on the half the particle contracts into
                Ok(GridVec::ZERO)
            } else if marked {
                Ok(particle.movement_offset)
            } else {
                Err(SimulationError::MovementConflict(format!(
                    "particle {index} contracts but keeps an unmarked bond at the vacated node"
                )))
            }
        }
    }
}

/// Whether the bond connects a matching push/pull pair: the contracted side
/// pushes into exactly the node the expanded side vacates, and the expanded
/// side pulls exactly the pushing particle. Such a pair exchanges the node
/// with zero relative displacement.
fn is_handover_pair(a: &Particle, a_label: u8, b: &Particle, b_label: u8) -> bool {
    fn check(pusher: &Particle, expanded: &Particle, e_label: u8) -> bool {
        if pusher.is_expanded() || !expanded.is_expanded() {
            return false;
        }
        let Some(Action::Push(push_dir)) = pusher.action else {
            return false;
        };
        let vacated = match expanded.action {
            // contracting into the head vacates the tail
            Some(Action::PullHead(partner_dir)) if !expanded.label_is_head(e_label) => {
                let v = expanded.tail();
                (v + GridVec::unit(partner_dir) == pusher.head()).then_some(v)
            }
            Some(Action::PullTail(partner_dir)) if expanded.label_is_head(e_label) => {
                let v = expanded.head();
                (v + GridVec::unit(partner_dir) == pusher.head()).then_some(v)
            }
            _ => None,
        };
        vacated.is_some_and(|v| pusher.head() + GridVec::unit(push_dir) == v)
    }
    check(a, b, b_label) || check(b, a, a_label)
}

/// The required difference `neighbor.jm − particle.jm` across one bond.
fn relative_offset(
    particle: &Particle,
    p_index: usize,
    p_label: u8,
    neighbor: &Particle,
    n_index: usize,
    n_label: u8,
) -> SimResult<GridVec> {
    if is_handover_pair(particle, p_label, neighbor, n_label) {
        return Ok(GridVec::ZERO);
    }
    let ours = bond_shift(particle, p_index, p_label)?;
    let theirs = bond_shift(neighbor, n_index, n_label)?;
    Ok(ours - theirs)
}

impl ParticleSystem {
    /// Runs the joint-movement BFS and validates the result into a
    /// [`Placement`]. All conflicts surface as [`SimulationError`]s here;
    /// the system itself is left untouched.
    pub(crate) fn run_joint_movements(&self) -> SimResult<Placement> {
        let particle_count = self.particles.len();
        let mut jm: Vec<Option<GridVec>> = vec![None; particle_count];
        let mut object_offsets: Vec<Option<GridVec>> = vec![None; self.objects.len()];
        let mut bonds_gfx = Vec::new();
        let mut queue = VecDeque::new();

        jm[self.anchor] = Some(GridVec::ZERO);
        queue.push_back(Entity::Particle(self.anchor));

        while let Some(entity) = queue.pop_front() {
            match entity {
                Entity::Particle(i) => {
                    let particle = &self.particles[i];
                    let base = jm[i].unwrap_or(GridVec::ZERO);
                    for label in 0..particle.label_count() {
                        let Some((bonded, reverse)) = self.bonded_neighbor(i, label) else {
                            continue;
                        };
                        let node = particle.node_of_label(label);
                        let target = node.neighbor(particle.direction_of_label(label), 1);
                        match bonded {
                            Entity::Particle(j) => {
                                let other = &self.particles[j];
                                self.emit_bond(&mut bonds_gfx, node, target, particle, label, other, reverse);
                                let offset = relative_offset(particle, i, label, other, j, reverse)?;
                                let required = base + offset;
                                match jm[j] {
                                    Some(existing) if existing != required => {
                                        return Err(SimulationError::MovementConflict(format!(
                                            "particles {i} and {j} disagree on their joint displacement"
                                        )));
                                    }
                                    Some(_) => {}
                                    None => {
                                        jm[j] = Some(required);
                                        queue.push_back(Entity::Particle(j));
                                    }
                                }
                            }
                            Entity::Object(o) => {
                                bonds_gfx.push(BondGraphic {
                                    from: node,
                                    to: target,
                                    hidden: !particle.bonds.is_visible(label),
                                });
                                let required = base + bond_shift(particle, i, label)?;
                                match object_offsets[o] {
                                    Some(existing) if existing != required => {
                                        return Err(SimulationError::ObjectConflict { object: o });
                                    }
                                    Some(_) => {}
                                    None => {
                                        object_offsets[o] = Some(required);
                                        queue.push_back(Entity::Object(o));
                                    }
                                }
                            }
                        }
                    }
                }
                Entity::Object(o) => {
                    let base = object_offsets[o].unwrap_or(GridVec::ZERO);
                    for (j, reverse) in self.object_particle_bonds(o) {
                        let other = &self.particles[j];
                        // the particle's bond endpoint must land where the
                        // rigid object carries it
                        let required = base - bond_shift(other, j, reverse)?;
                        match jm[j] {
                            Some(existing) if existing != required => {
                                return Err(SimulationError::MovementConflict(format!(
                                    "object {o} and particle {j} disagree on their joint displacement"
                                )));
                            }
                            Some(_) => {}
                            None => {
                                jm[j] = Some(required);
                                queue.push_back(Entity::Particle(j));
                            }
                        }
                    }
                }
            }
        }

        let unvisited = jm.iter().filter(|offset| offset.is_none()).count();
        if unvisited > 0 {
            return Err(SimulationError::Disconnected { unvisited });
        }

        let jm: Vec<GridVec> = jm.into_iter().map(|offset| offset.unwrap_or(GridVec::ZERO)).collect();
        let object_offsets: Vec<GridVec> = object_offsets
            .into_iter()
            .map(|offset| offset.unwrap_or(GridVec::ZERO))
            .collect();

        let new_map = self.place_all(&jm, &object_offsets)?;
        let movements = self.movement_graphics(&jm);
        Ok(Placement {
            new_map,
            jm,
            object_offsets,
            snapshot: BondSnapshot(bonds_gfx),
            movements,
        })
    }

    /// The fallback pass when no particle scheduled an action: walk the bond
    /// graph from the anchor and publish the bond snapshot with all offsets
    /// zero. Deliberately no connectivity check.
    pub(crate) fn static_bond_pass(&self) -> Placement {
        let particle_count = self.particles.len();
        let mut visited = vec![false; particle_count];
        let mut visited_objects = vec![false; self.objects.len()];
        let mut bonds_gfx = Vec::new();
        let mut queue = VecDeque::new();

        if particle_count > 0 {
            visited[self.anchor] = true;
            queue.push_back(Entity::Particle(self.anchor));
        }
        while let Some(entity) = queue.pop_front() {
            match entity {
                Entity::Particle(i) => {
                    let particle = &self.particles[i];
                    for label in 0..particle.label_count() {
                        let Some((bonded, reverse)) = self.bonded_neighbor(i, label) else {
                            continue;
                        };
                        let node = particle.node_of_label(label);
                        let target = node.neighbor(particle.direction_of_label(label), 1);
                        match bonded {
                            Entity::Particle(j) => {
                                let other = &self.particles[j];
                                self.emit_bond(&mut bonds_gfx, node, target, particle, label, other, reverse);
                                if !visited[j] {
                                    visited[j] = true;
                                    queue.push_back(Entity::Particle(j));
                                }
                            }
                            Entity::Object(o) => {
                                bonds_gfx.push(BondGraphic {
                                    from: node,
                                    to: target,
                                    hidden: !particle.bonds.is_visible(label),
                                });
                                if !visited_objects[o] {
                                    visited_objects[o] = true;
                                    queue.push_back(Entity::Object(o));
                                }
                            }
                        }
                    }
                }
                Entity::Object(o) => {
                    for (j, _) in self.object_particle_bonds(o) {
                        if !visited[j] {
                            visited[j] = true;
                            queue.push_back(Entity::Particle(j));
                        }
                    }
                }
            }
        }

        Placement {
            new_map: self.position_map.clone(),
            jm: vec![GridVec::ZERO; particle_count],
            object_offsets: vec![GridVec::ZERO; self.objects.len()],
            movements: self.movement_graphics(&vec![GridVec::ZERO; particle_count]),
            snapshot: BondSnapshot(bonds_gfx),
        }
    }

    /// Applies a validated placement: moves every particle and object,
    /// swaps in the new position map and refreshes the per-round state of
    /// everything that moved. Returns the bond snapshot for the commit.
    pub(crate) fn apply_movement(&mut self, placement: Placement) -> BondSnapshot {
        let pins_per_edge = self.pins_per_edge;
        for (i, particle) in self.particles.iter_mut().enumerate() {
            let offset = placement.jm[i];
            match particle.action {
                None => particle.head = particle.head + offset,
                Some(Action::Expand(d) | Action::Push(d)) => {
                    particle.head = particle.head + offset + GridVec::unit(d);
                    particle.head_dir = Some(d);
                }
                Some(Action::ContractHead | Action::PullHead(_)) => {
                    particle.head = particle.head + offset;
                    particle.head_dir = None;
                }
                Some(Action::ContractTail | Action::PullTail(_)) => {
                    let new_head = particle.tail() + offset;
                    particle.head = new_head;
                    particle.head_dir = None;
                }
            }
            particle.jm_offset = Some(offset);
            if particle.action.is_some() {
                // a moved particle starts over with singleton pins and
                // default bonds matching its new shape
                particle.pins =
                    PinConfiguration::singleton(pins_per_edge, particle.is_expanded());
                particle.bonds = BondState::all_active(particle.label_count());
            }
        }
        for (o, object) in self.objects.iter_mut().enumerate() {
            object.position = object.position + placement.object_offsets[o];
            object.jm_offset = Some(placement.object_offsets[o]);
        }
        self.position_map = placement.new_map;
        self.last_movements = placement.movements;
        placement.snapshot
    }

    /// Builds the post-movement occupancy map, failing on the first node
    /// claimed twice.
    fn place_all(
        &self,
        jm: &[GridVec],
        object_offsets: &[GridVec],
    ) -> SimResult<HashMap<GridPos, Entity>> {
        let mut map = HashMap::with_capacity(self.position_map.len() + 8);
        let mut claim = |node: GridPos, entity: Entity| -> SimResult<()> {
            match map.insert(node, entity) {
                Some(_) => Err(SimulationError::Collision(node)),
                None => Ok(()),
            }
        };
        for (i, particle) in self.particles.iter().enumerate() {
            let offset = jm[i];
            match particle.action {
                None => {
                    claim(particle.head() + offset, Entity::Particle(i))?;
                    if particle.is_expanded() {
                        claim(particle.tail() + offset, Entity::Particle(i))?;
                    }
                }
                Some(Action::Expand(d) | Action::Push(d)) => {
                    claim(particle.head() + offset, Entity::Particle(i))?;
                    claim(particle.head() + offset + GridVec::unit(d), Entity::Particle(i))?;
                }
                Some(Action::ContractHead | Action::PullHead(_)) => {
                    claim(particle.head() + offset, Entity::Particle(i))?;
                }
                Some(Action::ContractTail | Action::PullTail(_)) => {
                    claim(particle.tail() + offset, Entity::Particle(i))?;
                }
            }
        }
        for (o, object) in self.objects.iter().enumerate() {
            for node in object.occupied_nodes() {
                claim(node + object_offsets[o], Entity::Object(o))?;
            }
        }
        Ok(map)
    }

    fn movement_graphics(&self, jm: &[GridVec]) -> Vec<MovementGraphic> {
        self.particles
            .iter()
            .enumerate()
            .map(|(i, particle)| MovementGraphic {
                particle: i,
                offset: jm[i],
                action: particle.action,
            })
            .collect()
    }

    /// Emits a particle-particle bond once: only from the lexicographically
    /// smaller endpoint, since the BFS visits the edge from both sides.
    #[allow(clippy::too_many_arguments)]
    fn emit_bond(
        &self,
        gfx: &mut Vec<BondGraphic>,
        node: GridPos,
        target: GridPos,
        particle: &Particle,
        label: u8,
        other: &Particle,
        reverse: u8,
    ) {
        if (node.x, node.y) < (target.x, target.y) {
            gfx.push(BondGraphic {
                from: node,
                to: target,
                hidden: !particle.bonds.is_visible(label) || !other.bonds.is_visible(reverse),
            });
        }
    }

    /// All bonds between object `o` and adjacent particles, as
    /// `(particle, reverse label)` pairs.
    fn object_particle_bonds(&self, o: usize) -> Vec<(usize, u8)> {
        let object = &self.objects[o];
        let mut bonds = Vec::new();
        for node in object.occupied_nodes() {
            for k in 0..6 {
                let dir = crate::grid::Direction::from_cardinal_int(k);
                let target = node.neighbor(dir, 1);
                if let Some(&Entity::Particle(j)) = self.position_map.get(&target) {
                    let other = &self.particles[j];
                    let Some(reverse) =
                        other.label_in_direction(dir.opposite(), target == other.head())
                    else {
                        continue;
                    };
                    if other.bonds.is_active(reverse) {
                        bonds.push((j, reverse));
                    }
                }
            }
        }
        bonds
    }
}
