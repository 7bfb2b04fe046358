//! The particle view handed to algorithm callbacks.
//!
//! A view is an arena index plus mutable access to the system; every write
//! it permits lands on the activated particle only, which is what keeps the
//! fully synchronous semantics honest. Directions crossing this boundary
//! are always local: the view translates through the particle's compass and
//! chirality in both directions, including the pin-offset mirroring for
//! clockwise particles.

use crate::error::InvalidAction;
use crate::grid::labels;
use crate::grid::{Chirality, Direction, GridPos};
use crate::particle::{Action, AttrValue, Particle};
use crate::pins::{Message, PinConfiguration, PinIndex};
use crate::system::{Entity, ParticleSystem};
use log::warn;

/// Which callback the view is serving; schedulers and builders are gated to
/// their phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Move,
    Beep,
    Query,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Move => "move",
            Phase::Beep => "beep",
            Phase::Query => "query",
        }
    }
}

/// A neighbor found through the view, in the caller's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    /// Arena index of the neighboring particle.
    pub index: usize,
    /// Local direction from the caller to the neighbor.
    pub local_dir: Direction,
    /// Whether the connecting edge leaves the caller's head.
    pub at_head: bool,
    /// Whether the node reached is the neighbor's head.
    pub neighbor_is_head: bool,
}

/// Parameters of a chirality-aware neighbor search, starting at a local
/// direction and walking the caller's boundary labels.
#[derive(Debug, Clone, Copy)]
pub struct NeighborSearch {
    pub start_dir: Direction,
    pub from_head: bool,
    /// Walk against the caller's own rotation sense.
    pub against_chirality: bool,
    /// Number of boundary positions to examine; defaults to all of them.
    pub max_search: Option<u8>,
    /// Stop after this many neighbors were found.
    pub max_count: Option<u8>,
}

impl NeighborSearch {
    pub fn starting_at(start_dir: Direction) -> Self {
        NeighborSearch {
            start_dir,
            from_head: true,
            against_chirality: false,
            max_search: None,
            max_count: None,
        }
    }

    pub fn from_tail(mut self) -> Self {
        self.from_head = false;
        self
    }

    pub fn against_chirality(mut self) -> Self {
        self.against_chirality = true;
        self
    }

    pub fn max_search(mut self, limit: u8) -> Self {
        self.max_search = Some(limit);
        self
    }

    pub fn max_count(mut self, limit: u8) -> Self {
        self.max_count = Some(limit);
        self
    }
}

/// Read-only view of a neighboring particle.
pub struct NeighborView<'a> {
    system: &'a ParticleSystem,
    index: usize,
}

impl NeighborView<'_> {
    pub fn id(&self) -> usize {
        self.index
    }

    pub fn is_expanded(&self) -> bool {
        self.system.particles[self.index].is_expanded()
    }

    pub fn attr(&self, name: &str) -> Result<AttrValue, InvalidAction> {
        self.system.particles[self.index].attrs.get(name)
    }
}

/// The window an algorithm callback has onto its particle.
pub struct ParticleView<'a> {
    system: &'a mut ParticleSystem,
    index: usize,
    phase: Phase,
}

impl<'a> ParticleView<'a> {
    pub(crate) fn new(system: &'a mut ParticleSystem, index: usize, phase: Phase) -> Self {
        ParticleView {
            system,
            index,
            phase,
        }
    }

    fn me(&self) -> &Particle {
        &self.system.particles[self.index]
    }

    fn me_mut(&mut self) -> &mut Particle {
        &mut self.system.particles[self.index]
    }

    fn require_phase(&self, phase: Phase) -> Result<(), InvalidAction> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(InvalidAction::WrongPhase(self.phase.name()))
        }
    }

    fn to_global(&self, local_dir: Direction) -> Direction {
        let me = self.me();
        local_dir.to_global(me.compass(), me.chirality())
    }

    /// The global label of the edge leaving the given half in the given
    /// local direction.
    fn global_label(&self, local_dir: Direction, from_head: bool) -> Result<u8, InvalidAction> {
        if !local_dir.is_cardinal() {
            return Err(InvalidAction::NotCardinal(local_dir));
        }
        let global = self.to_global(local_dir);
        self.me()
            .label_in_direction(global, from_head)
            .ok_or(InvalidAction::SelfDirected)
    }

    /// The node reached in a local direction, `None` when the direction is
    /// invalid or points into the particle itself.
    fn target_node(&self, local_dir: Direction, from_head: bool) -> Option<GridPos> {
        if !local_dir.is_cardinal() {
            return None;
        }
        let me = self.me();
        let origin = if from_head || !me.is_expanded() {
            me.head()
        } else {
            me.tail()
        };
        let target = origin.neighbor(self.to_global(local_dir), 1);
        if me.is_expanded() && (target == me.head() || target == me.tail()) {
            return None;
        }
        Some(target)
    }

    // ---- identity and geometry ----

    /// The particle's stable arena index.
    pub fn id(&self) -> usize {
        self.index
    }

    pub fn is_expanded(&self) -> bool {
        self.me().is_expanded()
    }

    pub fn is_contracted(&self) -> bool {
        !self.is_expanded()
    }

    /// The head direction in the particle's local compass, `None` while
    /// contracted.
    pub fn head_direction(&self) -> Option<Direction> {
        let me = self.me();
        me.head_direction()
            .map(|d| d.to_local(me.compass(), me.chirality()))
    }

    pub fn chirality(&self) -> Chirality {
        self.me().chirality()
    }

    pub fn is_anchor(&self) -> bool {
        self.system.anchor == self.index
    }

    // ---- attributes ----

    pub fn attr(&self, name: &str) -> Result<AttrValue, InvalidAction> {
        self.me().attrs.get(name)
    }

    pub fn attr_bool(&self, name: &str) -> Result<bool, InvalidAction> {
        self.attr(name)?
            .as_bool()
            .ok_or_else(|| InvalidAction::AttributeKindMismatch(name.to_string()))
    }

    pub fn attr_int(&self, name: &str) -> Result<i64, InvalidAction> {
        self.attr(name)?
            .as_int()
            .ok_or_else(|| InvalidAction::AttributeKindMismatch(name.to_string()))
    }

    pub fn attr_dir(&self, name: &str) -> Result<Option<Direction>, InvalidAction> {
        self.attr(name)?
            .as_dir()
            .ok_or_else(|| InvalidAction::AttributeKindMismatch(name.to_string()))
    }

    pub fn attr_enum(&self, name: &str) -> Result<u8, InvalidAction> {
        self.attr(name)?
            .as_enum()
            .ok_or_else(|| InvalidAction::AttributeKindMismatch(name.to_string()))
    }

    pub fn set_attr(&mut self, name: &str, value: AttrValue) -> Result<(), InvalidAction> {
        self.me_mut().attrs.set(name, value)
    }

    // ---- neighbor queries ----

    pub fn has_neighbor_at(&self, local_dir: Direction, from_head: bool) -> bool {
        self.get_neighbor_at(local_dir, from_head).is_some()
    }

    pub fn get_neighbor_at(&self, local_dir: Direction, from_head: bool) -> Option<Neighbor> {
        let target = self.target_node(local_dir, from_head)?;
        match self.system.position_map.get(&target)? {
            &Entity::Particle(j) if j != self.index => Some(Neighbor {
                index: j,
                local_dir,
                at_head: from_head || !self.me().is_expanded(),
                neighbor_is_head: target == self.system.particles[j].head(),
            }),
            _ => None,
        }
    }

    /// Whether the node in the given direction holds a neighbor's head.
    pub fn is_head_at(&self, local_dir: Direction, from_head: bool) -> bool {
        self.get_neighbor_at(local_dir, from_head)
            .is_some_and(|n| n.neighbor_is_head)
    }

    /// Whether the node in the given direction holds a neighbor's tail.
    pub fn is_tail_at(&self, local_dir: Direction, from_head: bool) -> bool {
        let Some(target) = self.target_node(local_dir, from_head) else {
            return false;
        };
        match self.system.position_map.get(&target) {
            Some(&Entity::Particle(j)) if j != self.index => {
                target == self.system.particles[j].tail()
            }
            _ => false,
        }
    }

    pub fn has_object_at(&self, local_dir: Direction, from_head: bool) -> bool {
        self.get_object_at(local_dir, from_head).is_some()
    }

    /// The arena index of the object in the given direction, if any.
    pub fn get_object_at(&self, local_dir: Direction, from_head: bool) -> Option<usize> {
        let target = self.target_node(local_dir, from_head)?;
        match self.system.position_map.get(&target)? {
            &Entity::Object(o) => Some(o),
            _ => None,
        }
    }

    /// A read-only view of a previously found neighbor.
    pub fn neighbor_view(&self, neighbor: Neighbor) -> NeighborView<'_> {
        NeighborView {
            system: self.system,
            index: neighbor.index,
        }
    }

    /// Walks the boundary labels starting at a local direction and collects
    /// the neighbors found, each one exactly once.
    pub fn find_neighbors(&self, search: NeighborSearch) -> Vec<Neighbor> {
        self.find_neighbors_with(search, |_| true)
    }

    /// Like [`find_neighbors`](Self::find_neighbors), keeping only neighbors
    /// the predicate accepts; `max_count` counts accepted neighbors.
    pub fn find_neighbors_with(
        &self,
        search: NeighborSearch,
        predicate: impl Fn(&NeighborView<'_>) -> bool,
    ) -> Vec<Neighbor> {
        let me = self.me();
        let expanded = me.is_expanded();
        let label_total = me.label_count();
        let local_head_dir = me
            .head_direction()
            .map(|d| d.to_local(me.compass(), me.chirality()));

        let from_head = search.from_head || !expanded;
        let Some(start) =
            labels::label_in_direction(search.start_dir, local_head_dir, from_head)
        else {
            warn!(
                "particle {}: neighbor search start {:?} does not leave the particle",
                self.index, search.start_dir
            );
            return Vec::new();
        };

        let limit = search.max_search.unwrap_or(label_total);
        if limit > label_total {
            warn!(
                "particle {}: neighbor search over {limit} positions revisits labels",
                self.index
            );
        }
        let step = if search.against_chirality { -1i32 } else { 1 };

        let mut found = Vec::new();
        let mut seen = Vec::new();
        for k in 0..limit {
            let label =
                (start as i32 + step * k as i32).rem_euclid(label_total as i32) as u8;
            let local_dir = labels::direction_of_label(label, local_head_dir);
            let at_head = labels::is_head_label(label, expanded);
            let Some(target) = self.target_node(local_dir, at_head) else {
                continue;
            };
            let Some(&Entity::Particle(j)) = self.system.position_map.get(&target) else {
                continue;
            };
            if j == self.index || seen.contains(&j) {
                continue;
            }
            seen.push(j);
            let view = NeighborView {
                system: self.system,
                index: j,
            };
            if !predicate(&view) {
                continue;
            }
            found.push(Neighbor {
                index: j,
                local_dir,
                at_head,
                neighbor_is_head: target == self.system.particles[j].head(),
            });
            if search.max_count.is_some_and(|max| found.len() >= max as usize) {
                break;
            }
        }
        found
    }

    // ---- action schedulers ----

    fn schedule(&mut self, action: Action) {
        let index = self.index;
        let me = self.me_mut();
        if me.action.is_some() {
            warn!("particle {index} replaces its already scheduled action");
        }
        me.action = Some(action);
    }

    /// Schedules an expansion in the given local direction; the new node
    /// becomes the head.
    pub fn expand(&mut self, local_dir: Direction) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Move)?;
        if self.me().is_expanded() {
            return Err(InvalidAction::AlreadyExpanded);
        }
        if !local_dir.is_cardinal() {
            return Err(InvalidAction::NotCardinal(local_dir));
        }
        let global = self.to_global(local_dir);
        self.schedule(Action::Expand(global));
        Ok(())
    }

    /// Schedules a contraction into the head node.
    pub fn contract_head(&mut self) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Move)?;
        if !self.me().is_expanded() {
            return Err(InvalidAction::AlreadyContracted);
        }
        self.schedule(Action::ContractHead);
        Ok(())
    }

    /// Schedules a contraction into the tail node.
    pub fn contract_tail(&mut self) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Move)?;
        if !self.me().is_expanded() {
            return Err(InvalidAction::AlreadyContracted);
        }
        self.schedule(Action::ContractTail);
        Ok(())
    }

    /// Schedules a push handover into the expanded neighbor in the given
    /// local direction.
    pub fn push_handover(&mut self, local_dir: Direction) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Move)?;
        if self.me().is_expanded() {
            return Err(InvalidAction::AlreadyExpanded);
        }
        if !local_dir.is_cardinal() {
            return Err(InvalidAction::NotCardinal(local_dir));
        }
        let global = self.to_global(local_dir);
        let target = self.me().head().neighbor(global, 1);
        match self.system.position_map.get(&target).copied() {
            Some(Entity::Particle(j)) => {
                if !self.system.particles[j].is_expanded() {
                    return Err(InvalidAction::IncompatiblePartner);
                }
                self.schedule(Action::Push(global));
                Ok(())
            }
            _ => Err(InvalidAction::NoHandoverPartner),
        }
    }

    /// Schedules a pull handover that contracts into the head; the partner
    /// is the contracted neighbor in the given local direction from the
    /// tail, which expands into the vacated tail node.
    pub fn pull_handover_head(&mut self, local_dir: Direction) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Move)?;
        if !self.me().is_expanded() {
            return Err(InvalidAction::AlreadyContracted);
        }
        if !local_dir.is_cardinal() {
            return Err(InvalidAction::NotCardinal(local_dir));
        }
        let global = self.to_global(local_dir);
        let partner = self.me().tail().neighbor(global, 1);
        if partner == self.me().head() {
            return Err(InvalidAction::SelfDirected);
        }
        match self.system.position_map.get(&partner).copied() {
            Some(Entity::Particle(j)) => {
                if self.system.particles[j].is_expanded() {
                    return Err(InvalidAction::IncompatiblePartner);
                }
                self.schedule(Action::PullHead(global));
                Ok(())
            }
            _ => Err(InvalidAction::NoHandoverPartner),
        }
    }

    /// Schedules a pull handover that contracts into the tail; the partner
    /// is the contracted neighbor in the given local direction from the
    /// head, which expands into the vacated head node.
    pub fn pull_handover_tail(&mut self, local_dir: Direction) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Move)?;
        if !self.me().is_expanded() {
            return Err(InvalidAction::AlreadyContracted);
        }
        if !local_dir.is_cardinal() {
            return Err(InvalidAction::NotCardinal(local_dir));
        }
        let global = self.to_global(local_dir);
        let partner = self.me().head().neighbor(global, 1);
        if partner == self.me().tail() {
            return Err(InvalidAction::SelfDirected);
        }
        match self.system.position_map.get(&partner).copied() {
            Some(Entity::Particle(j)) => {
                if self.system.particles[j].is_expanded() {
                    return Err(InvalidAction::IncompatiblePartner);
                }
                self.schedule(Action::PullTail(global));
                Ok(())
            }
            _ => Err(InvalidAction::NoHandoverPartner),
        }
    }

    // ---- bond overrides ----

    /// Releases the bond on the edge in the given local direction. Touching
    /// any bond flag puts the particle in manual bond mode for this round.
    pub fn release_bond_at(&mut self, local_dir: Direction, from_head: bool) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Move)?;
        let label = self.global_label(local_dir, from_head)?;
        self.me_mut().overrides.released |= 1 << label;
        Ok(())
    }

    /// Marks the bond as transferring with the particle's moving half.
    pub fn mark_bond_at(&mut self, local_dir: Direction, from_head: bool) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Move)?;
        let label = self.global_label(local_dir, from_head)?;
        self.me_mut().overrides.marked |= 1 << label;
        Ok(())
    }

    /// Hides the bond from the graphics stream; purely visual.
    pub fn hide_bond_at(&mut self, local_dir: Direction, from_head: bool) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Move)?;
        let label = self.global_label(local_dir, from_head)?;
        self.me_mut().overrides.hidden |= 1 << label;
        Ok(())
    }

    // ---- pins and signals ----

    pub fn pins_per_edge(&self) -> u8 {
        self.system.pins_per_edge
    }

    /// The pin configuration currently in effect.
    pub fn pin_configuration(&self) -> &PinConfiguration {
        &self.me().pins
    }

    pub fn partition_set_count(&self) -> usize {
        self.me().pins.set_count()
    }

    /// A fresh singleton configuration matching the current shape, the
    /// usual starting point for building this round's configuration.
    pub fn new_singleton_configuration(&self) -> PinConfiguration {
        PinConfiguration::singleton(self.system.pins_per_edge, self.me().is_expanded())
    }

    /// A fresh configuration joining every pin into one partition set.
    pub fn new_unified_configuration(&self) -> PinConfiguration {
        PinConfiguration::unified(self.system.pins_per_edge, self.me().is_expanded())
    }

    /// The engine-frame pin on the edge in the given local direction at the
    /// given local offset. Offsets count along the particle's own rotation
    /// sense, so clockwise particles mirror.
    pub fn pin_at(
        &self,
        local_dir: Direction,
        from_head: bool,
        offset: u8,
    ) -> Result<PinIndex, InvalidAction> {
        let pins_per_edge = self.system.pins_per_edge;
        if offset >= pins_per_edge {
            return Err(InvalidAction::InvalidPinOffset(offset));
        }
        let label = self.global_label(local_dir, from_head)?;
        let mirrored = match self.me().chirality() {
            Chirality::CounterClockwise => offset,
            Chirality::Clockwise => pins_per_edge - 1 - offset,
        };
        Ok(label * pins_per_edge + mirrored)
    }

    /// Replaces the pin configuration at the end of this beep phase.
    pub fn set_pin_configuration(&mut self, config: PinConfiguration) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Beep)?;
        let me = self.me();
        if config.labels() != me.label_count()
            || config.pins_per_edge() != self.system.pins_per_edge
        {
            return Err(InvalidAction::MismatchedPinConfiguration);
        }
        self.me_mut().planned_pins = Some(config);
        Ok(())
    }

    /// Plans a beep on a partition set of the configuration that will be
    /// current at delivery (the planned one, or the current one if none was
    /// planned this round).
    pub fn plan_beep_on(&mut self, set: usize) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Beep)?;
        let me = self.me_mut();
        if me.planned_pins.is_none() {
            me.planned_pins = Some(me.pins.clone());
        }
        let Some(config) = me.planned_pins.as_mut() else {
            unreachable!("planned configuration was just installed");
        };
        if set >= config.set_count() {
            return Err(InvalidAction::InvalidPartitionSet(set));
        }
        config.plan_beep(set);
        Ok(())
    }

    /// Plans a message on a partition set, same addressing as
    /// [`plan_beep_on`](Self::plan_beep_on).
    pub fn plan_message_on(&mut self, set: usize, message: Message) -> Result<(), InvalidAction> {
        self.require_phase(Phase::Beep)?;
        let me = self.me_mut();
        if me.planned_pins.is_none() {
            me.planned_pins = Some(me.pins.clone());
        }
        let Some(config) = me.planned_pins.as_mut() else {
            unreachable!("planned configuration was just installed");
        };
        if set >= config.set_count() {
            return Err(InvalidAction::InvalidPartitionSet(set));
        }
        config.plan_message(set, message);
        Ok(())
    }

    /// Whether the last beep phase delivered a beep on the given partition
    /// set.
    pub fn received_beep_on(&self, set: usize) -> bool {
        self.me().received.beep_on(set)
    }

    pub fn received_message_on(&self, set: usize) -> Option<&Message> {
        self.me().received.message_on(set)
    }

    pub fn any_beep_received(&self) -> bool {
        self.me().received.any_beep()
    }
}
