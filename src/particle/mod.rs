//! # Particle Module - Amoebot State
//!
//! A particle occupies one node (contracted) or two adjacent nodes
//! (expanded, the head plus a tail reached against the head direction). Its
//! per-round state (position, expansion, pin configuration, received
//! signals, bond flags and the algorithm's attributes) is kept twice: as
//! plain working fields the engine mutates during a round, and as value
//! histories written once per committed round. Replay and rollback both
//! reduce to reloading the working fields from the histories.

// Algorithm-defined attribute storage
pub mod attributes;
// Unit tests
pub mod tests;

pub use attributes::{AttrValue, AttributeStore};

use crate::grid::labels::{self, label_count};
use crate::grid::{Chirality, Direction, GridPos, GridVec};
use crate::history::{ReplayHistory, ValueHistory};
use crate::pins::{PinConfiguration, ReceivedSignals};
use serde::{Deserialize, Serialize};

/// The movement a particle scheduled during its move activation. Directions
/// are global cardinals; the view translates from the algorithm's local
/// compass when the action is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Expand the contracted particle; the new node becomes the head.
    Expand(Direction),
    /// Contract the expanded particle into its head node.
    ContractHead,
    /// Contract the expanded particle into its tail node.
    ContractTail,
    /// Push handover: expand into the neighbor's node while the neighbor
    /// contracts away from it.
    Push(Direction),
    /// Pull handover: contract into the head while the partner adjacent to
    /// the tail (in the stored direction) expands into the vacated node.
    PullHead(Direction),
    /// Pull handover: contract into the tail, partner adjacent to the head.
    PullTail(Direction),
}

impl Action {
    /// Whether the action removes the particle's tail or head, i.e. is any
    /// form of contraction.
    pub fn is_contraction(self) -> bool {
        matches!(
            self,
            Action::ContractHead | Action::ContractTail | Action::PullHead(_) | Action::PullTail(_)
        )
    }

    pub fn is_expansion(self) -> bool {
        matches!(self, Action::Expand(_) | Action::Push(_))
    }
}

/// Per-label bond flags over the global labels, packed as bitmasks. Bit `l`
/// describes the bond on label `l`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondState {
    pub active: u16,
    pub marked: u16,
    pub visible: u16,
}

impl BondState {
    /// The default for a round: every bond active and visible, none marked.
    pub fn all_active(labels: u8) -> Self {
        let mask = (1u16 << labels) - 1;
        BondState {
            active: mask,
            marked: 0,
            visible: mask,
        }
    }

    #[inline]
    pub fn is_active(self, label: u8) -> bool {
        self.active & (1 << label) != 0
    }

    #[inline]
    pub fn is_marked(self, label: u8) -> bool {
        self.marked & (1 << label) != 0
    }

    #[inline]
    pub fn is_visible(self, label: u8) -> bool {
        self.visible & (1 << label) != 0
    }
}

/// The bond adjustments an algorithm requested this round, applied on top of
/// the automatically computed flags. A particle that recorded none of these
/// is in automatic-bonds mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BondOverrides {
    pub released: u16,
    pub marked: u16,
    pub hidden: u16,
}

impl BondOverrides {
    pub fn any(self) -> bool {
        self.released != 0 || self.marked != 0 || self.hidden != 0
    }
}

/// One amoebot of the system.
///
/// Chirality and compass are fixed at creation; everything else varies per
/// round. The `head_dir` points from tail to head and is `None` while
/// contracted.
#[derive(Debug, Clone)]
pub struct Particle {
    chirality: Chirality,
    compass: Direction,

    // working state for the current round
    pub(crate) head: GridPos,
    pub(crate) head_dir: Option<Direction>,
    pub(crate) pins: PinConfiguration,
    pub(crate) received: ReceivedSignals,
    pub(crate) attrs: AttributeStore,

    // committed histories
    pub(crate) head_history: ValueHistory<GridPos>,
    pub(crate) head_dir_history: ValueHistory<Option<Direction>>,
    pub(crate) pin_history: ValueHistory<PinConfiguration>,
    pub(crate) received_history: ValueHistory<ReceivedSignals>,
    pub(crate) bond_history: ValueHistory<BondState>,

    // round transients, reset by `begin_round`
    pub(crate) action: Option<Action>,
    pub(crate) bonds: BondState,
    pub(crate) overrides: BondOverrides,
    pub(crate) planned_pins: Option<PinConfiguration>,
    pub(crate) is_head_origin: bool,
    pub(crate) movement_offset: GridVec,
    pub(crate) jm_offset: Option<GridVec>,
}

impl Particle {
    pub(crate) fn new(
        head: GridPos,
        head_dir: Option<Direction>,
        chirality: Chirality,
        compass: Direction,
        pins_per_edge: u8,
        attrs: AttributeStore,
        round: u32,
    ) -> Self {
        let pins = PinConfiguration::singleton(pins_per_edge, head_dir.is_some());
        let received = ReceivedSignals::none(pins.set_count());
        Particle {
            chirality,
            compass,
            head,
            head_dir,
            head_history: ValueHistory::new(head, round),
            head_dir_history: ValueHistory::new(head_dir, round),
            pin_history: ValueHistory::new(pins.clone(), round),
            received_history: ValueHistory::new(received.clone(), round),
            bond_history: ValueHistory::new(BondState::all_active(label_count(head_dir.is_some())), round),
            pins,
            received,
            attrs,
            action: None,
            bonds: BondState::all_active(label_count(head_dir.is_some())),
            overrides: BondOverrides::default(),
            planned_pins: None,
            is_head_origin: true,
            movement_offset: GridVec::ZERO,
            jm_offset: None,
        }
    }

    /// Rebuilds a particle from saved histories; the working state is the
    /// latest recorded round.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_histories(
        chirality: Chirality,
        compass: Direction,
        head_history: ValueHistory<GridPos>,
        head_dir_history: ValueHistory<Option<Direction>>,
        pin_history: ValueHistory<PinConfiguration>,
        received_history: ValueHistory<ReceivedSignals>,
        bond_history: ValueHistory<BondState>,
        attrs: AttributeStore,
    ) -> Self {
        let head = *head_history.last_value();
        let head_dir = *head_dir_history.last_value();
        let pins = pin_history.last_value().clone();
        let received = received_history.last_value().clone();
        let bonds = *bond_history.last_value();
        Particle {
            chirality,
            compass,
            head,
            head_dir,
            pins,
            received,
            attrs,
            head_history,
            head_dir_history,
            pin_history,
            received_history,
            bond_history,
            action: None,
            bonds,
            overrides: BondOverrides::default(),
            planned_pins: None,
            is_head_origin: head_dir.is_none(),
            movement_offset: GridVec::ZERO,
            jm_offset: None,
        }
    }

    pub fn chirality(&self) -> Chirality {
        self.chirality
    }

    /// The global direction the particle's local east points to.
    pub fn compass(&self) -> Direction {
        self.compass
    }

    pub fn is_expanded(&self) -> bool {
        self.head_dir.is_some()
    }

    pub fn head(&self) -> GridPos {
        self.head
    }

    /// The global head direction (tail to head), `None` while contracted.
    pub fn head_direction(&self) -> Option<Direction> {
        self.head_dir
    }

    /// The tail node; equals the head while contracted.
    pub fn tail(&self) -> GridPos {
        match self.head_dir {
            Some(hd) => self.head.neighbor(hd.opposite(), 1),
            None => self.head,
        }
    }

    /// The nodes the particle occupies, head first.
    pub fn occupied_nodes(&self) -> Vec<GridPos> {
        match self.head_dir {
            Some(_) => vec![self.head, self.tail()],
            None => vec![self.head],
        }
    }

    pub fn label_count(&self) -> u8 {
        label_count(self.is_expanded())
    }

    /// Whether the labeled edge leaves the head node.
    pub fn label_is_head(&self, label: u8) -> bool {
        labels::is_head_label(label, self.is_expanded())
    }

    /// The node the labeled edge leaves from.
    pub fn node_of_label(&self, label: u8) -> GridPos {
        if self.label_is_head(label) {
            self.head
        } else {
            self.tail()
        }
    }

    /// The global direction of the labeled edge.
    pub fn direction_of_label(&self, label: u8) -> Direction {
        labels::direction_of_label(label, self.head_dir)
    }

    /// The global label of the edge leaving the given half in the given
    /// global direction.
    pub fn label_in_direction(&self, dir: Direction, from_head: bool) -> Option<u8> {
        labels::label_in_direction(dir, self.head_dir, from_head)
    }

    /// The rigid displacement the joint movement imposed in the current
    /// round, `None` before movement resolution.
    pub fn joint_movement_offset(&self) -> Option<GridVec> {
        self.jm_offset
    }

    /// The attributes registered by the algorithm.
    pub fn attribute(&self, name: &str) -> Option<AttrValue> {
        self.attrs.get(name).ok()
    }

    /// The signals received in the last completed beep phase.
    pub fn received(&self) -> &ReceivedSignals {
        &self.received
    }

    pub fn pin_configuration(&self) -> &PinConfiguration {
        &self.pins
    }

    /// Clears the per-round transients at the start of a move phase.
    pub(crate) fn begin_round(&mut self) {
        self.action = None;
        self.overrides = BondOverrides::default();
        self.planned_pins = None;
        self.is_head_origin = !self.is_expanded();
        self.movement_offset = GridVec::ZERO;
        self.jm_offset = None;
        self.bonds = BondState::all_active(self.label_count());
    }

    /// Records the working state into the histories for `round`.
    pub(crate) fn commit(&mut self, round: u32) {
        self.head_history.record(self.head, round);
        self.head_dir_history.record(self.head_dir, round);
        self.pin_history.record(self.pins.clone(), round);
        self.received_history.record(self.received.clone(), round);
        self.bond_history.record(self.bonds, round);
        self.attrs.commit(round);
    }

    /// Moves every history marker to `round` and reloads the working state
    /// from it. Transients are reset; a restored particle looks exactly like
    /// it did right after that round's commit.
    pub(crate) fn restore_to(&mut self, round: u32) {
        self.set_marker(round);
        self.head = *self.head_history.marked_value();
        self.head_dir = *self.head_dir_history.marked_value();
        self.pins = self.pin_history.marked_value().clone();
        self.received = self.received_history.marked_value().clone();
        self.bonds = *self.bond_history.marked_value();
        self.attrs.restore_from_marker();
        self.action = None;
        self.overrides = BondOverrides::default();
        self.planned_pins = None;
        self.is_head_origin = !self.is_expanded();
        self.movement_offset = GridVec::ZERO;
        self.jm_offset = None;
    }
}

impl ReplayHistory for Particle {
    fn set_marker(&mut self, round: u32) {
        self.head_history.set_marker(round);
        self.head_dir_history.set_marker(round);
        self.pin_history.set_marker(round);
        self.received_history.set_marker(round);
        self.bond_history.set_marker(round);
        self.attrs.set_marker(round);
    }

    fn continue_tracking(&mut self) {
        self.head_history.continue_tracking();
        self.head_dir_history.continue_tracking();
        self.pin_history.continue_tracking();
        self.received_history.continue_tracking();
        self.bond_history.continue_tracking();
        self.attrs.continue_tracking();
    }

    fn cut_off_at_marker(&mut self) {
        self.head_history.cut_off_at_marker();
        self.head_dir_history.cut_off_at_marker();
        self.pin_history.cut_off_at_marker();
        self.received_history.cut_off_at_marker();
        self.bond_history.cut_off_at_marker();
        self.attrs.cut_off_at_marker();
    }

    fn shift_timescale(&mut self, offset: i32) {
        self.head_history.shift_timescale(offset);
        self.head_dir_history.shift_timescale(offset);
        self.pin_history.shift_timescale(offset);
        self.received_history.shift_timescale(offset);
        self.bond_history.shift_timescale(offset);
        self.attrs.shift_timescale(offset);
    }
}
