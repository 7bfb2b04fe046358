//! # Object Module - Rigid Passive Structures
//!
//! An object is a rigid set of grid cells with a position. It never acts,
//! but particles bond to it and joint movements drag it as one piece; its
//! position therefore has a history like any particle attribute.

use crate::grid::{GridPos, GridVec};
use crate::history::{ReplayHistory, ValueHistory};

/// A rigid multi-cell structure. The cell shape is immutable and stored
/// relative to the position; `cells` always contains `GridVec::ZERO`.
#[derive(Debug, Clone)]
pub struct Object {
    cells: Vec<GridVec>,
    pub(crate) position: GridPos,
    pub(crate) position_history: ValueHistory<GridPos>,
    /// Displacement accumulated during the current joint-movement pass.
    pub(crate) jm_offset: Option<GridVec>,
}

impl Object {
    pub(crate) fn new(position: GridPos, mut cells: Vec<GridVec>, round: u32) -> Self {
        if !cells.contains(&GridVec::ZERO) {
            cells.push(GridVec::ZERO);
        }
        cells.sort_unstable_by_key(|c| (c.x, c.y));
        cells.dedup();
        Object {
            cells,
            position,
            position_history: ValueHistory::new(position, round),
            jm_offset: None,
        }
    }

    /// Rebuilds an object from its saved position history.
    pub(crate) fn from_history(cells: Vec<GridVec>, position_history: ValueHistory<GridPos>) -> Self {
        let position = *position_history.last_value();
        let mut object = Object::new(position, cells, position_history.last_round());
        object.position_history = position_history;
        object
    }

    pub fn position(&self) -> GridPos {
        self.position
    }

    /// The relative cell shape.
    pub fn cells(&self) -> &[GridVec] {
        &self.cells
    }

    /// The rigid displacement the joint movement imposed in the current
    /// round, `None` before movement resolution.
    pub fn joint_movement_offset(&self) -> Option<GridVec> {
        self.jm_offset
    }

    /// The grid nodes currently covered by the object.
    pub fn occupied_nodes(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.cells.iter().map(move |&c| self.position + c)
    }

    pub(crate) fn commit(&mut self, round: u32) {
        self.position_history.record(self.position, round);
    }

    pub(crate) fn restore_to(&mut self, round: u32) {
        self.position_history.set_marker(round);
        self.position = *self.position_history.marked_value();
        self.jm_offset = None;
    }
}

impl ReplayHistory for Object {
    fn set_marker(&mut self, round: u32) {
        self.position_history.set_marker(round);
    }

    fn continue_tracking(&mut self) {
        self.position_history.continue_tracking();
    }

    fn cut_off_at_marker(&mut self) {
        self.position_history.cut_off_at_marker();
    }

    fn shift_timescale(&mut self, offset: i32) {
        self.position_history.shift_timescale(offset);
    }
}
