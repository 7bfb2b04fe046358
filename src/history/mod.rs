//! # History Module - Reversible Per-Round Value Tracking
//!
//! Every piece of state that varies from round to round is wrapped in a
//! [`ValueHistory`], a sorted sequence of `(round, value)` pairs with a
//! movable marker. The marker is what the replay layer steps around: setting
//! it to a past round makes [`ValueHistory::marked_value`] resolve to the
//! value that was effective then, without touching the recorded data.
//!
//! Consecutive equal values are collapsed, so a boolean that flips twice in a
//! thousand rounds costs three entries, not a thousand.
//!
//! ## Example Usage
//! ```
//! use amoebot_lib::history::ValueHistory;
//!
//! let mut h = ValueHistory::new(0u32, 0);
//! h.record(0, 1); // collapsed, same value
//! h.record(7, 2);
//! assert_eq!(*h.value_at(1), 0);
//! assert_eq!(*h.value_at(2), 7);
//! assert_eq!(*h.value_at(5), 7); // last value persists
//! ```


use serde::{Deserialize, Serialize};

/// The replay contract shared by every history-bearing type.
///
/// The particle system implements this by forwarding each primitive to every
/// per-attribute history, the anchor history and each object.
pub trait ReplayHistory {
    /// Moves the marker to `round`. Reads through `marked_value` (or the
    /// owner's working state) then resolve to the value effective at that
    /// round.
    fn set_marker(&mut self, round: u32);

    /// Moves the marker back to the latest recorded round.
    fn continue_tracking(&mut self);

    /// Discards everything recorded after the marker. Idempotent.
    fn cut_off_at_marker(&mut self);

    /// Shifts every recorded round number by `offset`.
    fn shift_timescale(&mut self, offset: i32);
}

/// A per-round value history with cut-off and replay support.
///
/// Invariant: `rounds` is strictly increasing, `rounds.len() == values.len()`
/// and both are non-empty. The cursor caches the entry index the marker
/// resolves to; it is rebuilt on deserialization by the first `set_marker`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueHistory<T> {
    rounds: Vec<u32>,
    values: Vec<T>,
    marker: u32,
    #[serde(skip)]
    cursor: usize,
}

/// Two histories are equal iff they recorded the same values for the same
/// rounds; the marker and its cursor are replay position, not data.
impl<T: PartialEq> PartialEq for ValueHistory<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rounds == other.rounds && self.values == other.values
    }
}

impl<T: Clone + PartialEq> ValueHistory<T> {
    /// Creates a history whose first entry is `initial`, effective from
    /// `round` on.
    pub fn new(initial: T, round: u32) -> Self {
        ValueHistory {
            rounds: vec![round],
            values: vec![initial],
            marker: round,
            cursor: 0,
        }
    }

    /// Appends a value for `round`.
    ///
    /// Recording the value already in effect is a no-op; recording a new
    /// value for the round of the last entry overwrites it. The marker
    /// follows the latest round so that a tracking system stays in sync.
    ///
    /// # Panics
    ///
    /// Panics if `round` lies before the last recorded round; history is
    /// append-only, rewinding goes through `cut_off_at_marker`.
    pub fn record(&mut self, value: T, round: u32) {
        let last_round = *self.rounds.last().expect("history is never empty");
        assert!(round >= last_round, "record out of order: {round} < {last_round}");

        if value == *self.values.last().expect("history is never empty") {
            // collapse consecutive duplicates
        } else if round == last_round {
            *self.values.last_mut().expect("history is never empty") = value;
        } else {
            self.rounds.push(round);
            self.values.push(value);
        }
        self.marker = round;
        self.cursor = self.rounds.len() - 1;
    }

    /// The value effective at `round`: the entry with the greatest recorded
    /// round not exceeding it. Rounds before the first entry resolve to the
    /// first value.
    pub fn value_at(&self, round: u32) -> &T {
        &self.values[self.index_for(round)]
    }

    /// The most recently recorded value.
    pub fn last_value(&self) -> &T {
        self.values.last().expect("history is never empty")
    }

    /// The round of the most recent entry.
    pub fn last_round(&self) -> u32 {
        *self.rounds.last().expect("history is never empty")
    }

    /// The value the marker currently resolves to.
    pub fn marked_value(&self) -> &T {
        &self.values[self.cursor]
    }

    /// The round the marker is set to.
    pub fn marker(&self) -> u32 {
        self.marker
    }

    /// Number of stored entries (after duplicate collapsing).
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn index_for(&self, round: u32) -> usize {
        match self.rounds.binary_search(&round) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        }
    }
}

impl<T: Clone + PartialEq> ReplayHistory for ValueHistory<T> {
    fn set_marker(&mut self, round: u32) {
        self.marker = round;
        self.cursor = self.index_for(round);
    }

    fn continue_tracking(&mut self) {
        self.marker = self.last_round();
        self.cursor = self.rounds.len() - 1;
    }

    fn cut_off_at_marker(&mut self) {
        // keep every entry recorded at or before the marker
        let keep = self.index_for(self.marker) + 1;
        self.rounds.truncate(keep);
        self.values.truncate(keep);
        self.cursor = keep - 1;
    }

    fn shift_timescale(&mut self, offset: i32) {
        for r in &mut self.rounds {
            let shifted = *r as i64 + offset as i64;
            debug_assert!(shifted >= 0, "timescale shift below round zero");
            *r = shifted.max(0) as u32;
        }
        let shifted = self.marker as i64 + offset as i64;
        self.marker = shifted.max(0) as u32;
    }
}
