//! Algorithm-defined particle attributes.
//!
//! Algorithms declare their per-particle state as named attributes with a
//! default value; the engine owns the storage so that every attribute is
//! recorded in a value history and participates in replay and save states
//! without the algorithm doing anything.

use crate::error::InvalidAction;
use crate::grid::Direction;
use crate::history::{ReplayHistory, ValueHistory};
use serde::{Deserialize, Serialize};

/// The value kinds an attribute can hold. `Enum` carries the discriminant of
/// an algorithm-defined enumeration; the engine only stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Dir(Option<Direction>),
    Enum(u8),
}

impl AttrValue {
    /// Whether two values are of the same kind; assignments may change the
    /// value but never the kind declared at registration.
    pub fn same_kind(self, other: AttrValue) -> bool {
        matches!(
            (self, other),
            (AttrValue::Bool(_), AttrValue::Bool(_))
                | (AttrValue::Int(_), AttrValue::Int(_))
                | (AttrValue::Dir(_), AttrValue::Dir(_))
                | (AttrValue::Enum(_), AttrValue::Enum(_))
        )
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_dir(self) -> Option<Option<Direction>> {
        match self {
            AttrValue::Dir(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_enum(self) -> Option<u8> {
        match self {
            AttrValue::Enum(e) => Some(e),
            _ => None,
        }
    }
}

/// Named attribute storage: working values plus one history per attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeStore {
    names: Vec<String>,
    values: Vec<AttrValue>,
    histories: Vec<ValueHistory<AttrValue>>,
}

impl AttributeStore {
    pub fn new(defaults: &[(&'static str, AttrValue)], round: u32) -> Self {
        AttributeStore {
            names: defaults.iter().map(|(n, _)| (*n).to_string()).collect(),
            values: defaults.iter().map(|&(_, v)| v).collect(),
            histories: defaults
                .iter()
                .map(|&(_, v)| ValueHistory::new(v, round))
                .collect(),
        }
    }

    /// Rebuilds a store from saved histories, working values at the latest
    /// round.
    pub fn from_histories(entries: Vec<(String, ValueHistory<AttrValue>)>) -> Self {
        let mut store = AttributeStore {
            names: Vec::with_capacity(entries.len()),
            values: Vec::with_capacity(entries.len()),
            histories: Vec::with_capacity(entries.len()),
        };
        for (name, history) in entries {
            store.names.push(name);
            store.values.push(*history.last_value());
            store.histories.push(history);
        }
        store
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn get(&self, name: &str) -> Result<AttrValue, InvalidAction> {
        self.index_of(name)
            .map(|i| self.values[i])
            .ok_or_else(|| InvalidAction::UnknownAttribute(name.to_string()))
    }

    pub fn set(&mut self, name: &str, value: AttrValue) -> Result<(), InvalidAction> {
        let Some(i) = self.index_of(name) else {
            return Err(InvalidAction::UnknownAttribute(name.to_string()));
        };
        if !self.values[i].same_kind(value) {
            return Err(InvalidAction::AttributeKindMismatch(name.to_string()));
        }
        self.values[i] = value;
        Ok(())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Records every working value for `round`.
    pub fn commit(&mut self, round: u32) {
        for (history, &value) in self.histories.iter_mut().zip(&self.values) {
            history.record(value, round);
        }
    }

    /// Reloads every working value from the history marker.
    pub fn restore_from_marker(&mut self) {
        for (value, history) in self.values.iter_mut().zip(&self.histories) {
            *value = *history.marked_value();
        }
    }

    /// Hands out the `(name, history)` pairs for the save-state record.
    pub fn to_records(&self) -> Vec<(String, ValueHistory<AttrValue>)> {
        self.names
            .iter()
            .cloned()
            .zip(self.histories.iter().cloned())
            .collect()
    }
}

impl ReplayHistory for AttributeStore {
    fn set_marker(&mut self, round: u32) {
        for history in &mut self.histories {
            history.set_marker(round);
        }
    }

    fn continue_tracking(&mut self) {
        for history in &mut self.histories {
            history.continue_tracking();
        }
    }

    fn cut_off_at_marker(&mut self) {
        for history in &mut self.histories {
            history.cut_off_at_marker();
        }
    }

    fn shift_timescale(&mut self, offset: i32) {
        for history in &mut self.histories {
            history.shift_timescale(offset);
        }
    }
}
