//! # Pins Module - Pin Configurations and Partition Sets
//!
//! Each boundary edge of a particle carries a fixed number of pins. A
//! [`PinConfiguration`] partitions those pins into [`PartitionSet`]s; all
//! pins of a set share one electrical state, and the circuit layer connects
//! sets of bonded neighbors that share a pin pair across their common edge.
//!
//! Pin identity inside the engine is always expressed in a particle's global
//! frame: labels are global labels and edge offsets are counted in global
//! counter-clockwise order. The particle view mirrors offsets for clockwise
//! particles when translating an algorithm's local pin references, so the
//! engine-side matching rule across an edge is uniformly
//! `offset ↦ pins_per_edge − 1 − offset`.


use crate::grid::labels::label_count;
use serde::{Deserialize, Serialize};

/// A pin, identified as `label * pins_per_edge + offset`.
pub type PinIndex = u8;

/// An algorithm-defined byte string sent along a circuit.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message(Vec<u8>);

impl Message {
    pub fn new(bytes: Vec<u8>) -> Self {
        Message(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Message {
    fn from(bytes: Vec<u8>) -> Self {
        Message(bytes)
    }
}

/// Rendering hint for where a partition set should be drawn inside its
/// particle. Stored verbatim for the graphics sink, never interpreted by the
/// engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementHint {
    #[default]
    Automatic,
    Centered,
    /// Polar placement relative to the particle center.
    Polar {
        angle_deg: i16,
        radius_pct: u8,
    },
}

/// One equivalence class of pins, together with the signals the algorithm
/// planned on it for the upcoming beep delivery.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSet {
    pins: Vec<PinIndex>,
    pub beep_planned: bool,
    pub planned_message: Option<Message>,
    pub placement: PlacementHint,
}

impl PartitionSet {
    fn with_pins(pins: Vec<PinIndex>) -> Self {
        PartitionSet {
            pins,
            ..PartitionSet::default()
        }
    }

    pub fn pins(&self) -> &[PinIndex] {
        &self.pins
    }

    pub fn contains(&self, pin: PinIndex) -> bool {
        self.pins.binary_search(&pin).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    fn insert(&mut self, pin: PinIndex) {
        if let Err(i) = self.pins.binary_search(&pin) {
            self.pins.insert(i, pin);
        }
    }

    fn remove(&mut self, pin: PinIndex) {
        if let Ok(i) = self.pins.binary_search(&pin) {
            self.pins.remove(i);
        }
    }
}

/// A partition of a particle's pins for one round.
///
/// Set indices are stable for the lifetime of the configuration: merging
/// leaves the drained set in place (empty), so beeps planned on a set index
/// stay attached to the right set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinConfiguration {
    pins_per_edge: u8,
    labels: u8,
    /// pin index -> partition set index
    set_of_pin: Vec<u8>,
    sets: Vec<PartitionSet>,
}

impl PinConfiguration {
    /// The reset pattern: every pin in its own partition set.
    pub fn singleton(pins_per_edge: u8, expanded: bool) -> Self {
        let labels = label_count(expanded);
        let count = labels as usize * pins_per_edge as usize;
        PinConfiguration {
            pins_per_edge,
            labels,
            set_of_pin: (0..count as u8).collect(),
            sets: (0..count as u8)
                .map(|p| PartitionSet::with_pins(vec![p]))
                .collect(),
        }
    }

    /// All pins in a single partition set (a global circuit on every edge).
    pub fn unified(pins_per_edge: u8, expanded: bool) -> Self {
        let labels = label_count(expanded);
        let count = labels as usize * pins_per_edge as usize;
        PinConfiguration {
            pins_per_edge,
            labels,
            set_of_pin: vec![0; count],
            sets: vec![PartitionSet::with_pins((0..count as u8).collect())],
        }
    }

    pub fn pins_per_edge(&self) -> u8 {
        self.pins_per_edge
    }

    /// Number of labeled edges this configuration covers (6 or 10).
    pub fn labels(&self) -> u8 {
        self.labels
    }

    pub fn pin_count(&self) -> usize {
        self.set_of_pin.len()
    }

    /// The pin on `label` at `offset` (both in the global frame).
    ///
    /// # Panics
    ///
    /// Panics if label or offset are out of range.
    pub fn pin_index(&self, label: u8, offset: u8) -> PinIndex {
        assert!(label < self.labels, "label {label} out of range");
        assert!(offset < self.pins_per_edge, "pin offset {offset} out of range");
        label * self.pins_per_edge + offset
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn set(&self, index: usize) -> &PartitionSet {
        &self.sets[index]
    }

    pub fn sets(&self) -> &[PartitionSet] {
        &self.sets
    }

    /// The partition set the pin currently belongs to.
    pub fn set_index_of(&self, pin: PinIndex) -> usize {
        self.set_of_pin[pin as usize] as usize
    }

    /// Moves `pin` into the set with the given index.
    pub fn move_pin_to_set(&mut self, pin: PinIndex, set: usize) {
        assert!(set < self.sets.len(), "partition set {set} out of range");
        let old = self.set_index_of(pin);
        if old == set {
            return;
        }
        self.sets[old].remove(pin);
        self.sets[set].insert(pin);
        self.set_of_pin[pin as usize] = set as u8;
    }

    /// Moves the listed pins into a fresh partition set and returns its
    /// index.
    pub fn make_set(&mut self, pins: &[PinIndex]) -> usize {
        let index = self.sets.len();
        self.sets.push(PartitionSet::default());
        for &pin in pins {
            self.move_pin_to_set(pin, index);
        }
        index
    }

    /// Merges set `b` into set `a`; `b` stays behind empty so that set
    /// indices remain stable. Planned signals of `b` transfer onto `a`
    /// (beeps are OR-ed, the first non-null message wins).
    pub fn merge_sets(&mut self, a: usize, b: usize) -> usize {
        assert!(a < self.sets.len() && b < self.sets.len());
        if a == b {
            return a;
        }
        let pins = std::mem::take(&mut self.sets[b].pins);
        for &pin in &pins {
            self.set_of_pin[pin as usize] = a as u8;
        }
        let beep = std::mem::take(&mut self.sets[b].beep_planned);
        let message = self.sets[b].planned_message.take();
        let target = &mut self.sets[a];
        target.pins.extend(pins);
        target.pins.sort_unstable();
        target.beep_planned |= beep;
        if target.planned_message.is_none() {
            target.planned_message = message;
        }
        a
    }

    pub fn plan_beep(&mut self, set: usize) {
        self.sets[set].beep_planned = true;
    }

    pub fn plan_message(&mut self, set: usize, message: Message) {
        self.sets[set].planned_message = Some(message);
    }

    /// Clears planned beeps and messages, keeping the partition intact.
    pub fn clear_planned_signals(&mut self) {
        for set in &mut self.sets {
            set.beep_planned = false;
            set.planned_message = None;
        }
    }
}

/// The signals a particle received in the last beep phase, indexed by the
/// partition sets of the configuration that was current at delivery time.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedSignals {
    beeps: Vec<bool>,
    messages: Vec<Option<Message>>,
}

impl ReceivedSignals {
    pub fn none(set_count: usize) -> Self {
        ReceivedSignals {
            beeps: vec![false; set_count],
            messages: vec![None; set_count],
        }
    }

    pub(crate) fn push(&mut self, beep: bool, message: Option<Message>) {
        self.beeps.push(beep);
        self.messages.push(message);
    }

    pub fn set_count(&self) -> usize {
        self.beeps.len()
    }

    pub fn beep_on(&self, set: usize) -> bool {
        self.beeps.get(set).copied().unwrap_or(false)
    }

    pub fn message_on(&self, set: usize) -> Option<&Message> {
        self.messages.get(set).and_then(|m| m.as_ref())
    }

    pub fn any_beep(&self) -> bool {
        self.beeps.iter().any(|&b| b)
    }
}
