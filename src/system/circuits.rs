//! Circuit discovery and signal distribution.
//!
//! Partition sets of bonded neighbors that share a pin pair across their
//! common edge belong to the same circuit. Discovery walks the particles in
//! a BFS and merges partition sets with a union-find whose roots carry the
//! aggregated signals: beeps are OR-ed, and of several planned messages the
//! first one encountered in union order survives (deterministic, since both
//! the traversal and the union order are fixed).
//!
//! The pin pair across an edge mirrors the edge offset: pin `o` on one side
//! meets pin `pins_per_edge − 1 − o` on the other, because both particles
//! count offsets in their own global counter-clockwise order.

use crate::pins::{Message, ReceivedSignals};
use crate::system::{Entity, ParticleSystem};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// The outcome of circuit discovery for one round, also consumed by the
/// graphics stream for circuit coloring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitAssignment {
    /// For every particle, the circuit id of each of its partition sets.
    pub sets: Vec<Vec<usize>>,
    pub circuit_count: usize,
    /// Aggregated beep flag per circuit.
    pub beeps: Vec<bool>,
    /// Aggregated message per circuit.
    pub messages: Vec<Option<Message>>,
}

/// Plain union-find over the globally numbered partition sets.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        UnionFind {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Attaches `b`'s root under `a`'s and returns the surviving root, or
    /// `None` if the two were already united.
    fn union(&mut self, a: usize, b: usize) -> Option<(usize, usize)> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return None;
        }
        self.parent[rb] = ra;
        Some((ra, rb))
    }
}

impl ParticleSystem {
    /// Partitions all partition sets of the system into circuits and
    /// aggregates their planned signals.
    pub(crate) fn discover_circuits(&self) -> CircuitAssignment {
        let particle_count = self.particles.len();
        let pins_per_edge = self.pins_per_edge as usize;

        // global numbering of all partition sets
        let mut offsets = Vec::with_capacity(particle_count + 1);
        offsets.push(0usize);
        for particle in &self.particles {
            offsets.push(offsets.last().copied().unwrap_or(0) + particle.pin_configuration().set_count());
        }
        let total_sets = *offsets.last().unwrap_or(&0);

        let mut uf = UnionFind::new(total_sets);
        let mut beeps = Vec::with_capacity(total_sets);
        let mut messages: Vec<Option<Message>> = Vec::with_capacity(total_sets);
        for particle in &self.particles {
            for set in particle.pin_configuration().sets() {
                beeps.push(set.beep_planned);
                messages.push(set.planned_message.clone());
            }
        }

        // BFS over every component; sets of already-processed neighbors are
        // merged through the shared pin pairs
        let mut visited = vec![false; particle_count];
        let mut processed = vec![false; particle_count];
        let mut queue = VecDeque::new();
        for seed in 0..particle_count {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            queue.push_back(seed);
            while let Some(i) = queue.pop_front() {
                let particle = &self.particles[i];
                for label in 0..particle.label_count() {
                    let Some((Entity::Particle(j), reverse)) = self.bonded_neighbor(i, label)
                    else {
                        continue;
                    };
                    if !visited[j] {
                        visited[j] = true;
                        queue.push_back(j);
                    }
                    if !processed[j] {
                        continue;
                    }
                    let other = &self.particles[j];
                    for offset in 0..pins_per_edge {
                        let ours = label as usize * pins_per_edge + offset;
                        let theirs =
                            reverse as usize * pins_per_edge + (pins_per_edge - 1 - offset);
                        let a = offsets[i] + particle.pin_configuration().set_index_of(ours as u8);
                        let b = offsets[j] + other.pin_configuration().set_index_of(theirs as u8);
                        if let Some((root, merged)) = uf.union(a, b) {
                            let merged_beep = beeps[merged];
                            beeps[root] |= merged_beep;
                            let merged_message = messages[merged].take();
                            if messages[root].is_none() {
                                messages[root] = merged_message;
                            }
                        }
                    }
                }
                processed[i] = true;
            }
        }

        // compress roots into dense circuit ids in first-encounter order
        let mut circuit_of_root = vec![usize::MAX; total_sets];
        let mut circuit_beeps = Vec::new();
        let mut circuit_messages = Vec::new();
        let mut sets = Vec::with_capacity(particle_count);
        for i in 0..particle_count {
            let count = self.particles[i].pin_configuration().set_count();
            let mut ids = Vec::with_capacity(count);
            for s in 0..count {
                let root = uf.find(offsets[i] + s);
                if circuit_of_root[root] == usize::MAX {
                    circuit_of_root[root] = circuit_beeps.len();
                    circuit_beeps.push(beeps[root]);
                    circuit_messages.push(messages[root].clone());
                }
                ids.push(circuit_of_root[root]);
            }
            sets.push(ids);
        }

        CircuitAssignment {
            sets,
            circuit_count: circuit_beeps.len(),
            beeps: circuit_beeps,
            messages: circuit_messages,
        }
    }

    /// Writes each circuit's aggregated signals into the received buffers of
    /// every member particle, honoring the delivery switch.
    pub(crate) fn deliver_signals(&mut self, circuits: &CircuitAssignment) {
        let deliver = self.config.send_beeps_and_messages;
        for (i, particle) in self.particles.iter_mut().enumerate() {
            let set_count = particle.pin_configuration().set_count();
            if !deliver {
                particle.received = ReceivedSignals::none(set_count);
                continue;
            }
            let mut received = ReceivedSignals::default();
            for s in 0..set_count {
                let circuit = circuits.sets[i][s];
                received.push(
                    circuits.beeps[circuit],
                    circuits.messages[circuit].clone(),
                );
            }
            particle.received = received;
        }
    }
}
