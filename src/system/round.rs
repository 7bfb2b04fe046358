//! The round scheduler.
//!
//! A round is two phases over the same synchronous snapshot: the move phase
//! (activations, bond resolution, joint movement) followed by the beep phase
//! (activations, pin application, circuit discovery, delivery). History is
//! written once, at the very end; any failure before that point rolls the
//! working state back to the previous committed round, so an aborted round
//! leaves no trace.
//!
//! Algorithm callbacks are exception-isolated: an `Err` propagating out of a
//! callback and a panic inside one are both turned into an algorithm error
//! carrying the offending particle's index.

use crate::error::{SimResult, SimulationError};
use crate::system::view::{ParticleView, Phase};
use crate::system::{BondSnapshot, ParticleSystem};
use log::debug;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic in algorithm callback".to_string()
    }
}

impl ParticleSystem {
    /// Simulates one full round.
    ///
    /// Only available while tracking (the history marker at the latest
    /// round). On success the round is committed and every history carries
    /// an entry for it; on error the system is rolled back to the previous
    /// round and the error describes the first conflict found.
    pub fn simulate_round(&mut self) -> SimResult<()> {
        if !self.tracking {
            return Err(SimulationError::NotTracking);
        }
        self.current_round += 1;
        self.latest_round += 1;

        match self.run_round() {
            Ok((snapshot, finished)) => {
                self.commit_round(snapshot.clone(), finished);
                let interval = self.config.frame_interval.max(1);
                if self.current_round % interval == 0 {
                    self.send_frame_data(snapshot);
                }
                Ok(())
            }
            Err(err) => {
                self.current_round -= 1;
                self.latest_round -= 1;
                self.last_movements.clear();
                self.last_circuits = None;
                self.sync_working_state();
                Err(err)
            }
        }
    }

    /// Drives rounds until the system is finished or the configured round
    /// limit is reached. Returns the number of rounds executed.
    pub fn run(&mut self) -> SimResult<u32> {
        let mut executed = 0;
        while !self.is_finished() {
            if self.config.max_rounds.is_some_and(|max| executed >= max) {
                break;
            }
            self.simulate_round()?;
            executed += 1;
        }
        Ok(executed)
    }

    fn run_round(&mut self) -> SimResult<(BondSnapshot, bool)> {
        if self.particles.is_empty() {
            // an empty system still advances the round counters
            return Ok((BondSnapshot::default(), false));
        }

        // move phase
        self.activate_all(Phase::Move)?;
        let outcome = self.resolve_bonds();
        let placement = if outcome.any_action {
            self.run_joint_movements()?
        } else {
            if outcome.any_release {
                debug!("bonds released without movement; taking the static bond pass");
            }
            self.static_bond_pass()
        };
        let snapshot = self.apply_movement(placement);

        // beep phase
        self.activate_all(Phase::Beep)?;
        self.apply_pin_configurations();
        let circuits = self.discover_circuits();
        self.deliver_signals(&circuits);
        self.last_circuits = Some(circuits);

        let finished = self.check_termination()?;
        Ok((snapshot, finished))
    }

    /// Runs one activation callback for every particle in insertion order,
    /// isolating callback failures.
    fn activate_all(&mut self, phase: Phase) -> SimResult<()> {
        let algorithm = Rc::clone(&self.algorithm);
        if phase == Phase::Move {
            for particle in &mut self.particles {
                particle.begin_round();
            }
        }
        for index in 0..self.particles.len() {
            let mut view = ParticleView::new(self, index, phase);
            let outcome = catch_unwind(AssertUnwindSafe(|| match phase {
                Phase::Move => algorithm.activate_move(&mut view),
                Phase::Beep => algorithm.activate_beep(&mut view),
                Phase::Query => Ok(()),
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(action)) => {
                    return Err(SimulationError::Algorithm {
                        particle: index,
                        reason: action.to_string(),
                    });
                }
                Err(payload) => {
                    return Err(SimulationError::Algorithm {
                        particle: index,
                        reason: panic_reason(payload),
                    });
                }
            }
        }
        Ok(())
    }

    /// Swaps planned pin configurations in; every other particle keeps its
    /// current one (moved particles were already reset to singletons).
    fn apply_pin_configurations(&mut self) {
        for particle in &mut self.particles {
            if let Some(planned) = particle.planned_pins.take() {
                particle.pins = planned;
            }
        }
    }

    /// The termination predicate: the logical AND of `is_finished` over all
    /// particles, with the same exception isolation as the activations.
    fn check_termination(&mut self) -> SimResult<bool> {
        let algorithm = Rc::clone(&self.algorithm);
        for index in 0..self.particles.len() {
            let view = ParticleView::new(self, index, Phase::Query);
            let outcome = catch_unwind(AssertUnwindSafe(|| algorithm.is_finished(&view)));
            match outcome {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(payload) => {
                    return Err(SimulationError::Algorithm {
                        particle: index,
                        reason: panic_reason(payload),
                    });
                }
            }
        }
        Ok(true)
    }

    fn commit_round(&mut self, snapshot: BondSnapshot, finished: bool) {
        let round = self.current_round;
        for particle in &mut self.particles {
            particle.commit(round);
        }
        for object in &mut self.objects {
            object.commit(round);
        }
        self.anchor_history.record(self.anchor, round);
        self.bond_snapshots.record(snapshot, round);
        if finished && self.finished_round.is_none() {
            self.finished_round = Some(round);
        }
    }
}
