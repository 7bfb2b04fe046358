//! Integration tests for the replay layer: stepping, markers, cut-off and
//! timescale shifts over a run with movement, attributes and beeps.

use amoebot_lib::algorithm::Algorithm;
use amoebot_lib::config::SimulationConfig;
use amoebot_lib::error::InvalidAction;
use amoebot_lib::grid::{Direction, GridPos};
use amoebot_lib::particle::AttrValue;
use amoebot_lib::system::{ParticleSpec, ParticleSystem, ParticleView, SystemRequest};

/// Oscillates between contracted and expanded, counts its rounds, and beeps
/// on even counts over a unified circuit.
struct Oscillator;

impl Algorithm for Oscillator {
    fn attributes(&self) -> Vec<(&'static str, AttrValue)> {
        vec![("count", AttrValue::Int(0))]
    }

    fn activate_move(&self, p: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
        let count = p.attr_int("count")?;
        p.set_attr("count", AttrValue::Int(count + 1))?;
        if p.is_contracted() {
            p.expand(Direction::E)
        } else {
            p.contract_tail()
        }
    }

    fn activate_beep(&self, p: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
        let unified = p.new_unified_configuration();
        p.set_pin_configuration(unified)?;
        if p.attr_int("count")? % 2 == 0 {
            p.plan_beep_on(0)?;
        }
        Ok(())
    }
}

fn single_oscillator() -> ParticleSystem {
    let _ = env_logger::builder().is_test(true).try_init();
    let request = SystemRequest {
        particles: vec![ParticleSpec::contracted(GridPos::new(0, 0))],
        objects: Vec::new(),
        anchor: 0,
        config: SimulationConfig::default(),
    };
    ParticleSystem::new(request, Box::new(Oscillator)).expect("valid request")
}

/// Everything about the observable state of the single particle.
fn observe(system: &ParticleSystem) -> (GridPos, bool, Option<AttrValue>, bool) {
    let p = system.particle(0);
    (
        p.head(),
        p.is_expanded(),
        p.attribute("count"),
        p.received().any_beep(),
    )
}

#[test]
fn step_back_restores_the_previous_round_exactly() {
    let mut system = single_oscillator();
    for _ in 0..9 {
        system.simulate_round().unwrap();
    }
    let after_nine = observe(&system);
    system.simulate_round().unwrap();
    assert_ne!(observe(&system), after_nine);

    assert!(system.step_back().unwrap());
    assert_eq!(system.current_round(), 9);
    assert_eq!(observe(&system), after_nine);
}

#[test]
fn step_forward_then_back_is_identity() {
    let mut system = single_oscillator();
    for _ in 0..5 {
        system.simulate_round().unwrap();
    }
    system.set_marker_to_round(3).unwrap();
    let at_three = observe(&system);

    assert!(system.step_forward().unwrap());
    assert!(system.step_back().unwrap());
    assert_eq!(system.current_round(), 3);
    assert_eq!(observe(&system), at_three);
}

#[test]
fn marker_and_continue_tracking_roundtrip() {
    let mut system = single_oscillator();
    for _ in 0..6 {
        system.simulate_round().unwrap();
    }
    let latest = observe(&system);

    system.set_marker_to_round(2).unwrap();
    assert!(!system.is_tracking());
    assert_ne!(observe(&system), latest);

    system.continue_tracking();
    assert!(system.is_tracking());
    assert_eq!(system.current_round(), 6);
    assert_eq!(observe(&system), latest);
}

#[test]
fn step_back_stops_at_the_earliest_round() {
    let mut system = single_oscillator();
    for _ in 0..3 {
        system.simulate_round().unwrap();
    }
    system.set_marker_to_round(0).unwrap();
    assert!(!system.step_back().unwrap());
    assert_eq!(system.current_round(), 0);
}

#[test]
fn step_forward_stops_at_the_latest_round() {
    let mut system = single_oscillator();
    system.simulate_round().unwrap();
    system.set_marker_to_round(1).unwrap();
    assert!(!system.step_forward().unwrap());
}

#[test]
fn marker_outside_the_window_is_rejected() {
    let mut system = single_oscillator();
    system.simulate_round().unwrap();
    assert!(system.set_marker_to_round(2).is_err());
}

#[test]
fn cut_off_at_marker_is_idempotent() {
    let mut system = single_oscillator();
    for _ in 0..7 {
        system.simulate_round().unwrap();
    }
    system.set_marker_to_round(4).unwrap();
    system.cut_off_at_marker();
    let first = system.save_state();

    system.cut_off_at_marker();
    assert_eq!(system.save_state(), first);
    assert_eq!(system.latest_round(), 4);
    assert!(system.is_tracking());
}

#[test]
fn cut_off_then_resimulate_diverges_cleanly() {
    let mut system = single_oscillator();
    for _ in 0..5 {
        system.simulate_round().unwrap();
    }
    system.set_marker_to_round(2).unwrap();
    system.cut_off_at_marker();
    assert_eq!(system.latest_round(), 2);

    // deterministic algorithm: re-simulated rounds match the original run
    system.simulate_round().unwrap();
    assert_eq!(system.particle(0).attribute("count"), Some(AttrValue::Int(3)));
}

#[test]
fn shifted_timescale_replays_at_shifted_rounds() {
    let mut system = single_oscillator();
    for _ in 0..4 {
        system.simulate_round().unwrap();
    }
    let at_two = {
        system.set_marker_to_round(2).unwrap();
        let state = observe(&system);
        system.continue_tracking();
        state
    };

    system.shift_timescale(10).unwrap();
    assert_eq!(system.earliest_round(), 10);
    assert_eq!(system.latest_round(), 14);
    system.set_marker_to_round(12).unwrap();
    assert_eq!(observe(&system), at_two);
}
