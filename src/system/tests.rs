#[cfg(test)]
mod units {
    use crate::algorithm::Algorithm;
    use crate::config::SimulationConfig;
    use crate::error::{InvalidAction, SimulationError};
    use crate::grid::{Direction, GridPos, GridVec};
    use crate::particle::AttrValue;
    use crate::system::{Entity, ParticleSpec, ParticleSystem, ParticleView, SystemRequest};

    /// A contracted particle per node of a west-east line.
    fn line_request(count: usize) -> SystemRequest {
        SystemRequest {
            particles: (0..count)
                .map(|i| ParticleSpec::contracted(GridPos::new(i as i32, 0)))
                .collect(),
            objects: Vec::new(),
            anchor: 0,
            config: SimulationConfig::default(),
        }
    }

    fn build(request: SystemRequest, algorithm: impl Algorithm + 'static) -> ParticleSystem {
        ParticleSystem::new(request, Box::new(algorithm)).expect("valid system request")
    }

    /// Does nothing in either phase.
    struct Idle;

    impl Algorithm for Idle {
        fn activate_move(&self, _: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            Ok(())
        }
        fn activate_beep(&self, _: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            Ok(())
        }
    }

    /// Expands the selected particle eastward once.
    struct ExpandEast {
        only: Option<usize>,
    }

    impl Algorithm for ExpandEast {
        fn activate_move(&self, p: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            if self.only.is_none_or(|id| id == p.id()) && p.is_contracted() {
                p.expand(Direction::E)?;
            }
            Ok(())
        }
        fn activate_beep(&self, _: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            Ok(())
        }
    }

    #[test]
    fn empty_system_round_is_a_noop_that_advances() {
        let mut system = build(
            SystemRequest {
                particles: Vec::new(),
                objects: Vec::new(),
                anchor: 0,
                config: SimulationConfig::default(),
            },
            Idle,
        );
        assert_eq!(system.current_round(), 0);
        system.simulate_round().unwrap();
        assert_eq!(system.current_round(), 1);
        assert_eq!(system.latest_round(), 1);
        assert!(!system.is_finished());
    }

    #[test]
    fn single_particle_applies_its_action_directly() {
        let mut system = build(line_request(1), ExpandEast { only: None });
        system.simulate_round().unwrap();

        let p = system.particle(0);
        assert!(p.is_expanded());
        assert_eq!(p.head(), GridPos::new(1, 0));
        assert_eq!(p.tail(), GridPos::new(0, 0));
        assert_eq!(system.entity_at(GridPos::new(1, 0)), Some(Entity::Particle(0)));
        assert_eq!(system.entity_at(GridPos::new(0, 0)), Some(Entity::Particle(0)));
    }

    #[test]
    fn expansion_pushes_the_bonded_neighbor() {
        // the marked leading bond carries the neighbor one step east
        let mut system = build(line_request(2), ExpandEast { only: Some(0) });
        system.simulate_round().unwrap();

        assert!(system.particle(0).is_expanded());
        assert_eq!(system.particle(0).tail(), GridPos::new(0, 0));
        assert_eq!(system.particle(0).head(), GridPos::new(1, 0));
        assert_eq!(system.particle(1).head(), GridPos::new(2, 0));
        assert!(!system.particle(1).is_expanded());

        // the mover keeps its own origin, the neighbor rides the bond
        assert_eq!(
            system.particle(0).joint_movement_offset(),
            Some(GridVec::ZERO)
        );
        assert_eq!(
            system.particle(1).joint_movement_offset(),
            Some(GridVec::unit(Direction::E))
        );
    }

    #[test]
    fn anchor_keeps_its_position_under_joint_movement() {
        let mut request = line_request(2);
        request.anchor = 1;
        let mut system = build(request, ExpandEast { only: Some(0) });
        system.simulate_round().unwrap();

        // anchored on particle 1, the expansion displaces the mover instead
        assert_eq!(system.particle(1).head(), GridPos::new(1, 0));
        assert_eq!(system.particle(0).head(), GridPos::new(0, 0));
        assert_eq!(system.particle(0).tail(), GridPos::new(-1, 0));
    }

    struct DivergingExpand;

    impl Algorithm for DivergingExpand {
        fn activate_move(&self, p: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            if p.is_contracted() {
                let dir = if p.id() == 0 { Direction::NNE } else { Direction::NNW };
                p.expand(dir)?;
            }
            Ok(())
        }
        fn activate_beep(&self, _: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            Ok(())
        }
    }

    #[test]
    fn expanding_into_the_same_node_is_a_collision() {
        let mut system = build(line_request(2), DivergingExpand);
        let err = system.simulate_round().unwrap_err();
        assert_eq!(err, SimulationError::Collision(GridPos::new(0, 1)));

        // rolled back: counters and positions unchanged
        assert_eq!(system.current_round(), 0);
        assert_eq!(system.latest_round(), 0);
        assert_eq!(system.particle(0).head(), GridPos::new(0, 0));
        assert_eq!(system.particle(1).head(), GridPos::new(1, 0));
        assert!(!system.particle(0).is_expanded());
    }

    #[test]
    fn movement_with_a_detached_particle_is_disconnected() {
        let request = SystemRequest {
            particles: vec![
                ParticleSpec::contracted(GridPos::new(0, 0)),
                ParticleSpec::contracted(GridPos::new(4, 0)),
            ],
            objects: Vec::new(),
            anchor: 0,
            config: SimulationConfig::default(),
        };
        let mut system = build(request, ExpandEast { only: Some(0) });
        let err = system.simulate_round().unwrap_err();
        assert_eq!(err, SimulationError::Disconnected { unvisited: 1 });
        assert_eq!(system.current_round(), 0);
    }

    struct FaultyMove;

    impl Algorithm for FaultyMove {
        fn activate_move(&self, p: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            // contracting while contracted is invalid; propagating the error
            // must abort the round
            p.contract_head()
        }
        fn activate_beep(&self, _: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            Ok(())
        }
    }

    #[test]
    fn propagated_invalid_action_aborts_and_rolls_back() {
        let mut system = build(line_request(1), FaultyMove);
        let err = system.simulate_round().unwrap_err();
        assert!(matches!(err, SimulationError::Algorithm { particle: 0, .. }));
        assert_eq!(system.current_round(), 0);
        assert!(!system.particle(0).is_expanded());
    }

    struct PanickyBeep;

    impl Algorithm for PanickyBeep {
        fn activate_move(&self, p: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            if p.is_contracted() {
                p.expand(Direction::E)?;
            }
            Ok(())
        }
        fn activate_beep(&self, _: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            panic!("beep phase exploded");
        }
    }

    #[test]
    fn panicking_callback_is_caught_and_rolled_back() {
        let mut system = build(line_request(1), PanickyBeep);
        let err = system.simulate_round().unwrap_err();
        match err {
            SimulationError::Algorithm { particle, reason } => {
                assert_eq!(particle, 0);
                assert!(reason.contains("beep phase exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // the move phase had already expanded the particle; rollback undid it
        assert_eq!(system.current_round(), 0);
        assert!(!system.particle(0).is_expanded());
        assert_eq!(system.particle(0).head(), GridPos::new(0, 0));
    }

    struct ReleaseEast;

    impl Algorithm for ReleaseEast {
        fn activate_move(&self, p: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            // releasing may fail only for directions into the particle; all
            // callers here are contracted
            p.release_bond_at(Direction::E, true)
        }
        fn activate_beep(&self, _: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            Ok(())
        }
    }

    #[test]
    fn release_without_motion_takes_the_static_pass() {
        let mut system = build(line_request(2), ReleaseEast);
        system.simulate_round().unwrap();

        // no connectivity complaint, nothing moved, and the one-sided
        // release removed the bond from the snapshot
        assert_eq!(system.current_round(), 1);
        assert_eq!(system.particle(0).head(), GridPos::new(0, 0));
        assert_eq!(system.particle(1).head(), GridPos::new(1, 0));
        assert!(system.bond_snapshot_at(1).0.is_empty());
    }

    #[test]
    fn idle_round_publishes_the_bond_snapshot() {
        let mut system = build(line_request(3), Idle);
        system.simulate_round().unwrap();
        let bonds = &system.bond_snapshot_at(1).0;
        assert_eq!(bonds.len(), 2);
        assert!(bonds.iter().all(|b| !b.hidden));
    }

    struct UnifiedBeeper {
        beeper: usize,
    }

    impl Algorithm for UnifiedBeeper {
        fn activate_move(&self, _: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            Ok(())
        }
        fn activate_beep(&self, p: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            let unified = p.new_unified_configuration();
            p.set_pin_configuration(unified)?;
            if p.id() == self.beeper {
                p.plan_beep_on(0)?;
            }
            Ok(())
        }
    }

    #[test]
    fn beep_spreads_over_the_merged_circuit() {
        let mut system = build(line_request(3), UnifiedBeeper { beeper: 2 });
        system.simulate_round().unwrap();

        let circuits = system.circuits().expect("circuits were discovered");
        assert_eq!(circuits.circuit_count, 1);
        for i in 0..3 {
            assert!(system.particle(i).received().any_beep(), "particle {i}");
        }
    }

    #[test]
    fn beep_delivery_can_be_disabled() {
        let mut request = line_request(2);
        request.config.send_beeps_and_messages = false;
        let mut system = build(request, UnifiedBeeper { beeper: 0 });
        system.simulate_round().unwrap();
        assert!(!system.particle(0).received().any_beep());
        assert!(!system.particle(1).received().any_beep());
    }

    #[test]
    fn moving_resets_pins_to_singletons() {
        let mut system = build(line_request(1), ExpandEast { only: None });
        system.simulate_round().unwrap();

        let pins = system.particle(0).pin_configuration();
        assert_eq!(pins.labels(), 10);
        assert_eq!(pins.set_count(), 10);
    }

    struct Counter;

    impl Algorithm for Counter {
        fn attributes(&self) -> Vec<(&'static str, AttrValue)> {
            vec![("count", AttrValue::Int(0))]
        }
        fn activate_move(&self, p: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            let count = p.attr_int("count")?;
            p.set_attr("count", AttrValue::Int(count + 1))
        }
        fn activate_beep(&self, _: &mut ParticleView<'_>) -> Result<(), InvalidAction> {
            Ok(())
        }
        fn is_finished(&self, p: &ParticleView<'_>) -> bool {
            p.attr_int("count").is_ok_and(|c| c >= 3)
        }
    }

    #[test]
    fn attributes_are_recorded_per_round_and_replayable() {
        let mut system = build(line_request(2), Counter);
        for _ in 0..3 {
            system.simulate_round().unwrap();
        }
        assert_eq!(system.particle(0).attribute("count"), Some(AttrValue::Int(3)));
        assert!(system.is_finished());
        assert_eq!(system.finished_round(), Some(3));

        system.set_marker_to_round(1).unwrap();
        assert_eq!(system.particle(0).attribute("count"), Some(AttrValue::Int(1)));
        assert!(matches!(
            system.simulate_round(),
            Err(SimulationError::NotTracking)
        ));

        system.continue_tracking();
        assert_eq!(system.particle(0).attribute("count"), Some(AttrValue::Int(3)));
        system.simulate_round().unwrap();
    }

    #[test]
    fn cut_off_clears_a_truncated_finished_flag() {
        let mut system = build(line_request(1), Counter);
        for _ in 0..3 {
            system.simulate_round().unwrap();
        }
        assert!(system.is_finished());

        system.set_marker_to_round(2).unwrap();
        system.cut_off_at_marker();
        assert_eq!(system.latest_round(), 2);
        assert!(!system.is_finished());
        assert!(system.is_tracking());

        // the truncated rounds can be re-simulated
        system.simulate_round().unwrap();
        assert_eq!(system.finished_round(), Some(3));
    }

    #[test]
    fn shift_timescale_moves_the_whole_window() {
        let mut system = build(line_request(1), Counter);
        system.simulate_round().unwrap();
        system.shift_timescale(5).unwrap();
        assert_eq!(system.earliest_round(), 5);
        assert_eq!(system.latest_round(), 6);
        assert_eq!(system.particle(0).attribute("count"), Some(AttrValue::Int(1)));
        assert!(matches!(
            system.shift_timescale(-10),
            Err(SimulationError::InvalidTimescaleShift(-10))
        ));
    }

    #[test]
    fn set_anchor_is_guarded() {
        let mut system = build(line_request(2), Idle);
        assert!(system.set_anchor(1).is_ok());
        assert!(system.set_anchor(7).is_err());
        system.simulate_round().unwrap();
        system.set_marker_to_round(0).unwrap();
        assert!(matches!(system.set_anchor(0), Err(SimulationError::NotTracking)));
        system.continue_tracking();
    }

    #[test]
    fn overlapping_setup_is_rejected() {
        let request = SystemRequest {
            particles: vec![
                ParticleSpec::contracted(GridPos::new(0, 0)),
                ParticleSpec::expanded(GridPos::new(0, 0), Direction::E),
            ],
            objects: Vec::new(),
            anchor: 0,
            config: SimulationConfig::default(),
        };
        assert!(matches!(
            ParticleSystem::new(request, Box::new(Idle)),
            Err(SimulationError::InvalidSetup(_))
        ));
    }
}
