#[cfg(test)]
mod units {
    use crate::grid::{Chirality, Direction, GridPos};
    use crate::history::ReplayHistory;
    use crate::particle::{AttrValue, AttributeStore, BondState, Particle};

    fn contracted(head: GridPos) -> Particle {
        Particle::new(
            head,
            None,
            Chirality::CounterClockwise,
            Direction::E,
            1,
            AttributeStore::new(&[("phase", AttrValue::Int(0))], 0),
            0,
        )
    }

    fn expanded(head: GridPos, head_dir: Direction) -> Particle {
        Particle::new(
            head,
            Some(head_dir),
            Chirality::CounterClockwise,
            Direction::E,
            1,
            AttributeStore::new(&[], 0),
            0,
        )
    }

    #[test]
    fn contracted_geometry() {
        let p = contracted(GridPos::new(2, 3));
        assert!(!p.is_expanded());
        assert_eq!(p.tail(), p.head());
        assert_eq!(p.occupied_nodes(), vec![GridPos::new(2, 3)]);
        assert_eq!(p.label_count(), 6);
    }

    #[test]
    fn expanded_geometry() {
        // head at (1,0), expanded east: tail sits one step west
        let p = expanded(GridPos::new(1, 0), Direction::E);
        assert!(p.is_expanded());
        assert_eq!(p.tail(), GridPos::new(0, 0));
        assert_eq!(p.occupied_nodes(), vec![GridPos::new(1, 0), GridPos::new(0, 0)]);
        assert_eq!(p.label_count(), 10);
    }

    #[test]
    fn labels_resolve_to_nodes_and_directions() {
        let p = expanded(GridPos::new(1, 0), Direction::E);
        // label 0 leaves the head eastward
        assert_eq!(p.node_of_label(0), GridPos::new(1, 0));
        assert_eq!(p.direction_of_label(0), Direction::E);
        // label 5 leaves the tail westward
        assert_eq!(p.node_of_label(5), GridPos::new(0, 0));
        assert_eq!(p.direction_of_label(5), Direction::W);
        assert_eq!(p.label_in_direction(Direction::W, false), Some(5));
        assert_eq!(p.label_in_direction(Direction::W, true), None);
    }

    #[test]
    fn bond_state_masks() {
        let b = BondState::all_active(6);
        assert_eq!(b.active, 0b11_1111);
        assert!(b.is_active(5));
        assert!(b.is_visible(0));
        assert!(!b.is_marked(3));
    }

    #[test]
    fn attribute_access_checks_kinds() {
        let mut store = AttributeStore::new(
            &[("flag", AttrValue::Bool(false)), ("dir", AttrValue::Dir(None))],
            0,
        );
        assert_eq!(store.get("flag"), Ok(AttrValue::Bool(false)));
        assert!(store.set("flag", AttrValue::Bool(true)).is_ok());
        assert!(store.set("flag", AttrValue::Int(1)).is_err());
        assert!(store.get("missing").is_err());
        assert!(
            store
                .set("dir", AttrValue::Dir(Some(Direction::NNW)))
                .is_ok()
        );
    }

    #[test]
    fn commit_and_restore_roundtrip() {
        let mut p = contracted(GridPos::new(0, 0));
        p.attrs.set("phase", AttrValue::Int(1)).unwrap();
        p.head = GridPos::new(1, 0);
        p.commit(1);

        p.attrs.set("phase", AttrValue::Int(2)).unwrap();
        p.head = GridPos::new(2, 0);
        p.head_dir = Some(Direction::E);
        p.commit(2);

        p.restore_to(1);
        assert_eq!(p.head(), GridPos::new(1, 0));
        assert_eq!(p.attribute("phase"), Some(AttrValue::Int(1)));
        assert!(!p.is_expanded());

        p.restore_to(2);
        assert_eq!(p.head(), GridPos::new(2, 0));
        assert_eq!(p.attribute("phase"), Some(AttrValue::Int(2)));
        assert!(p.is_expanded());
    }

    #[test]
    fn cut_off_drops_later_rounds() {
        let mut p = contracted(GridPos::new(0, 0));
        p.head = GridPos::new(1, 0);
        p.commit(1);
        p.head = GridPos::new(2, 0);
        p.commit(2);

        p.restore_to(1);
        p.cut_off_at_marker();
        assert_eq!(p.head_history.last_round(), 1);
        assert_eq!(*p.head_history.last_value(), GridPos::new(1, 0));
    }

    #[test]
    fn begin_round_resets_transients() {
        let mut p = expanded(GridPos::new(1, 0), Direction::E);
        p.action = Some(crate::particle::Action::ContractHead);
        p.overrides.released = 0b1;
        p.begin_round();
        assert_eq!(p.action, None);
        assert!(!p.overrides.any());
        assert_eq!(p.bonds, BondState::all_active(10));
        // expanded particle defaults to non-head origin until resolution
        assert!(!p.is_head_origin);
    }
}
