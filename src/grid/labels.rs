//! Edge-label algebra.
//!
//! A contracted particle has six boundary edges, labeled `0..6` by their
//! direction. An expanded particle has ten, labeled `0..10` consecutively
//! along the boundary walk starting at the head edge that points in the head
//! direction: labels `{0, 1, 2, 8, 9}` sit on the head, `{3..=7}` on the
//! tail. Consecutive labels are adjacent in space, which is what the
//! chirality-aware neighbor search relies on.
//!
//! All functions here are frame-agnostic: passed local directions they yield
//! local labels, passed global directions they yield global labels.

use super::Direction;

/// Number of boundary edges of a particle in the given expansion state.
#[inline]
pub const fn label_count(expanded: bool) -> u8 {
    if expanded { 10 } else { 6 }
}

/// The label of the boundary edge leaving the given half of the particle in
/// direction `dir`.
///
/// `head_dir` is `None` for a contracted particle (then `from_head` is
/// ignored, every edge is a head edge). Returns `None` when the direction is
/// secondary or points into the particle itself.
///
/// # Examples
/// ```
/// # use amoebot_lib::grid::{label_in_direction, Direction};
/// // Contracted: labels are just the cardinal numbers.
/// assert_eq!(label_in_direction(Direction::W, None, true), Some(3));
/// // Expanded east: the tail edge pointing west is label 5.
/// assert_eq!(
///     label_in_direction(Direction::W, Some(Direction::E), false),
///     Some(5)
/// );
/// ```
pub fn label_in_direction(dir: Direction, head_dir: Option<Direction>, from_head: bool) -> Option<u8> {
    if !dir.is_cardinal() {
        return None;
    }
    let Some(hd) = head_dir else {
        return Some(dir.to_int());
    };
    // offset of dir from the head direction, in 60° steps counter-clockwise
    let r = (dir.to_int() + 6 - hd.to_int()) % 6;
    if from_head {
        match r {
            0..=2 => Some(r),
            3 => None, // points at the tail
            _ => Some(r + 4),
        }
    } else {
        match r {
            0 => None, // points at the head
            _ => Some(r + 2),
        }
    }
}

/// The direction of a boundary edge, inverse of [`label_in_direction`].
///
/// # Panics
///
/// Panics if `label` is out of range for the expansion state.
pub fn direction_of_label(label: u8, head_dir: Option<Direction>) -> Direction {
    let Some(hd) = head_dir else {
        assert!(label < 6, "contracted label {label} out of range");
        return Direction::from_cardinal_int(label);
    };
    assert!(label < 10, "expanded label {label} out of range");
    let r = match label {
        0..=2 => label,
        3..=7 => label - 2,
        _ => label - 4,
    };
    Direction::from_cardinal_int((hd.to_int() + r) % 6)
}

/// Whether a label sits on the head of the particle. Contracted particles
/// consist only of their head.
#[inline]
pub const fn is_head_label(label: u8, expanded: bool) -> bool {
    !expanded || label < 3 || label > 7
}
