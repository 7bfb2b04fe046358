//! # Grid Module - Triangular Lattice Coordinates
//!
//! This module provides the coordinate types for the triangular grid the
//! simulation runs on. Nodes are addressed by signed axial coordinates
//! `(x, y)`; the six cardinal directions map to fixed unit displacements and
//! all direction arithmetic is pure integer math.
//!
//! ## Submodules
//!
//! - [`direction`]: The twelve-value direction enum, rotations, chirality and
//!   the local/global compass transforms
//! - [`labels`]: The edge-label algebra for contracted (6 labels) and
//!   expanded (10 labels) particles
//! - [`tests`]: Unit tests for the coordinate and label math
//!
//! ## Example Usage
//! ```
//! use amoebot_lib::grid::{Direction, GridPos, GridVec};
//!
//! let origin = GridPos::new(0, 0);
//! let east = origin.neighbor(Direction::E, 1);
//! assert_eq!(east, GridPos::new(1, 0));
//!
//! // Displacements compose like vectors
//! let step = GridVec::unit(Direction::NNE) + GridVec::unit(Direction::SSW);
//! assert_eq!(step, GridVec::ZERO);
//! ```

// Direction enum, rotations and compass transforms
pub mod direction;
// Edge-label algebra for contracted and expanded particles
pub mod labels;
// Unit tests
pub mod tests;

pub use direction::{Chirality, Direction};
pub use labels::{direction_of_label, is_head_label, label_count, label_in_direction};

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A node of the triangular lattice in axial coordinates.
///
/// The cardinal direction `E` corresponds to `(+1, 0)` and `NNE` to `(0, +1)`;
/// the remaining four unit vectors follow counter-clockwise. Two nodes are
/// adjacent iff their difference is one of the six unit vectors.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

/// A displacement between two grid nodes.
///
/// Separate from [`GridPos`] so that positions and offsets cannot be mixed up
/// in the joint-movement arithmetic: positions translate by vectors, vectors
/// add to vectors.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridVec {
    pub x: i32,
    pub y: i32,
}

/// Axial unit vectors for the six cardinal directions, counter-clockwise
/// starting at east.
const UNIT: [GridVec; 6] = [
    GridVec { x: 1, y: 0 },
    GridVec { x: 0, y: 1 },
    GridVec { x: -1, y: 1 },
    GridVec { x: -1, y: 0 },
    GridVec { x: 0, y: -1 },
    GridVec { x: 1, y: -1 },
];

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        GridPos { x, y }
    }

    /// The node reached by taking `k` unit steps in direction `dir`.
    ///
    /// # Examples
    /// ```
    /// # use amoebot_lib::grid::{Direction, GridPos};
    /// let p = GridPos::new(2, -1);
    /// assert_eq!(p.neighbor(Direction::W, 2), GridPos::new(0, -1));
    /// ```
    pub fn neighbor(self, dir: Direction, k: i32) -> GridPos {
        self + GridVec::unit(dir) * k
    }

    /// Returns the cardinal direction from `self` to `to` if the two nodes
    /// are adjacent, `None` otherwise.
    pub fn direction_to(self, to: GridPos) -> Option<Direction> {
        let delta = to - self;
        (0..6)
            .map(Direction::from_cardinal_int)
            .find(|&d| GridVec::unit(d) == delta)
    }

    pub fn is_adjacent_to(self, other: GridPos) -> bool {
        self.direction_to(other).is_some()
    }
}

impl GridVec {
    pub const ZERO: GridVec = GridVec { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        GridVec { x, y }
    }

    /// The unit displacement of a direction.
    ///
    /// Cardinal directions map to single lattice steps. A secondary direction
    /// lies between two cardinals and maps to the sum of their unit vectors;
    /// this keeps the function total on the enum, but note that the result is
    /// not a nearest-neighbor step.
    pub fn unit(dir: Direction) -> GridVec {
        let k = dir.to_int() as usize;
        if dir.is_cardinal() {
            UNIT[k]
        } else {
            UNIT[k] + UNIT[(k + 1) % 6]
        }
    }
}

impl Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Add<GridVec> for GridPos {
    type Output = GridPos;
    #[inline]
    fn add(self, rhs: GridVec) -> GridPos {
        GridPos {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl AddAssign<GridVec> for GridPos {
    #[inline]
    fn add_assign(&mut self, rhs: GridVec) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for GridPos {
    type Output = GridVec;
    #[inline]
    fn sub(self, rhs: GridPos) -> GridVec {
        GridVec {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Add for GridVec {
    type Output = GridVec;
    #[inline]
    fn add(self, rhs: GridVec) -> GridVec {
        GridVec {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for GridVec {
    type Output = GridVec;
    #[inline]
    fn sub(self, rhs: GridVec) -> GridVec {
        GridVec {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Neg for GridVec {
    type Output = GridVec;
    #[inline]
    fn neg(self) -> GridVec {
        GridVec {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl Mul<i32> for GridVec {
    type Output = GridVec;
    #[inline]
    fn mul(self, rhs: i32) -> GridVec {
        GridVec {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}
