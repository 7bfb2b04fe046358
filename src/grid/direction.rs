//! Direction enum and compass transforms.
//!
//! Directions come in two families on the triangular grid: the six cardinal
//! directions along lattice edges and the six secondary directions rotated by
//! 30°. Both families share one twelve-value enum so that rotations by 30°
//! are closed. There is deliberately no `NONE` variant: code that needs an
//! absent direction uses `Option<Direction>`, which keeps every helper below
//! total on the enum.

use serde::{Deserialize, Serialize};

/// All twelve grid directions, counter-clockwise starting at east.
///
/// Cardinal directions occupy the even discriminants, secondary directions
/// the odd ones, so rotating by 30° is adding one modulo twelve.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    E = 0,
    ENE = 1,
    NNE = 2,
    N = 3,
    NNW = 4,
    WNW = 5,
    W = 6,
    WSW = 7,
    SSW = 8,
    S = 9,
    SSE = 10,
    ESE = 11,
}

/// Rotational handedness of a particle's local compass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chirality {
    #[default]
    CounterClockwise,
    Clockwise,
}

const ALL: [Direction; 12] = [
    Direction::E,
    Direction::ENE,
    Direction::NNE,
    Direction::N,
    Direction::NNW,
    Direction::WNW,
    Direction::W,
    Direction::WSW,
    Direction::SSW,
    Direction::S,
    Direction::SSE,
    Direction::ESE,
];

impl Direction {
    /// Number of distinct directions.
    pub const COUNT: u8 = 12;

    /// The discriminant in `0..12`.
    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Direction for a discriminant; reduced modulo twelve.
    #[inline]
    pub fn from_index(index: u8) -> Direction {
        ALL[(index % 12) as usize]
    }

    /// The cardinal direction numbered `0..6` counter-clockwise from east.
    #[inline]
    pub fn from_cardinal_int(k: u8) -> Direction {
        ALL[((k % 6) * 2) as usize]
    }

    /// The secondary direction numbered `0..6`, i.e. the cardinal of the same
    /// number rotated by 30° counter-clockwise.
    #[inline]
    pub fn from_secondary_int(k: u8) -> Direction {
        ALL[((k % 6) * 2 + 1) as usize]
    }

    /// Collapses each cardinal/secondary pair to a number in `0..6`.
    ///
    /// # Examples
    /// ```
    /// # use amoebot_lib::grid::Direction;
    /// assert_eq!(Direction::E.to_int(), 0);
    /// assert_eq!(Direction::ENE.to_int(), 0);
    /// assert_eq!(Direction::SSE.to_int(), 5);
    /// ```
    #[inline]
    pub const fn to_int(self) -> u8 {
        self as u8 / 2
    }

    #[inline]
    pub const fn is_cardinal(self) -> bool {
        self as u8 % 2 == 0
    }

    #[inline]
    pub const fn is_secondary(self) -> bool {
        !self.is_cardinal()
    }

    /// Rotates by `k` steps of 30°, counter-clockwise for positive `k`.
    #[inline]
    pub fn rotate30(self, k: i32) -> Direction {
        ALL[(self as u8 as i32 + k).rem_euclid(12) as usize]
    }

    /// Rotates by `k` steps of 60°, counter-clockwise for positive `k`.
    #[inline]
    pub fn rotate60(self, k: i32) -> Direction {
        self.rotate30(2 * k)
    }

    /// The direction rotated by 180°.
    ///
    /// # Examples
    /// ```
    /// # use amoebot_lib::grid::Direction;
    /// assert_eq!(Direction::E.opposite(), Direction::W);
    /// assert_eq!(Direction::SSE.opposite(), Direction::NNW);
    /// ```
    #[inline]
    pub fn opposite(self) -> Direction {
        self.rotate30(6)
    }

    /// Number of 30° steps from `self` to `to` in the chosen rotational
    /// sense. The result is in `0..12`.
    pub fn distance(self, to: Direction, clockwise: bool) -> u8 {
        let diff = if clockwise {
            self as u8 as i32 - to as u8 as i32
        } else {
            to as u8 as i32 - self as u8 as i32
        };
        diff.rem_euclid(12) as u8
    }

    /// Translates a direction from a particle's local compass into the global
    /// one. `compass` is the global direction the particle considers its
    /// local east; with clockwise chirality the rotation sense is mirrored.
    ///
    /// Inverse of [`Direction::to_local`] for every input.
    pub fn to_global(self, compass: Direction, chirality: Chirality) -> Direction {
        let local = self as u8 as i32;
        let base = compass as u8 as i32;
        let global = match chirality {
            Chirality::CounterClockwise => base + local,
            Chirality::Clockwise => base - local,
        };
        ALL[global.rem_euclid(12) as usize]
    }

    /// Translates a global direction into a particle's local compass.
    pub fn to_local(self, compass: Direction, chirality: Chirality) -> Direction {
        let global = self as u8 as i32;
        let base = compass as u8 as i32;
        let local = match chirality {
            Chirality::CounterClockwise => global - base,
            Chirality::Clockwise => base - global,
        };
        ALL[local.rem_euclid(12) as usize]
    }
}

impl Chirality {
    /// +1 for counter-clockwise, -1 for clockwise; the step sign used when
    /// walking labels around a particle in its own rotation sense.
    #[inline]
    pub const fn sign(self) -> i32 {
        match self {
            Chirality::CounterClockwise => 1,
            Chirality::Clockwise => -1,
        }
    }
}
