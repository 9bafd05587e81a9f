//! Grid and fixed-point math utilities for deterministic decisions.
//!
//! The battlefield is a tile grid, so positions are integer coordinates and
//! distances are Chebyshev ranges (diagonal steps cost the same as straight
//! ones). Scores that need fractions use fixed-point arithmetic so that two
//! engines fed the same snapshot always reach the same decision.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all scoring math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// A tile position on the battlefield grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TilePos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl TilePos {
    /// Create a new tile position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev range to another tile.
    ///
    /// This is the number of single-tile steps needed on an open grid.
    #[must_use]
    pub fn range_to(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }

    /// Check whether `other` lies within `range` tiles.
    #[must_use]
    pub fn in_range_of(self, other: Self, range: u32) -> bool {
        self.range_to(other) <= range
    }

    /// Direction of a single step from `self` toward `other`.
    ///
    /// Returns `None` when both positions are the same tile.
    #[must_use]
    pub fn direction_to(self, other: Self) -> Option<Direction> {
        Direction::from_delta(other.x - self.x, other.y - self.y)
    }

    /// Direction of a single step from `self` directly away from `other`.
    #[must_use]
    pub fn direction_away_from(self, other: Self) -> Option<Direction> {
        Direction::from_delta(self.x - other.x, self.y - other.y)
    }

    /// Tile reached by taking one step in `direction`.
    #[must_use]
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Offset this tile by the given amounts.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// One of the eight grid directions. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// (0, -1)
    Top,
    /// (1, -1)
    TopRight,
    /// (1, 0)
    Right,
    /// (1, 1)
    BottomRight,
    /// (0, 1)
    Bottom,
    /// (-1, 1)
    BottomLeft,
    /// (-1, 0)
    Left,
    /// (-1, -1)
    TopLeft,
}

impl Direction {
    /// All directions, clockwise from `Top`.
    pub const ALL: [Self; 8] = [
        Self::Top,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::Bottom,
        Self::BottomLeft,
        Self::Left,
        Self::TopLeft,
    ];

    /// Direction matching the sign of a delta.
    #[must_use]
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx.signum(), dy.signum()) {
            (0, -1) => Some(Self::Top),
            (1, -1) => Some(Self::TopRight),
            (1, 0) => Some(Self::Right),
            (1, 1) => Some(Self::BottomRight),
            (0, 1) => Some(Self::Bottom),
            (-1, 1) => Some(Self::BottomLeft),
            (-1, 0) => Some(Self::Left),
            (-1, -1) => Some(Self::TopLeft),
            _ => None,
        }
    }

    /// Unit delta of this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Top => (0, -1),
            Self::TopRight => (1, -1),
            Self::Right => (1, 0),
            Self::BottomRight => (1, 1),
            Self::Bottom => (0, 1),
            Self::BottomLeft => (-1, 1),
            Self::Left => (-1, 0),
            Self::TopLeft => (-1, -1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_chebyshev() {
        let a = TilePos::new(0, 0);
        assert_eq!(a.range_to(TilePos::new(3, 1)), 3);
        assert_eq!(a.range_to(TilePos::new(-2, -5)), 5);
        assert_eq!(a.range_to(a), 0);
        assert!(a.in_range_of(TilePos::new(3, 3), 3));
        assert!(!a.in_range_of(TilePos::new(4, 0), 3));
    }

    #[test]
    fn test_direction_toward_and_away() {
        let a = TilePos::new(5, 5);
        let b = TilePos::new(9, 2);
        assert_eq!(a.direction_to(b), Some(Direction::TopRight));
        assert_eq!(a.direction_away_from(b), Some(Direction::BottomLeft));
        assert_eq!(a.direction_to(a), None);
    }

    #[test]
    fn test_step_follows_delta() {
        let a = TilePos::new(0, 0);
        for dir in Direction::ALL {
            let next = a.step(dir);
            assert_eq!(a.range_to(next), 1);
            assert_eq!(a.direction_to(next), Some(dir));
        }
    }

    #[test]
    fn test_fixed_determinism() {
        // Same operations must produce identical results
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }
}
