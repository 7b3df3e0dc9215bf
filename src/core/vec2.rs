//! Integer 2D Point
//!
//! Grid coordinates for board cells. `x` is the column, `y` the row.
//! Points may lie outside any board; bounds are the board's concern.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 2D point with integer components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Point {
    /// Origin
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// One column to the right (+X)
    pub const RIGHT: Self = Self { x: 1, y: 0 };

    /// One row down (+Y)
    pub const DOWN: Self = Self { x: 0, y: 1 };

    /// Create a point from its components.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared euclidean length.
    #[inline]
    pub fn length_squared(self) -> i64 {
        let x = i64::from(self.x);
        let y = i64::from(self.y);
        x * x + y * y
    }

    /// Manhattan distance to another point.
    #[inline]
    pub fn step_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Whether both points share a row or a column.
    #[inline]
    pub fn is_aligned_with(self, other: Self) -> bool {
        self.x == other.x || self.y == other.y
    }
}

impl Add for Point {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Error parsing a point from `"x,y"` text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid point `{0}`, expected `x,y`")]
pub struct ParsePointError(pub String);

impl FromStr for Point {
    type Err = ParsePointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePointError(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(err)?;
        let x = x.trim().parse().map_err(|_| err())?;
        let y = y.trim().parse().map_err(|_| err())?;
        Ok(Self::new(x, y))
    }
}

// =============================================================================
// TESTS
// =============================================================================
