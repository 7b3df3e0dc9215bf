//! Board Snapshot
//!
//! One square grid of cell values as received from the game server.
//! A board never changes after construction; every snapshot the server
//! sends becomes a fresh `Board`.

use std::fmt;

use thiserror::Error;

use crate::core::vec2::Point;

/// Board construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Snapshot length is not a perfect square.
    #[error("snapshot of {len} cells is not a square board")]
    NotSquare {
        /// Number of values received.
        len: usize,
    },
}

/// Square grid of cell values, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<u32>,
    can_move: bool,
}

impl Board {
    /// Build a board from a flat row-major snapshot.
    ///
    /// The snapshot length must be a perfect square. The empty snapshot is
    /// the 0x0 board, which has no moves.
    pub fn from_flat(values: Vec<u32>) -> Result<Self, BoardError> {
        let side = square_side(values.len()).ok_or(BoardError::NotSquare { len: values.len() })?;

        let mut board = Self {
            width: side,
            height: side,
            cells: values,
            can_move: false,
        };
        board.can_move = board.scan_for_moves();
        Ok(board)
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Flat row-major cell values.
    #[inline]
    pub fn values(&self) -> &[u32] {
        &self.cells
    }

    /// Iterate over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        // chunks() rejects a zero size; the 0x0 board has no rows anyway
        self.cells.chunks(self.width.max(1))
    }

    /// Whether any legal move exists. Fixed at construction.
    #[inline]
    pub fn can_move(&self) -> bool {
        self.can_move
    }

    /// Same as [`Board::can_move`].
    #[inline]
    pub fn has_valid_moves(&self) -> bool {
        self.can_move
    }

    /// Flat index of a point. Not bounds checked: points off the board map
    /// to indices outside `0..width * height` or onto the wrong cell.
    #[inline]
    pub fn index_from_coordinate(&self, p: Point) -> i64 {
        i64::from(p.x) + self.width as i64 * i64::from(p.y)
    }

    /// Point of a flat index, `None` when off the board.
    pub fn coordinate_from_index(&self, index: usize) -> Option<Point> {
        if index >= self.cells.len() {
            return None;
        }
        let x = i32::try_from(index % self.width).ok()?;
        let y = i32::try_from(index / self.width).ok()?;
        Some(Point::new(x, y))
    }

    /// Value at a flat index.
    #[inline]
    pub fn get_from_index(&self, index: usize) -> Option<u32> {
        self.cells.get(index).copied()
    }

    /// Value at a point, `None` when off the board.
    #[inline]
    pub fn get_from_coordinate(&self, p: Point) -> Option<u32> {
        if !self.in_bounds(p) {
            return None;
        }
        self.cells.get(p.x as usize + self.width * p.y as usize).copied()
    }

    /// Whether a point lies on the board.
    #[inline]
    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && (p.x as usize) < self.width && p.y >= 0 && (p.y as usize) < self.height
    }

    /// Check a proposed move.
    ///
    /// A move is legal when it has at least two points, every point is on
    /// the board and holds the first point's value, and each consecutive
    /// pair shares a row or a column. Consecutive points need not touch:
    /// `(0,0) -> (2,0)` passes over `(1,0)` without visiting it.
    pub fn move_is_valid(&self, points: &[Point]) -> bool {
        if points.len() < 2 {
            return false;
        }

        let Some(number) = self.get_from_coordinate(points[0]) else {
            return false;
        };

        let same_value = points
            .iter()
            .all(|&p| self.get_from_coordinate(p) == Some(number));
        if !same_value {
            return false;
        }

        points.windows(2).all(|pair| pair[0].is_aligned_with(pair[1]))
    }

    /// Flat indices for a move, in input order. No validation.
    pub fn build_move(&self, points: &[Point]) -> Vec<i64> {
        points.iter().map(|&p| self.index_from_coordinate(p)).collect()
    }

    /// Sum of the values under a move's points. Off-board points count 0.
    pub fn move_score(&self, points: &[Point]) -> u64 {
        points
            .iter()
            .filter_map(|&p| self.get_from_coordinate(p))
            .map(u64::from)
            .sum()
    }

    /// Any two orthogonal neighbours with equal values.
    fn scan_for_moves(&self) -> bool {
        self.cells.iter().enumerate().any(|(i, &value)| {
            let Some(p) = self.coordinate_from_index(i) else {
                return false;
            };
            [Point::RIGHT, Point::DOWN]
                .into_iter()
                .any(|step| self.get_from_coordinate(p + step) == Some(value))
        })
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.rows().enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            write!(f, "{row:?}")?;
        }
        Ok(())
    }
}

/// Side of a square with `len` cells, if there is one.
fn square_side(len: usize) -> Option<usize> {
    let mut side = (len as f64).sqrt() as usize;
    // float sqrt can land one off for large inputs
    while side * side > len {
        side -= 1;
    }
    while (side + 1) * (side + 1) <= len {
        side += 1;
    }
    (side * side == len).then_some(side)
}

// =============================================================================
// TESTS
// =============================================================================
