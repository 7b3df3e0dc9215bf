//! Drag Path
//!
//! The move the player is currently drawing. Dragging back onto a cell
//! already in the path cuts the path back to that cell, so the player can
//! undo part of a stroke without releasing.

use crate::core::vec2::Point;

/// Points of an in-progress move plus the cell under the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovePath {
    points: Vec<Point>,
    hovered: Point,
}

impl MovePath {
    /// Empty path hovering the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell under the cursor.
    #[inline]
    pub fn hovered(&self) -> Point {
        self.hovered
    }

    /// Points drawn so far.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Whether nothing has been drawn.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether `p` is part of the path.
    pub fn contains(&self, p: Point) -> bool {
        self.points.contains(&p)
    }

    /// Cursor moved without a button held.
    pub fn hover(&mut self, p: Point) {
        self.hovered = p;
    }

    /// Button pressed: start the stroke on the hovered cell.
    pub fn press(&mut self) {
        self.points.push(self.hovered);
    }

    /// Cursor dragged onto `p`.
    pub fn drag(&mut self, p: Point) {
        if p == self.hovered {
            return;
        }
        if let Some(i) = self.points.iter().position(|&q| q == p) {
            self.points.truncate(i);
        }
        self.points.push(p);
        self.hovered = p;
    }

    /// Button released: hand over the stroke and start fresh.
    pub fn release(&mut self) -> Vec<Point> {
        std::mem::take(&mut self.points)
    }
}
