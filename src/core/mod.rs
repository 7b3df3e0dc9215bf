//! Core primitives.
//!
//! Plain value types shared by the board model and the network layer.

pub mod vec2;

pub use vec2::{ParsePointError, Point};
