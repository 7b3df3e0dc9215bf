//! Board model.
//!
//! Pure, synchronous types the presentation layer uses to check and build
//! moves before they are handed to the network layer.

pub mod board;
pub mod path;

pub use board::{Board, BoardError};
pub use path::MovePath;
