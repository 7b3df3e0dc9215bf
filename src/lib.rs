//! # Numgrid Client
//!
//! Client library for the numgrid number-matching puzzle.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     NUMGRID CLIENT                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  └── vec2.rs     - Integer 2D grid point                     │
//! │                                                              │
//! │  game/           - Board model (pure, no I/O)                │
//! │  ├── board.rs    - Snapshot grid and move validation         │
//! │  └── path.rs     - Drag path the player is drawing           │
//! │                                                              │
//! │  network/        - Server protocols                          │
//! │  ├── transport.rs- Bounded-timeout WebSocket session         │
//! │  ├── protocol.rs - Wire encodings and protocol errors        │
//! │  ├── client.rs   - Game request/response state machine       │
//! │  └── highscores.rs - One-shot highscores fetch               │
//! │                                                              │
//! │  config.rs       - Endpoints, timeouts, player name          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Polling Model
//!
//! Nothing here spawns threads or exposes async. The presentation layer
//! calls [`GameClient::poll`] and [`HighscoresClient::poll`] once per frame;
//! each call blocks for at most the session's receive timeout and then
//! returns. At most one board request is in flight per game client.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError};
pub use crate::core::vec2::Point;
pub use game::board::{Board, BoardError};
pub use game::path::MovePath;
pub use network::client::{GameClient, GameState, SubmitOutcome};
pub use network::highscores::{HighscoresClient, HighscoresState};
pub use network::protocol::{HighscoresList, PollStatus, ProtocolError, Score};
pub use network::transport::{Received, SessionConfig, Transport, TransportError, WsSession};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
