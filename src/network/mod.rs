//! Network Layer
//!
//! WebSocket sessions to the game and highscores servers, and the
//! request/response state machines layered on top of them.

pub mod client;
pub mod highscores;
pub mod protocol;
pub mod transport;

pub use client::{GameClient, GameState, SubmitOutcome};
pub use highscores::{HighscoresClient, HighscoresState};
pub use protocol::{ClientMessage, HighscoresList, PollStatus, ProtocolError, Score, Snapshot};
pub use transport::{Received, SessionConfig, Transport, TransportError, WsSession};
