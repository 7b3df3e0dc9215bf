//! Protocol Messages
//!
//! Wire format for both server channels. Every message is one WebSocket
//! text frame holding bare JSON: no envelope, no type tag. Which type a
//! frame decodes to is decided by the channel and the client's state.
//!
//! | Channel    | Direction | Payload                                 |
//! |------------|-----------|-----------------------------------------|
//! | game       | out       | player name, `"alice"` (first message)  |
//! | game       | out       | move, `[0, 1, 4]`                       |
//! | game       | in        | snapshot, `[1, 1, 2, 3]`                |
//! | highscores | in        | `[{"name": "alice", "score": 42}]`      |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::board::{Board, BoardError};
use crate::network::transport::TransportError;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent to the game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// Display name, sent once right after connecting.
    Join(String),

    /// Flat board indices of one move, in drawing order.
    Move(Vec<i64>),
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Full board state from the game server, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub Vec<u32>);

impl Snapshot {
    /// Build the board this snapshot describes.
    pub fn into_board(self) -> Result<Board, BoardError> {
        Board::from_flat(self.0)
    }
}

/// One highscores entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Player display name.
    pub name: String,
    /// Points, integer or fractional as the server sent them.
    #[serde(rename = "score", alias = "value")]
    pub value: serde_json::Number,
}

/// Highscores in the order the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighscoresList {
    /// Entries, never re-sorted.
    pub scores: Vec<Score>,
}

impl HighscoresList {
    /// One `name: value` line per entry.
    pub fn format(&self) -> String {
        self.scores
            .iter()
            .map(|s| format!("{}: {}", s.name, s.value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

// =============================================================================
// POLLING AND ERRORS
// =============================================================================

/// What a single `poll()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Not waiting for anything; the transport was not touched.
    Idle,
    /// Waiting, but nothing arrived within the receive timeout.
    Pending,
    /// A payload arrived and was installed.
    Received,
}

/// Fatal protocol errors. The session should be dropped after any of these.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Connection failed or was lost.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Payload is not the JSON shape this channel expects.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// Snapshot decoded but does not describe a board.
    #[error("invalid board: {0}")]
    InvalidBoard(#[from] BoardError),

    /// Outbound message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

impl Snapshot {
    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(s).map_err(ProtocolError::MalformedPayload)
    }
}

impl HighscoresList {
    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(s).map_err(ProtocolError::MalformedPayload)
    }
}
