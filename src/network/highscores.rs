//! Highscores Client
//!
//! One-shot fetch: the server pushes the list once after connecting. The
//! client closes its session as soon as the list arrives and never touches
//! the network again.

use tracing::{debug, warn};

use crate::network::protocol::{HighscoresList, PollStatus, ProtocolError};
use crate::network::transport::{Received, SessionConfig, Transport, WsSession};

/// Client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighscoresState {
    /// List not received yet.
    AwaitingList,
    /// List received and session closed.
    Ready,
}

/// Highscores channel client.
pub struct HighscoresClient<T: Transport = WsSession> {
    transport: T,
    state: HighscoresState,
    highscores: Option<HighscoresList>,
}

impl HighscoresClient<WsSession> {
    /// Connect to the highscores server.
    pub fn connect(config: SessionConfig) -> Result<Self, ProtocolError> {
        Ok(Self::new(WsSession::connect(config)?))
    }
}

impl<T: Transport> HighscoresClient<T> {
    /// Wait for the list over an already open transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: HighscoresState::AwaitingList,
            highscores: None,
        }
    }

    /// Check for the list. Call once per frame.
    ///
    /// After the list has arrived this is a no-op returning
    /// [`PollStatus::Idle`].
    pub fn poll(&mut self) -> Result<PollStatus, ProtocolError> {
        if self.state != HighscoresState::AwaitingList {
            return Ok(PollStatus::Idle);
        }

        let text = match self.transport.try_receive()? {
            Received::WouldBlock => return Ok(PollStatus::Pending),
            Received::Message(text) => text,
        };

        let list = HighscoresList::from_json(&text)?;
        debug!("Received {} highscores", list.len());

        self.highscores = Some(list);
        self.state = HighscoresState::Ready;

        // The list is already in hand, so a failed close is not fatal.
        if let Err(e) = self.transport.close() {
            warn!("Failed to close highscores session: {}", e);
        }
        Ok(PollStatus::Received)
    }

    /// The list, once received.
    pub fn highscores(&self) -> Option<&HighscoresList> {
        self.highscores.as_ref()
    }

    /// One `name: value` line per entry, or `None` before the list arrives.
    pub fn format(&self) -> Option<String> {
        self.highscores.as_ref().map(HighscoresList::format)
    }

    /// Whether the list is still outstanding.
    pub fn is_awaiting_response(&self) -> bool {
        self.state == HighscoresState::AwaitingList
    }

    /// Current state.
    pub fn state(&self) -> HighscoresState {
        self.state
    }
}
