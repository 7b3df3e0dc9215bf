//! Game Client
//!
//! Request/response state machine for the game channel. The client sends
//! the player's name on connect, then alternates: wait for a snapshot,
//! submit one move, wait for the next snapshot. A move submitted while a
//! snapshot is still outstanding is dropped, so at most one request is
//! ever in flight.

use tracing::{debug, info};

use crate::core::vec2::Point;
use crate::game::board::Board;
use crate::network::protocol::{ClientMessage, PollStatus, ProtocolError, Snapshot};
use crate::network::transport::{Received, SessionConfig, Transport, WsSession};

/// Client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    /// A snapshot is owed by the server.
    AwaitingSnapshot,
    /// Current board is up to date; a move may be submitted.
    Ready,
}

/// Result of handing a move to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Move was sent; the client now awaits the next snapshot.
    Sent,
    /// A snapshot is still outstanding. Nothing was sent.
    Busy,
    /// Move is illegal on the current board, or there is no board yet.
    /// Nothing was sent.
    Rejected,
}

/// Game channel client.
pub struct GameClient<T: Transport = WsSession> {
    transport: T,
    player_name: String,
    state: GameState,
    board: Option<Board>,
}

impl GameClient<WsSession> {
    /// Connect to the game server and join as `player_name`.
    pub fn connect(config: SessionConfig, player_name: impl Into<String>) -> Result<Self, ProtocolError> {
        let transport = WsSession::connect(config)?;
        Self::new(transport, player_name)
    }
}

impl<T: Transport> GameClient<T> {
    /// Join over an already open transport.
    pub fn new(mut transport: T, player_name: impl Into<String>) -> Result<Self, ProtocolError> {
        let player_name = player_name.into();
        let join = ClientMessage::Join(player_name.clone()).to_json()?;
        transport.send(join)?;
        info!("Joined game as {:?}", player_name);

        Ok(Self {
            transport,
            player_name,
            state: GameState::AwaitingSnapshot,
            board: None,
        })
    }

    /// Check for the outstanding snapshot. Call once per frame.
    ///
    /// Only touches the transport while awaiting a snapshot. On arrival the
    /// board is replaced and the client becomes [`GameState::Ready`]. A
    /// malformed snapshot leaves state unchanged and is returned as an error.
    pub fn poll(&mut self) -> Result<PollStatus, ProtocolError> {
        if self.state != GameState::AwaitingSnapshot {
            return Ok(PollStatus::Idle);
        }

        let text = match self.transport.try_receive()? {
            Received::WouldBlock => return Ok(PollStatus::Pending),
            Received::Message(text) => text,
        };

        let board = Snapshot::from_json(&text)?.into_board()?;
        debug!(
            "Snapshot {}x{} received, can_move={}",
            board.width(),
            board.height(),
            board.can_move()
        );

        self.board = Some(board);
        self.state = GameState::Ready;
        Ok(PollStatus::Received)
    }

    /// Send a built move. Returns [`SubmitOutcome::Busy`] without sending
    /// while a snapshot is outstanding.
    pub fn submit(&mut self, indices: Vec<i64>) -> Result<SubmitOutcome, ProtocolError> {
        if self.state != GameState::Ready {
            debug!("Move dropped, snapshot still outstanding");
            return Ok(SubmitOutcome::Busy);
        }

        let text = ClientMessage::Move(indices).to_json()?;
        self.transport.send(text)?;
        self.state = GameState::AwaitingSnapshot;
        Ok(SubmitOutcome::Sent)
    }

    /// Validate `points` against the current board and submit them.
    ///
    /// On [`SubmitOutcome::Sent`] also returns the move's score, the sum of
    /// the values under its points.
    pub fn play(&mut self, points: &[Point]) -> Result<(SubmitOutcome, u64), ProtocolError> {
        if self.state != GameState::Ready {
            return Ok((SubmitOutcome::Busy, 0));
        }
        let Some(board) = self.board.as_ref() else {
            return Ok((SubmitOutcome::Rejected, 0));
        };
        if !board.move_is_valid(points) {
            return Ok((SubmitOutcome::Rejected, 0));
        }

        let score = board.move_score(points);
        let indices = board.build_move(points);
        let outcome = self.submit(indices)?;
        Ok((outcome, score))
    }

    /// Most recent board, if any snapshot has arrived.
    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    /// Whether the current board has a legal move. `false` before the
    /// first snapshot.
    pub fn can_move(&self) -> bool {
        self.board.as_ref().is_some_and(Board::can_move)
    }

    /// Whether a snapshot is outstanding.
    pub fn is_awaiting_response(&self) -> bool {
        self.state == GameState::AwaitingSnapshot
    }

    /// Current state.
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Name the client joined with.
    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    /// Close the session.
    pub fn close(mut self) -> Result<(), ProtocolError> {
        self.transport.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::network::transport::testing::{Script, ScriptedTransport};
    use crate::network::transport::TransportError;

    fn client() -> (GameClient<ScriptedTransport>, Rc<RefCell<Script>>) {
        let (transport, script) = ScriptedTransport::new();
        let client = GameClient::new(transport, "alice").unwrap();
        (client, script)
    }

    fn ready_client(snapshot: &str) -> (GameClient<ScriptedTransport>, Rc<RefCell<Script>>) {
        let (mut client, script) = client();
        script.borrow_mut().push_message(snapshot);
        assert_eq!(client.poll().unwrap(), PollStatus::Received);
        (client, script)
    }

    #[test]
    fn test_connect_sends_name_first() {
        let (client, script) = client();
        assert_eq!(script.borrow().sent, vec!["\"alice\"".to_string()]);
        assert_eq!(client.state(), GameState::AwaitingSnapshot);
        assert!(client.is_awaiting_response());
        assert!(client.board().is_none());
        assert!(!client.can_move());
        assert_eq!(client.player_name(), "alice");
    }

    #[test]
    fn test_submit_while_awaiting_is_noop() {
        let (mut client, script) = client();
        assert_eq!(client.submit(vec![0, 1]).unwrap(), SubmitOutcome::Busy);
        assert_eq!(script.borrow().sent.len(), 1);
        assert_eq!(client.state(), GameState::AwaitingSnapshot);
    }

    #[test]
    fn test_poll_would_block_keeps_state() {
        let (mut client, script) = client();
        assert_eq!(client.poll().unwrap(), PollStatus::Pending);
        assert_eq!(client.poll().unwrap(), PollStatus::Pending);
        assert_eq!(script.borrow().receive_calls, 2);
        assert_eq!(client.state(), GameState::AwaitingSnapshot);
    }

    #[test]
    fn test_snapshot_makes_client_ready() {
        let (client, _) = ready_client("[1, 1, 2, 3, 4, 5, 6, 7, 8]");
        assert_eq!(client.state(), GameState::Ready);
        assert!(!client.is_awaiting_response());
        let board = client.board().unwrap();
        assert_eq!(board.width(), 3);
        assert!(client.can_move());
    }

    #[test]
    fn test_poll_when_ready_does_not_receive() {
        let (mut client, script) = ready_client("[1, 2, 3, 4]");
        script.borrow_mut().push_message("[5, 5, 5, 5]");
        assert_eq!(client.poll().unwrap(), PollStatus::Idle);
        assert_eq!(script.borrow().receive_calls, 1);
        assert_eq!(client.board().unwrap().values(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_submit_sends_once_and_awaits() {
        let (mut client, script) = ready_client("[1, 1, 2, 3]");
        assert_eq!(client.submit(vec![0, 1]).unwrap(), SubmitOutcome::Sent);
        assert_eq!(client.state(), GameState::AwaitingSnapshot);
        assert_eq!(client.submit(vec![0, 1]).unwrap(), SubmitOutcome::Busy);

        let script = script.borrow();
        assert_eq!(script.sent.len(), 2);
        assert_eq!(script.sent[1], "[0,1]");
    }

    #[test]
    fn test_new_snapshot_replaces_board() {
        let (mut client, script) = ready_client("[1, 1, 2, 3]");
        client.submit(vec![0, 1]).unwrap();
        script.borrow_mut().push_message("[2, 4, 2, 3]");
        assert_eq!(client.poll().unwrap(), PollStatus::Received);
        assert_eq!(client.board().unwrap().values(), &[2, 4, 2, 3]);
        assert!(client.can_move());
    }

    #[test]
    fn test_malformed_snapshot_is_fatal() {
        let (mut client, script) = client();
        script.borrow_mut().push_message("{\"oops\": true}");
        assert!(matches!(client.poll(), Err(ProtocolError::MalformedPayload(_))));
        assert_eq!(client.state(), GameState::AwaitingSnapshot);
        assert!(client.board().is_none());
    }

    #[test]
    fn test_non_square_snapshot_is_fatal() {
        let (mut client, script) = client();
        script.borrow_mut().push_message("[1, 2, 3]");
        assert!(matches!(client.poll(), Err(ProtocolError::InvalidBoard(_))));
        assert!(client.board().is_none());
    }

    #[test]
    fn test_transport_failure_propagates() {
        let (mut client, script) = client();
        script.borrow_mut().push_error(TransportError::Disconnected);
        assert!(matches!(
            client.poll(),
            Err(ProtocolError::Transport(TransportError::Disconnected))
        ));
    }

    #[test]
    fn test_play_validates_and_scores() {
        let (mut client, script) = ready_client("[1, 1, 2, 3, 4, 5, 6, 7, 8]");

        let illegal = [Point::new(0, 0), Point::new(2, 0)];
        assert_eq!(client.play(&illegal).unwrap(), (SubmitOutcome::Rejected, 0));
        assert_eq!(client.state(), GameState::Ready);

        let legal = [Point::new(0, 0), Point::new(1, 0)];
        assert_eq!(client.play(&legal).unwrap(), (SubmitOutcome::Sent, 2));
        assert_eq!(script.borrow().sent.last().unwrap(), "[0,1]");

        assert_eq!(client.play(&legal).unwrap(), (SubmitOutcome::Busy, 0));
    }

    #[test]
    fn test_close_releases_transport() {
        let (client, script) = client();
        client.close().unwrap();
        assert_eq!(script.borrow().close_calls, 1);
    }

    #[test]
    fn test_end_to_end_over_websocket() {
        use futures_util::{SinkExt, StreamExt};
        use std::time::Duration;
        use tokio_tungstenite::tungstenite::Message;

        use crate::network::transport::testing::spawn_server;

        let (seen_tx, seen_rx) = std::sync::mpsc::channel();
        let url = spawn_server(move |mut ws| async move {
            let name = ws.next().await.unwrap().unwrap();
            seen_tx.send(name.into_text().unwrap().as_str().to_owned()).unwrap();
            ws.send(Message::text("[1,1,2,3,4,5,6,7,8]")).await.unwrap();

            let mv = ws.next().await.unwrap().unwrap();
            seen_tx.send(mv.into_text().unwrap().as_str().to_owned()).unwrap();
            ws.send(Message::text("[2,9,2,3,4,5,6,7,8]")).await.unwrap();

            while let Some(Ok(_)) = ws.next().await {}
        });

        let config = SessionConfig::new(url, Some(Duration::from_millis(200)));
        let mut client = GameClient::connect(config, "bob").unwrap();

        let mut status = client.poll().unwrap();
        for _ in 0..25 {
            if status == PollStatus::Received {
                break;
            }
            status = client.poll().unwrap();
        }
        assert_eq!(status, PollStatus::Received);
        assert!(client.can_move());

        let (outcome, score) = client.play(&[Point::new(0, 0), Point::new(1, 0)]).unwrap();
        assert_eq!((outcome, score), (SubmitOutcome::Sent, 2));

        let mut status = client.poll().unwrap();
        for _ in 0..25 {
            if status == PollStatus::Received {
                break;
            }
            status = client.poll().unwrap();
        }
        assert_eq!(status, PollStatus::Received);
        assert_eq!(client.board().unwrap().get_from_index(1), Some(9));
        client.close().unwrap();

        assert_eq!(seen_rx.recv().unwrap(), "\"bob\"");
        assert_eq!(seen_rx.recv().unwrap(), "[0,1]");
    }
}
