//! Transport Sessions
//!
//! One persistent WebSocket connection per server. The async socket is
//! hidden behind a synchronous, bounded-wait interface so the frame loop
//! can poll it: a receive either yields a message within the session's
//! timeout or reports [`Received::WouldBlock`].

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long `close` waits for the close frame to go out.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a receive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// One complete text message.
    Message(String),
    /// Nothing arrived within the receive timeout. Try again next poll.
    WouldBlock,
}

/// Transport errors. All of them end the session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not start the session's I/O runtime.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Handshake with the server failed.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        /// Endpoint.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<tungstenite::Error>,
    },

    /// Handshake did not finish in time.
    #[error("timed out connecting to {url}")]
    ConnectTimeout {
        /// Endpoint.
        url: String,
    },

    /// Socket failure after connecting.
    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<tungstenite::Error>),

    /// Server closed the connection.
    #[error("connection closed by server")]
    Disconnected,

    /// Session was already closed locally.
    #[error("session is closed")]
    Closed,

    /// Binary frame that is not UTF-8 text.
    #[error("unexpected non-text frame")]
    UnexpectedFrame,
}

impl From<tungstenite::Error> for TransportError {
    fn from(e: tungstenite::Error) -> Self {
        match e {
            tungstenite::Error::ConnectionClosed => Self::Disconnected,
            tungstenite::Error::AlreadyClosed => Self::Closed,
            other => Self::WebSocket(Box::new(other)),
        }
    }
}

/// A message channel to one server.
pub trait Transport {
    /// Write one text message. Does not wait for a reply.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Read one message, or report that none arrived in time.
    fn try_receive(&mut self) -> Result<Received, TransportError>;

    /// Release the connection. Later calls fail with
    /// [`TransportError::Closed`].
    fn close(&mut self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        (**self).send(text)
    }

    fn try_receive(&mut self) -> Result<Received, TransportError> {
        (**self).try_receive()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Server endpoint, `ws://` or `wss://`.
    pub url: String,
    /// Longest a receive may wait. `None` waits until a message arrives.
    pub receive_timeout: Option<Duration>,
    /// Longest the opening handshake may take.
    pub connect_timeout: Duration,
}

impl SessionConfig {
    /// Config with the default connect timeout.
    pub fn new(url: impl Into<String>, receive_timeout: Option<Duration>) -> Self {
        Self {
            url: url.into(),
            receive_timeout,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// WebSocket session driven by a private single-threaded runtime.
pub struct WsSession {
    config: SessionConfig,
    runtime: Runtime,
    stream: Option<WsStream>,
}

impl WsSession {
    /// Open a session. Blocks until the handshake completes or times out.
    pub fn connect(config: SessionConfig) -> Result<Self, TransportError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::Runtime)?;

        info!("Connecting to {}...", config.url);
        let handshake = runtime.block_on(async {
            tokio::time::timeout(config.connect_timeout, connect_async(config.url.as_str())).await
        });

        let stream = match handshake {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(source)) => {
                return Err(TransportError::Connect {
                    url: config.url.clone(),
                    source: Box::new(source),
                })
            }
            Err(_) => {
                return Err(TransportError::ConnectTimeout {
                    url: config.url.clone(),
                })
            }
        };
        info!("Connected to {}", config.url);

        Ok(Self {
            config,
            runtime,
            stream: Some(stream),
        })
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

impl Transport for WsSession {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        debug!("Sending to {}: {}", self.config.url, text);
        self.runtime.block_on(stream.send(Message::text(text)))?;
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Received, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;

        let text = match self.config.receive_timeout {
            Some(limit) => {
                let read = self
                    .runtime
                    .block_on(async { tokio::time::timeout(limit, read_text(stream)).await });
                match read {
                    Ok(text) => text?,
                    Err(_) => return Ok(Received::WouldBlock),
                }
            }
            None => self.runtime.block_on(read_text(stream))?,
        };

        debug!("Received from {}: {}", self.config.url, text);
        Ok(Received::Message(text))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut stream = self.stream.take().ok_or(TransportError::Closed)?;

        let result = self
            .runtime
            .block_on(async { tokio::time::timeout(CLOSE_TIMEOUT, stream.close(None)).await });
        match result {
            Ok(Ok(())) => {}
            Ok(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => warn!("Close handshake with {} timed out", self.config.url),
        }

        info!("Closed session to {}", self.config.url);
        Ok(())
    }
}

/// Read until a data frame arrives. Control frames are consumed here.
async fn read_text(stream: &mut WsStream) -> Result<String, TransportError> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
            Some(Ok(Message::Binary(data))) => {
                return String::from_utf8(data.to_vec()).map_err(|_| TransportError::UnexpectedFrame)
            }
            Some(Ok(Message::Close(frame))) => {
                debug!("Server closed connection: {:?}", frame);
                return Err(TransportError::Disconnected);
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(TransportError::Disconnected),
        }
    }
}

// =============================================================================
// TEST SUPPORT
// =============================================================================


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn config(url: String, timeout_ms: u64) -> SessionConfig {
        SessionConfig::new(url, Some(Duration::from_millis(timeout_ms)))
    }

    #[test]
    fn test_session_config_new() {
        let config = SessionConfig::new("ws://localhost:1", None);
        assert_eq!(config.url, "ws://localhost:1");
        assert_eq!(config.receive_timeout, None);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_echo_round_trip() {
        let url = spawn_server(|mut ws| async move {
            if let Some(Ok(msg)) = ws.next().await {
                ws.send(msg).await.unwrap();
            }
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut session = WsSession::connect(config(url, 200)).unwrap();
        session.send("\"hello\"".to_string()).unwrap();
        assert_eq!(receive_within(&mut session, 25), "\"hello\"");
        session.close().unwrap();
        assert!(session.is_closed());
    }

    #[test]
    fn test_receive_would_block_when_idle() {
        let url = spawn_server(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut session = WsSession::connect(config(url, 10)).unwrap();
        assert_eq!(session.try_receive().unwrap(), Received::WouldBlock);
        assert_eq!(session.try_receive().unwrap(), Received::WouldBlock);
        session.close().unwrap();
    }

    #[test]
    fn test_messages_arrive_in_send_order() {
        let url = spawn_server(|mut ws| async move {
            for text in ["[1]", "[2]", "[3]"] {
                ws.send(Message::text(text)).await.unwrap();
            }
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut session = WsSession::connect(config(url, 200)).unwrap();
        assert_eq!(receive_within(&mut session, 25), "[1]");
        assert_eq!(receive_within(&mut session, 25), "[2]");
        assert_eq!(receive_within(&mut session, 25), "[3]");
        session.close().unwrap();
    }

    #[test]
    fn test_ping_consumed_within_receive() {
        let url = spawn_server(|mut ws| async move {
            ws.send(Message::Ping(vec![1, 2].into())).await.unwrap();
            ws.send(Message::text("[7]")).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut session = WsSession::connect(config(url, 200)).unwrap();
        assert_eq!(receive_within(&mut session, 25), "[7]");
        session.close().unwrap();
    }

    #[test]
    fn test_binary_frames() {
        let url = spawn_server(|mut ws| async move {
            ws.send(Message::Binary(b"[1]".to_vec().into())).await.unwrap();
            ws.send(Message::Binary(vec![0xff, 0xfe].into())).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut session = WsSession::connect(config(url, 200)).unwrap();
        assert_eq!(receive_within(&mut session, 25), "[1]");

        let mut result = session.try_receive();
        for _ in 0..25 {
            if !matches!(result, Ok(Received::WouldBlock)) {
                break;
            }
            result = session.try_receive();
        }
        assert!(matches!(result, Err(TransportError::UnexpectedFrame)));
    }

    #[test]
    fn test_receive_without_timeout_blocks_until_message() {
        let url = spawn_server(|mut ws| async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            ws.send(Message::text("[9]")).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut session = WsSession::connect(SessionConfig::new(url, None)).unwrap();
        let started = std::time::Instant::now();
        assert_eq!(session.try_receive().unwrap(), Received::Message("[9]".to_string()));
        assert!(started.elapsed() >= Duration::from_millis(250));
        session.close().unwrap();
    }

    #[test]
    fn test_server_close_is_fatal() {
        let url = spawn_server(|mut ws| async move {
            ws.close(None).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut session = WsSession::connect(config(url, 200)).unwrap();
        let mut result = session.try_receive();
        for _ in 0..25 {
            if !matches!(result, Ok(Received::WouldBlock)) {
                break;
            }
            result = session.try_receive();
        }
        assert!(matches!(result, Err(TransportError::Disconnected)));
    }

    #[test]
    fn test_operations_after_close_fail() {
        let url = spawn_server(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut session = WsSession::connect(config(url, 10)).unwrap();
        session.close().unwrap();
        assert!(matches!(session.send("x".to_string()), Err(TransportError::Closed)));
        assert!(matches!(session.try_receive(), Err(TransportError::Closed)));
        assert!(matches!(session.close(), Err(TransportError::Closed)));
    }

    #[test]
    fn test_connect_refused() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let result = WsSession::connect(config(format!("ws://{addr}"), 10));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
