//! WebSocket over TCP, via `tokio-tungstenite`.
//!
//! Lobby frames are JSON documents, so they travel as text frames. Binary
//! frames are accepted on receive and surfaced unchanged.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Handshake, Transport, TransportError};

static CONNECTION_IDS: AtomicU64 = AtomicU64::new(1);

/// How long an accepted socket gets to send its upgrade request.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<TcpStream>;

fn io_error(kind: io::ErrorKind, e: tungstenite::Error) -> io::Error {
    io::Error::new(kind, e)
}

/// TCP listener whose sockets are upgraded to WebSockets on their own task.
pub struct WebSocketTransport {
    listener: TcpListener,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "lobby listener bound");
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// The bound address. Useful after binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;
    type Handshake = WebSocketHandshake;

    async fn accept(&mut self) -> Result<WebSocketHandshake, TransportError> {
        let (tcp, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::trace!(%addr, "tcp accepted");
        Ok(WebSocketHandshake {
            tcp,
            addr,
            timeout: self.handshake_timeout,
        })
    }
}

/// A TCP socket that has not sent its upgrade request yet.
pub struct WebSocketHandshake {
    tcp: TcpStream,
    addr: SocketAddr,
    timeout: Duration,
}

impl Handshake for WebSocketHandshake {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.addr)
    }

    async fn complete(self) -> Result<WebSocketConnection, TransportError> {
        let Self { tcp, addr, timeout } = self;
        let ws = match tokio::time::timeout(timeout, tokio_tungstenite::accept_async(tcp)).await {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                return Err(TransportError::HandshakeFailed(io_error(
                    io::ErrorKind::InvalidData,
                    e,
                )));
            }
            Err(_) => {
                return Err(TransportError::HandshakeFailed(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no upgrade request within {timeout:?}"),
                )));
            }
        };

        let id = ConnectionId::new(CONNECTION_IDS.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, "websocket upgraded");

        // Separate halves so a delivery task can write while the
        // connection task is parked on the next read.
        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            addr,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// One upgraded peer.
pub struct WebSocketConnection {
    id: ConnectionId,
    addr: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let frame = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink
            .lock()
            .await
            .send(frame)
            .await
            .map_err(|e| TransportError::SendFailed(io_error(io::ErrorKind::BrokenPipe, e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        while let Some(frame) = stream.next().await {
            let frame = frame.map_err(|e| {
                TransportError::ReceiveFailed(io_error(io::ErrorKind::ConnectionReset, e))
            })?;
            match frame {
                Message::Text(text) => return Ok(Some(text.as_bytes().to_vec())),
                Message::Binary(bytes) => return Ok(Some(bytes.to_vec())),
                Message::Close(_) => return Ok(None),
                // Ping/pong are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(io_error(io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.addr)
    }
}
