//! `SkirmishServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → lobby → task pool.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use skirmish_protocol::{Codec, JsonCodec};
use skirmish_session::{Authenticator, VersionGate};
use skirmish_tasks::{SchedulerConfig, TaskScheduler};
use skirmish_transport::{
    DEFAULT_HANDSHAKE_TIMEOUT, Transport, WebSocketConnection, WebSocketTransport,
};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::lobby::Lobby;
use crate::SkirmishError;

/// Delivery handle stored in each session.
pub(crate) type Peer = Arc<WebSocketConnection>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Server settings. Every field has a default; see [`ServerConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address. Default: `0.0.0.0:5438`.
    pub bind: String,
    /// Task pool size shared by inbound handling and delivery. Default: 64.
    pub workers: usize,
    /// Identifies the game content clients must have been built from.
    /// Feeds the verification string checked on AUTHENTICATE.
    pub content_fingerprint: String,
    /// Relay GAME_EVENT notifications inside started rooms. Default: off.
    pub relay_game_events: bool,
    /// Time an accepted socket gets to finish the WebSocket upgrade.
    /// Default: 10s.
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5438".to_string(),
            workers: 64,
            content_fingerprint: String::new(),
            relay_game_events: false,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Shared server state, one per server, handed to every connection task.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) lobby: Mutex<Lobby<Peer>>,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) tasks: TaskScheduler,
    pub(crate) config: ServerConfig,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`SkirmishServer`].
///
/// # Example
///
/// ```rust,ignore
/// use skirmish::prelude::*;
///
/// let server = SkirmishServer::builder()
///     .bind("0.0.0.0:5438")
///     .content_fingerprint("units-v3:tiles-v7")
///     .build()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Clone, Default)]
pub struct SkirmishServerBuilder {
    config: ServerConfig,
}

impl SkirmishServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn content_fingerprint(mut self, fingerprint: &str) -> Self {
        self.config.content_fingerprint = fingerprint.to_string();
        self
    }

    pub fn relay_game_events(mut self, relay: bool) -> Self {
        self.config.relay_game_events = relay;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener, checking credentials with a [`VersionGate`]
    /// built from the configured content fingerprint.
    pub async fn build(self) -> Result<SkirmishServer<VersionGate, JsonCodec>, SkirmishError> {
        let gate = VersionGate::new(&self.config.content_fingerprint);
        self.build_with_auth(gate).await
    }

    /// Binds the listener with a custom authenticator.
    pub async fn build_with_auth<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<SkirmishServer<A, JsonCodec>, SkirmishError> {
        let transport = WebSocketTransport::bind(&self.config.bind)
            .await?
            .with_handshake_timeout(self.config.handshake_timeout);
        let tasks = TaskScheduler::new(SchedulerConfig::with_workers(self.config.workers));

        let state = Arc::new(ServerState {
            lobby: Mutex::new(Lobby::new()),
            auth,
            codec: JsonCodec,
            tasks,
            config: self.config,
        });
        Ok(SkirmishServer { transport, state })
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound lobby server. Call [`run`](Self::run) to start serving.
pub struct SkirmishServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl SkirmishServer<VersionGate, JsonCodec> {
    pub fn builder() -> SkirmishServerBuilder {
        SkirmishServerBuilder::new()
    }
}

impl<A, C> SkirmishServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Accepts connections until the process is terminated.
    pub async fn run(self) -> Result<(), SkirmishError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Each connection gets its own task for the WebSocket upgrade and its
    /// reads; the frames it reads are handled on the shared task pool.
    /// On shutdown the listener is dropped and the pool is closed: tasks
    /// already running finish, and connections are closed on their next
    /// frame.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), SkirmishError>
    where
        F: Future<Output = ()> + Send,
    {
        tracing::info!(
            addr = ?self.transport.local_addr().ok(),
            workers = self.state.tasks.workers(),
            relay_game_events = self.state.config.relay_game_events,
            "skirmish lobby running"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(handshake) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(handshake, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!(
            in_flight = self.state.tasks.in_flight(),
            "shutting down, waiting for running tasks"
        );
        self.state.tasks.close();
        self.state.tasks.wait_idle().await;
        tracing::info!("skirmish lobby stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0:5438");
        assert_eq!(config.workers, 64);
        assert!(!config.relay_game_events);
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_setters_fill_config() {
        let builder = SkirmishServerBuilder::new()
            .bind("127.0.0.1:0")
            .workers(8)
            .content_fingerprint("units:tiles")
            .relay_game_events(true)
            .handshake_timeout(Duration::from_millis(250));
        assert_eq!(
            builder.config,
            ServerConfig {
                bind: "127.0.0.1:0".into(),
                workers: 8,
                content_fingerprint: "units:tiles".into(),
                relay_game_events: true,
                handshake_timeout: Duration::from_millis(250),
            }
        );
    }
}
