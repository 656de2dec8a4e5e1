//! WebSocket Game Server
//!
//! Async WebSocket server for host and player connections.
//! Socket tasks only move frames; all game state lives in the router task.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::network::connection::ConnectionId;
use crate::network::invite;
use crate::network::protocol::ServerMessage;
use crate::network::router::{run_router, Router, RouterEvent};
use crate::network::session::SessionConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Public base URL players reach the page on (e.g. `http://192.168.1.20:8080`).
    pub public_url: Option<String>,
    /// Path of the player page under the public URL.
    pub player_path: String,
    /// Game session settings.
    pub session: SessionConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            public_url: None,
            player_path: "/".to_string(),
            session: SessionConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    ///
    /// - `BINGO_BIND_ADDR`: listen address, e.g. `0.0.0.0:8080`
    /// - `BINGO_MAX_CONNECTIONS`: connection cap
    /// - `BINGO_PUBLIC_URL`: base URL advertised to players
    /// - `BINGO_PLAYER_PATH`: player page path
    /// - `BINGO_ENFORCE_RANGE`: `false`/`0` accepts any drawn number
    pub fn from_env() -> Result<Self, GameServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GameServerError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("BINGO_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|_| GameServerError::Config(format!("invalid BINGO_BIND_ADDR: {}", addr)))?;
        }

        if let Some(max) = lookup("BINGO_MAX_CONNECTIONS") {
            config.max_connections = max
                .parse()
                .map_err(|_| GameServerError::Config(format!("invalid BINGO_MAX_CONNECTIONS: {}", max)))?;
        }

        config.public_url = lookup("BINGO_PUBLIC_URL").filter(|url| !url.is_empty());

        if let Some(path) = lookup("BINGO_PLAYER_PATH") {
            config.player_path = path;
        }

        if let Some(flag) = lookup("BINGO_ENFORCE_RANGE") {
            config.session.enforce_range = !(flag == "false" || flag == "0");
        }

        Ok(config)
    }

    /// URL players open to join.
    pub fn join_url(&self) -> String {
        match &self.public_url {
            Some(base) => invite::join_url_from_base(base, &self.player_path),
            None => invite::join_url("http", &self.bind_addr.to_string(), &self.player_path),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Live socket count.
    connections: Arc<AtomicUsize>,
    /// Source of connection ids.
    next_connection_id: Arc<AtomicU64>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            connections: Arc::new(AtomicUsize::new(0)),
            next_connection_id: Arc::new(AtomicU64::new(1)),
            shutdown_tx,
        }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and run the server.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the server on an already bound listener.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Bingo server listening on {}", listener.local_addr()?);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let router = Router::new(self.config.session.clone());
        let router_handle = tokio::spawn(run_router(router, events_rx));

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            // Slot is held from accept, through the handshake
                            if self.connections.fetch_add(1, Ordering::SeqCst) >= self.config.max_connections {
                                self.connections.fetch_sub(1, Ordering::SeqCst);
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr, events_tx.clone());
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        drop(events_tx);
        router_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection. The caller has already reserved
    /// its slot in `connections`.
    fn handle_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        events: mpsc::UnboundedSender<RouterEvent>,
    ) {
        let connections = self.connections.clone();
        let conn = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::SeqCst));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    connections.fetch_sub(1, Ordering::SeqCst);
                    return;
                }
            };

            info!("{} connected from {}", conn, addr);

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();

            if events.send(RouterEvent::Attached { conn, sender: msg_tx }).is_err() {
                warn!("Router unavailable, dropping {}", conn);
                connections.fetch_sub(1, Ordering::SeqCst);
                return;
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        let event = match msg {
                            Some(Ok(Message::Text(text))) => RouterEvent::Text { conn, text },
                            Some(Ok(Message::Binary(data))) => RouterEvent::Binary { conn, data },
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("{} closed", conn);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error for {}: {}", conn, e);
                                break;
                            }
                            Some(Ok(_)) => continue,
                        };
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Cleanup
            let _ = events.send(RouterEvent::Detached { conn });
            sender_task.abort();
            connections.fetch_sub(1, Ordering::SeqCst);

            info!("{} cleaned up", conn);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count, sockets still handshaking included.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}
