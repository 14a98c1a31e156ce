//! `StockpulseServer` builder and run loop.
//!
//! This ties the layers together: the HTTP router (login, pages, API) on
//! one listener and the real-time channel on another, both sharing the same
//! session store and room registry.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use stockpulse_protocol::{Codec, JsonCodec, RoomName};
use stockpulse_room::{Broadcaster, RoomConfig, RoomRegistry};
use stockpulse_session::{AuthGate, CredentialVerifier, SessionConfig, SessionStore, SharedSessions};
use stockpulse_transport::{Transport, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::{Environment, RealtimeConfig, ServerConfig};
use crate::handler::{handle_connection, RealtimeState};
use crate::http::{build_router, AppState, CookieSettings};
use crate::inventory::InventoryStore;
use crate::StockpulseError;

/// Builder for configuring and starting a Stockpulse server.
///
/// # Example
///
/// ```rust,ignore
/// use stockpulse::prelude::*;
///
/// let server = StockpulseServer::builder()
///     .bind("0.0.0.0:3000")
///     .bind_realtime("0.0.0.0:3001")
///     .build(credentials, MemoryInventory::new())
///     .await?;
/// server.run().await
/// ```
pub struct StockpulseServerBuilder {
    config: ServerConfig,
}

impl StockpulseServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Starts from an existing config, e.g. [`ServerConfig::from_env`].
    pub fn with_config(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Sets the HTTP listen address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.http_addr = addr.to_string();
        self
    }

    /// Sets the WebSocket listen address.
    pub fn bind_realtime(mut self, addr: &str) -> Self {
        self.config.realtime_addr = addr.to_string();
        self
    }

    /// Sets the deployment posture (cookie `Secure` flag, error detail).
    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    /// Sets the room inventory changes are broadcast to.
    pub fn inventory_room(mut self, room: impl Into<RoomName>) -> Self {
        self.config.inventory_room = room.into();
        self
    }

    /// Sets session lifetime and store capacity.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets room name limits and the per-connection event queue size.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.rooms = config;
        self
    }

    /// Sets handshake, idle, write and shutdown timeouts for WebSocket
    /// clients.
    pub fn realtime_config(mut self, config: RealtimeConfig) -> Self {
        self.config.realtime = config;
        self
    }

    /// Binds both listeners and wires up shared state.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` for the real-time channel.
    pub async fn build<V, I>(
        self,
        verifier: V,
        inventory: I,
    ) -> Result<StockpulseServer<JsonCodec>, StockpulseError>
    where
        V: CredentialVerifier,
        I: InventoryStore,
    {
        let config = self.config;

        let http_listener = TcpListener::bind(&config.http_addr)
            .await
            .map_err(StockpulseError::Http)?;
        let transport = WebSocketTransport::bind(&config.realtime_addr).await?;

        let sessions = SessionStore::shared(config.session.clone());
        let broadcaster = Broadcaster::with_capacity(
            RoomRegistry::shared(config.rooms.clone()),
            config.rooms.outbound_capacity,
        );

        let app = Arc::new(AppState {
            gate: AuthGate::new(Arc::clone(&sessions)),
            verifier,
            inventory,
            broadcaster: broadcaster.clone(),
            inventory_room: config.inventory_room.clone(),
            cookie: CookieSettings {
                name: config.cookie_name.clone(),
                secure: config.environment.is_production(),
                max_age_secs: config.session.max_age_secs,
            },
            environment: config.environment,
        });
        let router = build_router(app);

        let realtime = Arc::new(RealtimeState {
            sessions: Arc::clone(&sessions),
            broadcaster: broadcaster.clone(),
            codec: JsonCodec,
            config: config.realtime.clone(),
        });

        Ok(StockpulseServer {
            http_listener,
            transport,
            router,
            realtime,
            sessions,
            broadcaster,
        })
    }
}

impl Default for StockpulseServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Stockpulse server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct StockpulseServer<C: Codec> {
    http_listener: TcpListener,
    transport: WebSocketTransport,
    router: Router,
    realtime: Arc<RealtimeState<C>>,
    sessions: SharedSessions,
    broadcaster: Broadcaster,
}

impl StockpulseServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> StockpulseServerBuilder {
        StockpulseServerBuilder::new()
    }
}

impl<C: Codec> StockpulseServer<C> {
    /// Address the HTTP listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.http_listener.local_addr()
    }

    /// Address the WebSocket listener is bound to.
    pub fn realtime_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// A clone of the HTTP router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The session store shared by the HTTP gate and the real-time handshake.
    pub fn sessions(&self) -> SharedSessions {
        Arc::clone(&self.sessions)
    }

    /// The broadcaster inventory changes go through.
    pub fn broadcaster(&self) -> Broadcaster {
        self.broadcaster.clone()
    }

    /// Serves until the process is terminated.
    pub async fn run(self) -> Result<(), StockpulseError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes.
    ///
    /// On shutdown the HTTP server drains in-flight requests, the accept
    /// loop stops, and every open real-time connection is sent a
    /// `Disconnect` and cleaned up. Returns once those connection tasks have
    /// finished, or after `shutdown_grace`, when the stragglers are aborted.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), StockpulseError> {
        let Self {
            http_listener,
            mut transport,
            router,
            realtime,
            ..
        } = self;

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        let mut http_stop = stop_rx.clone();
        let http = tokio::spawn(async move {
            axum::serve(http_listener, router)
                .with_graceful_shutdown(async move {
                    let _ = http_stop.changed().await;
                })
                .await
        });

        tracing::info!("Stockpulse server running");

        let accept_loop = async {
            loop {
                let accepted = transport.accept().await;
                // Reap finished connection tasks so the set tracks live ones.
                while connections.try_join_next().is_some() {}

                match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&realtime);
                        let conn_stop = stop_rx.clone();
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(conn, state, conn_stop).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                }
            }
        };

        tokio::select! {
            _ = shutdown => tracing::info!("shutdown requested"),
            _ = accept_loop => {}
        }
        // Flips the HTTP server and every live connection into shutdown.
        let _ = stop_tx.send(true);

        let open = connections.len();
        let drained = tokio::time::timeout(realtime.config.shutdown_grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                remaining = connections.len(),
                "connections still open after shutdown grace, aborting"
            );
            connections.shutdown().await;
        } else if open > 0 {
            tracing::info!(connections = open, "real-time connections closed");
        }

        match http.await {
            Ok(result) => result.map_err(StockpulseError::Http),
            Err(e) => {
                tracing::error!(error = %e, "http task failed");
                Ok(())
            }
        }
    }
}
