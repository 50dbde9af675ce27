//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a Parley relay. It ties the layers
//! together: transport → protocol → session registry → handlers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parley_protocol::JsonCodec;
use parley_transport::{
    Handshake, OriginPolicy, Transport, WebSocketConnection, WebSocketTransport,
};

use crate::{Relay, RelayConfig, RelayError};

/// Builder for configuring and starting a Parley relay.
///
/// # Example
///
/// ```rust,no_run
/// use parley::prelude::*;
///
/// # async fn run() -> Result<(), RelayError> {
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:9090")
///     .origin_policy(OriginPolicy::from_origins(["https://app.example.com"]))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    bind_addr: String,
    config: RelayConfig,
    origin_policy: OriginPolicy,
    handshake_timeout: Option<Duration>,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:9090".to_string(),
            config: RelayConfig::default(),
            origin_policy: OriginPolicy::default(),
            handshake_timeout: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the relay configuration.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets which browser origins may connect.
    pub fn origin_policy(mut self, policy: OriginPolicy) -> Self {
        self.origin_policy = policy;
        self
    }

    /// Sets how long a client may take to complete the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Binds the listener and builds the server.
    pub async fn build(self) -> Result<RelayServer, RelayError> {
        let mut transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_origin_policy(self.origin_policy);
        if let Some(timeout) = self.handshake_timeout {
            transport = transport.with_handshake_timeout(timeout);
        }

        Ok(RelayServer {
            transport,
            relay: Arc::new(Relay::new(self.config)),
        })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Parley relay.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer {
    transport: WebSocketTransport,
    relay: Arc<Relay<WebSocketConnection, JsonCodec>>,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the relay state shared with connection tasks.
    pub fn relay(&self) -> Arc<Relay<WebSocketConnection, JsonCodec>> {
        Arc::clone(&self.relay)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RelayError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves.
    ///
    /// Each accepted socket gets its own task, which completes the upgrade
    /// and then runs the receive loop, so a client that stalls its
    /// handshake only ever holds up itself. Failed upgrades are logged and
    /// never reach the registry. Connections already accepted keep running
    /// after shutdown.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = ?self.local_addr().ok(), "Parley relay running");
        tokio::pin!(shutdown);
        let mut failures = 0u32;

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Parley relay stopping");
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        failures = 0;
                        let relay = Arc::clone(&self.relay);
                        tokio::spawn(async move {
                            let addr = pending.peer_addr();
                            match pending.complete().await {
                                Ok(conn) => {
                                    relay.serve_connection(Arc::new(conn)).await;
                                }
                                Err(e) => {
                                    tracing::info!(%addr, error = %e, "upgrade failed");
                                }
                            }
                        });
                    }
                    Err(e) => {
                        failures = failures.saturating_add(1);
                        let pause = accept_backoff(failures);
                        tracing::warn!(error = %e, ?pause, "accept failed");
                        tokio::time::sleep(pause).await;
                    }
                },
            }
        }
    }
}

/// How long to pause after `failures` consecutive accept errors.
///
/// Starts at 10 ms and doubles up to one second, so a listener that keeps
/// failing (e.g. out of file descriptors) does not spin.
fn accept_backoff(failures: u32) -> Duration {
    const BASE: Duration = Duration::from_millis(10);
    const MAX: Duration = Duration::from_secs(1);

    let shift = failures.saturating_sub(1).min(7);
    (BASE * (1u32 << shift)).min(MAX)
}
