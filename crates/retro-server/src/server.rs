//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Accepts new TCP connections, up to `max_clients` at a time.
//! - Spawns a per-connection task that performs the WebSocket handshake
//!   and runs the session.
//!
//! Room tasks are spawned on demand by the `RoomRegistry`; the per-client
//! logic and room loop live in `client` and `room_task` respectively.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::client;
use crate::config::Config;
use crate::registry::RoomRegistry;

/// Counts live connections; decremented when the connection task ends.
struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard { active }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bind to the configured address and serve until the process stops.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");

    let registry = Arc::new(RoomRegistry::new(config.duplicate_usernames));
    serve(listener, config, registry).await
}

/// Accept loop over an already bound listener.
///
/// Takes the registry from the caller so tests can observe room lifecycle.
pub async fn serve(
    listener: TcpListener,
    config: Config,
    registry: Arc<RoomRegistry>,
) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let active = Arc::new(AtomicUsize::new(0));

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        if active.load(Ordering::SeqCst) >= config.max_clients {
            warn!(%peer, max_clients = config.max_clients, "rejecting connection: max_clients reached");
            // Just drop the stream; the client sees the connection closed.
            continue;
        }

        if let Err(e) = stream.set_nodelay(true) {
            debug!(%peer, error = %e, "set_nodelay failed");
        }

        let guard = ConnectionGuard::new(Arc::clone(&active));
        let registry = Arc::clone(&registry);
        let config = Arc::clone(&config);
        info!(%peer, active = active.load(Ordering::SeqCst), "accepted connection");

        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = client::run_client(stream, peer, registry, config).await {
                warn!(%peer, error = %e, "connection error");
            }
        });
    }
}
