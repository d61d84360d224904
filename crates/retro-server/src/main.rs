//! WebSocket server for the retro board.

use retro_server::config::Config;
use retro_server::server;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = Config::from_env()?;

    info!(
        bind = %config.bind_addr,
        port = config.port,
        max_clients = config.max_clients,
        duplicate_usernames = %config.duplicate_usernames,
        "starting retro-server"
    );

    tokio::select! {
        res = server::run(config) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    }
}
