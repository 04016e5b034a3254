// wgkeeper: WireGuard peer manager daemon. Allocates addresses, keeps
// wg0.conf and the sqlite record store in sync, serves a JSON API.

mod api;
mod artifacts;
mod error;
mod keys;
mod service;
mod settings;
mod store;
mod wg;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    for arg in std::env::args().skip(1) {
        if arg == "--version" || arg == "-V" {
            println!("wgkeeper-server {VERSION}");
            return Ok(());
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Arc::new(settings::load());
    std::fs::create_dir_all(&settings.data_dir)?;

    let pool = store::connect(&settings.db_path()).await?;
    let peer_store = store::PeerStore::new(pool);
    peer_store.init().await?;

    let manager = Arc::new(service::PeerManager::new(settings.clone(), peer_store));

    // Startup is the only point where file/store drift is reconciled.
    if settings.import_on_start {
        let imported = manager.import_from_conf().await?;
        if imported > 0 {
            info!(imported, "imported peers from config file");
        }
    }

    let app = api::router(api::AppState { manager });
    let listener = tokio::net::TcpListener::bind(settings.listen_addr).await?;
    info!(addr = %settings.listen_addr, interface = %settings.interface, "wgkeeper listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM (Unix); systemd may restart the unit after exit.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
