mod config;
mod errors;
mod market;
mod pricing;
mod server;

use crate::market::provider::YahooFinanceProvider;
use crate::market::store::FsSnapshotStore;
use crate::pricing::facade::PricingFacade;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    tracing::info!("option pricing service starting");

    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let provider = YahooFinanceProvider::new(&cfg.quote_base_url);
    let snapshots = FsSnapshotStore::new(&cfg.data_dir);
    let facade = Arc::new(PricingFacade::with_rate_symbol(
        provider,
        snapshots,
        &cfg.rate_symbol,
    ));

    let app = server::router(facade);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.server_port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("bind error on {addr}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("listening on {addr}");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
