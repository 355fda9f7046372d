use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use relaybot_core::config::RelayConfig;
use relaybot_relay::RelayEngine;
use relaybot_store::Store;
use relaybot_telegram::TelegramClient;

mod app;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relaybot_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("RELAYBOT_CONFIG").ok();
    let config = RelayConfig::load(config_path.as_deref())?;

    let store = Store::open(&config.store.path)?;
    let telegram = TelegramClient::new(&config.bot_token);
    let engine = RelayEngine::new(store, telegram, config.admin_group_id);

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let state = Arc::new(app::AppState::new(config, engine));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("relaybot gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
