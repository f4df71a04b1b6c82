use std::net::SocketAddr;

use contracts_gateway::{
    config::GatewayConfig,
    gateway::{self, GatewayState},
    init_tracing, shutdown_signal,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GatewayConfig::from_env()?;
    let app = gateway::router(GatewayState::new(&config));

    let listener = TcpListener::bind(config.server_addr()).await?;
    tracing::info!("Gateway running on http://{}", listener.local_addr()?);
    tracing::info!("UI -> {}", config.ui_target.as_str());
    tracing::info!("API -> {}", config.api_target.as_str());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
