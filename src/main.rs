use std::sync::Arc;

use contracts_gateway::{
    config::ServerConfig,
    db::ContractStore,
    handlers::{self, AppState},
    init_tracing,
    services::HttpAnalysisService,
    shutdown_signal,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::from_env()?;
    let store = Arc::new(ContractStore::new(config.contracts_file.clone()));
    let llm = Arc::new(HttpAnalysisService::new(
        &config.llm_api_url,
        config.llm_timeout(),
    )?);
    let app = handlers::router(AppState::new(store, llm), &config.public_dir);

    let listener = TcpListener::bind(config.server_addr()).await?;
    tracing::info!("Contracts server listening on http://{}", listener.local_addr()?);
    tracing::info!("Contracts file: {}", config.contracts_file.display());
    tracing::info!("LLM API URL: {}", config.llm_api_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
