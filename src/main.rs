use std::sync::Arc;

use opsleuth::api;
use opsleuth::tools::ToolRegistry;
use opsleuth::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("opsleuth=info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        bind = %config.bind_addr,
        provider = %config.default_provider,
        "starting opsleuth"
    );

    // Domain tools are discovered by the deployment (MCP bridge, sidecar,
    // or static wiring) and handed in here; the engine itself ships none.
    let registry = Arc::new(ToolRegistry::new());

    api::serve(config, registry).await
}
