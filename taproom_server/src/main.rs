use taproom::Authority;
use taproom_server::{router, AppState, DrinkStore, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let authority = Authority::from_config(config.auth())?;

    let state = AppState {
        authority,
        store: DrinkStore::seeded(),
    };

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    tracing::info!(addr = %config.listen_addr(), "listening");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
