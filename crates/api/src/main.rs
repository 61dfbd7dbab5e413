use anyhow::Context;

use bookstore_api::{app, config::AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    bookstore_observability::init();

    let app = app::build_app(&config)
        .await
        .context("failed to initialize services")?;

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
