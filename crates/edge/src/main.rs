use careerhub_auth::RouteClassifier;
use careerhub_edge::app::{EdgeConfig, build_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    careerhub_observability::init();

    let config = EdgeConfig::from_env()?;
    let app = build_app(RouteClassifier::default());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("edge listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
