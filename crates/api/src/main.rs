use bugtrail_api::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bugtrail_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using insecure development secret");
        "insecure-dev-secret".to_string()
    });

    let app = app::build_app(jwt_secret.as_bytes()).await?;

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!(addr = %listener.local_addr()?, "bugtrail api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
