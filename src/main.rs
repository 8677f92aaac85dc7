use std::sync::Arc;

use anyhow::Context;

use leadstack_api::config::AppConfig;
use leadstack_api::routes;
use leadstack_api::runtime::TenantRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadstack_api=info,tower_http=info".into()),
        )
        .init();

    let missing = AppConfig::missing_required();
    if !missing.is_empty() {
        anyhow::bail!("Missing required environment variables: {}", missing.join(", "));
    }
    let config = AppConfig::from_env().context("loading configuration")?;
    let port = config.server.port;

    let runtime = Arc::new(TenantRuntime::new(config).context("building runtime")?);

    // Warm-up only; registry tables are bootstrapped when the master pool
    // first opens, so a late-starting database is retried per request
    if let Err(e) = runtime.initialize().await {
        tracing::warn!("Master database unavailable at startup: {}", e);
    }

    let app = routes::app(runtime.clone());

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;

    tracing::info!("leadstack-api listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(runtime.clone()))
        .await
        .context("server")?;

    Ok(())
}

async fn shutdown_signal(runtime: Arc<TenantRuntime>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down");
    runtime.databases.close_all().await;
}
