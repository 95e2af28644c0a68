use std::sync::Arc;

use anyhow::Context;

use partforge_infra::alerts::LowStockRunner;
use partforge_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    partforge_observability::init_with(config.log_format);

    let services = Arc::new(partforge_api::app::services::build_services(&config).await?);

    let runner = config.scan_interval.map(|interval| {
        tracing::info!(interval_secs = interval.as_secs(), "starting low-stock runner");
        LowStockRunner::with_interval(interval).spawn(services.scanner.clone())
    });
    if runner.is_none() {
        tracing::info!("periodic low-stock scan disabled");
    }

    let app = partforge_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(runner) = runner {
        runner.shutdown().await;
    }
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
