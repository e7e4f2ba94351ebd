use diff_service::config::DiffConfig;
use diff_service::startup::Application;
use service_core::observability::{init_metrics, init_tracing};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let otlp_endpoint = std::env::var("OTLP_ENDPOINT")
        .ok()
        .filter(|endpoint| !endpoint.trim().is_empty());
    init_tracing("diff-service", "info", otlp_endpoint.as_deref());
    init_metrics();

    let config = DiffConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    if config.is_cloud_mode() {
        tracing::info!("Running in cloud mode");
    } else {
        tracing::info!(
            "Running in local mode; access the service at http://{}:{}",
            config.common.host,
            config.common.port
        );
    }

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
