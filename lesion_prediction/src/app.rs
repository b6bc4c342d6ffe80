use crate::{config::Config, ort_service::OrtModelService, server::HttpServer};

/// Prepares the scratch directory and the classifier, then serves until a
/// shutdown signal arrives. Any failure here stops the process before the
/// listener accepts a request.
pub async fn start_app(config: Config) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.upload.scratch_dir).await?;
    tracing::info!(
        "Staging uploads in {}",
        config.upload.scratch_dir.display()
    );

    let model_service = match OrtModelService::new(&config.model) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to load classifier: {}", e);
            return Err(e.into());
        }
    };

    let server = HttpServer::new(model_service, &config).await?;
    server.run().await
}
