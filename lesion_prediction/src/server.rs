use crate::{config::Config, model_service::ModelService, routes::api_routes};
use axum::{extract::DefaultBodyLimit, Router};
use std::{path::PathBuf, sync::Arc};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// State handed to every route. Cloning copies the `Arc`, not the model,
/// so `M` itself need not be `Clone`.
pub struct SharedState<M: ModelService> {
    pub model_service: Arc<M>,
    pub scratch_dir: PathBuf,
    pub include_probability: bool,
}

impl<M: ModelService> SharedState<M> {
    pub fn new(model_service: M, scratch_dir: PathBuf, include_probability: bool) -> Self {
        Self {
            model_service: Arc::new(model_service),
            scratch_dir,
            include_probability,
        }
    }
}

impl<M: ModelService> Clone for SharedState<M> {
    fn clone(&self) -> Self {
        Self {
            model_service: self.model_service.clone(),
            scratch_dir: self.scratch_dir.clone(),
            include_probability: self.include_probability,
        }
    }
}

pub fn build_router<M: ModelService>(
    state: SharedState<M>,
    max_body_bytes: Option<usize>,
) -> Router {
    let body_limit = match max_body_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes())
        .with_state(state)
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<M: ModelService>(model_service: M, config: &Config) -> anyhow::Result<Self> {
        let state = SharedState::new(
            model_service,
            config.upload.scratch_dir.clone(),
            config.response.include_probability,
        );
        let router = build_router(state, config.upload.max_body_bytes);

        let listener = TcpListener::bind(config.server.get_address()).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
