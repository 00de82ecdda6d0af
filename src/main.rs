//! access-sentinel entrypoint: load the trained model once, then serve uploads and results.
//! Refuses to start without a readable model.

use access_sentinel::{
    config::ServiceConfig,
    features::FeatureExtractor,
    logging::StructuredLogger,
    model::IsolationForest,
    scoring::ScoringEngine,
    service::{router, PipelineService},
    storage::open_store,
};
use std::sync::Arc;
use tracing::{error, info};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = ServiceConfig::path_from_env();
    let config = ServiceConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(config = ?config_path, model_path = ?config.model_path, "access-sentinel starting");

    let model = match IsolationForest::load(&config.model_path) {
        Ok(m) => Arc::new(m),
        Err(e) => {
            error!(path = %config.model_path.display(), error = %e, "cannot load model; refusing to start");
            return Err(e.into());
        }
    };
    info!(
        trees = model.n_trees(),
        threshold = model.threshold(),
        "model loaded"
    );

    let store = open_store(&config.storage)?;
    info!(backend = ?config.storage.backend, path = ?config.storage.path, "results store ready");

    let scoring = ScoringEngine::new(FeatureExtractor::new(config.features.clone()), model);
    let service = Arc::new(PipelineService::new(scoring, store, config.upload_dir.clone()));
    let app = router(service, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    info!(addr = %config.server.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("access-sentinel stopped");
    Ok(())
}
