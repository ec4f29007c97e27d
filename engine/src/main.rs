use metrics_exporter_prometheus::PrometheusBuilder;
use phishguard_engine::{
    config::Config,
    model::{Classifier, LogisticModel},
    routes::{self, AppState},
    whois::WhoisClient,
    FeatureExtractor, PhishingEngine, FEATURE_COUNT, SCHEMA_VERSION,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Loaded configuration: {:?}", config);
    info!("Feature schema {} with {} columns", SCHEMA_VERSION, FEATURE_COUNT);

    let metrics = PrometheusBuilder::new().install_recorder()?;

    // A missing model keeps the service up; prediction endpoints report it.
    let model: Option<Arc<dyn Classifier>> = match LogisticModel::load(&config.model_path) {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            error!("Failed to load model: {}", e);
            None
        }
    };

    let extractor = FeatureExtractor::new(WhoisClient::new(config.whois.clone()));
    let engine = PhishingEngine::new(extractor, model);
    let app = routes::router(AppState::new(engine).with_metrics(metrics));

    let addr: SocketAddr = config.bind_addr.parse()?;
    info!("Starting phishing URL classifier on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install signal handler: {}", e);
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

    warn!("Shutdown signal received, starting graceful shutdown");
}
