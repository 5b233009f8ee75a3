use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use property_intel::config::AppConfig;
use property_intel::error::AppError;
use property_intel::lifecycle::QueuedDispatcher;
use property_intel::telemetry;
use property_intel::Platform;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        service: config.service.clone(),
    };

    // pipeline workers drain this through /api/v1/pipeline/jobs/claim
    let queue = QueuedDispatcher::with_capacity(config.analysis.job_queue_capacity);
    let platform = Platform::in_memory(&config, Arc::new(queue.clone()));

    let app = with_platform_routes(&platform, queue)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        model_version = %config.analysis.model_version,
        job_queue_capacity = config.analysis.job_queue_capacity,
        "property intelligence service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
