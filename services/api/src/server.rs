use crate::cli::ServeArgs;
use crate::infra::{load_directory, sample_roster, AppState};
use crate::routes::with_leave_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use gatepass::config::AppConfig;
use gatepass::error::AppError;
use gatepass::telemetry;
use gatepass::workflows::leave::{InMemoryDirectory, InMemoryLeaveRepository, LeaveWorkflowService};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(path) = args.directory.take() {
        config.directory_path = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let directory = match &config.directory_path {
        Some(path) => {
            let directory = load_directory(path)?;
            info!(path = %path.display(), "roster loaded");
            directory
        }
        None => {
            warn!("no roster configured; serving the sample roster");
            InMemoryDirectory::from_roster(sample_roster())
        }
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let leave_service = Arc::new(LeaveWorkflowService::new(
        Arc::new(InMemoryLeaveRepository::default()),
        Arc::new(directory),
        config.workflow,
    ));

    let app = with_leave_routes(leave_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        conflict_retries = config.workflow.conflict_retries,
        "gate pass service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
