use crate::cli::ServeArgs;
use crate::infra::{load_roster, AppState, BookingBackend};
use crate::routes::{with_scheduling_routes, RegistrationState};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use interview_match::config::AppConfig;
use interview_match::error::AppError;
use interview_match::scheduling::{SchedulingQueue, SchedulingService};
use interview_match::telemetry;
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
    if let Some(path) = args.candidates.take() {
        config.scheduling.candidates_csv = Some(path);
    }
    if let Some(path) = args.interviewers.take() {
        config.scheduling.interviewers_csv = Some(path);
    }
    if let Some(path) = args.ledger.take() {
        config.scheduling.bookings_csv = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let roster = Arc::new(load_roster(&config.scheduling)?);
    let store = Arc::new(BookingBackend::from_path(
        config.scheduling.bookings_csv.clone(),
    ));
    let service = Arc::new(SchedulingService::new(
        roster.clone(),
        store,
        &config.scheduling.calendar,
    )?);
    service.warm_scores();

    let (queue, worker) = SchedulingQueue::spawn(service.clone());
    let registration = RegistrationState {
        roster,
        queue,
        min_gate_score: config.scheduling.min_gate_score,
    };

    let app = with_scheduling_routes(service.clone())
        .layer(Extension(app_state))
        .layer(Extension(registration))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "interview scheduler ready");

    axum::serve(listener, app).await?;

    let processed = worker.join().await;
    let flushed = service.flush_pending()?;
    info!(processed, flushed, "interview scheduler stopped");
    Ok(())
}
