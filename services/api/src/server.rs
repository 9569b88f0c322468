use crate::cli::ServeArgs;
use crate::infra::{load_seed, AppState, NoticeLog};
use crate::routes::with_registration_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use orgportal::config::AppConfig;
use orgportal::error::AppError;
use orgportal::telemetry;
use orgportal::workflows::registration::{
    AttemptLimiter, ExpiryPolicy, ExpiryScheduler, InMemoryRegistrationRepository,
    RegistrationService, RequirementTable,
};
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryRegistrationRepository::default());
    let notices = Arc::new(NoticeLog);
    let service = Arc::new(RegistrationService::with_policies(
        repository,
        notices,
        RequirementTable::standard(),
        ExpiryPolicy::from(&config.expiry),
    ));
    if let Some(path) = args.seed.take() {
        load_seed(&service, &path)?;
    }
    let limiter = Arc::new(AttemptLimiter::new(config.throttle));

    ExpiryScheduler::new(service.clone(), config.expiry.sweep_at).spawn();

    let app = with_registration_routes(service, limiter)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "organization portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
