use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySubmissionRepository, LogNotifier, ReviewerOutbox};
use crate::routes::with_submission_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use er_wait::config::AppConfig;
use er_wait::error::AppError;
use er_wait::telemetry;
use er_wait::waittimes::{ModerationService, SharedSecretAuthorizer};
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

    telemetry::init(&config.telemetry)?;

    if config.admin.password.is_none() {
        warn!("ADMIN_PASSWORD is not set; administrator routes will refuse every request");
    }
    if config.moderation.reviewer_email.is_none() {
        warn!("REVIEWER_EMAIL is not set; reviewer notifications are disabled");
    }

    let outbox = match ReviewerOutbox::from_config(config.moderation.smtp.as_ref()) {
        Ok(ReviewerOutbox::Log(notifier)) => {
            warn!("EMAIL_USER/EMAIL_PASS not both set; reviewer messages are logged, not emailed");
            ReviewerOutbox::Log(notifier)
        }
        Ok(outbox) => outbox,
        Err(err) => {
            warn!(error = %err, "smtp relay unusable; reviewer messages are logged, not emailed");
            ReviewerOutbox::Log(LogNotifier)
        }
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(ModerationService::new(
        Arc::new(InMemorySubmissionRepository::default()),
        Arc::new(outbox),
        config.moderation.clone(),
    ));
    let authorizer = Arc::new(SharedSecretAuthorizer::from_config(&config.admin));

    let app = with_submission_routes(service, authorizer)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "er wait time service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
