use crate::cli::ServeArgs;
use crate::infra::{
    AppState, BrokerRecord, LoggingEventPublisher, MemoryStore, StubPaymentGateway,
};
use crate::routes::marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use leadmarket::config::AppConfig;
use leadmarket::error::AppError;
use leadmarket::marketplace::health::HealthService;
use leadmarket::marketplace::leads::LeadService;
use leadmarket::marketplace::refunds::RefundService;
use leadmarket::telemetry;
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

    let store = Arc::new(MemoryStore::default());
    bootstrap_store(&store);

    let gateway = Arc::new(StubPaymentGateway::default());
    let events = Arc::new(LoggingEventPublisher);

    let lead_service = Arc::new(LeadService::new(store.clone(), events.clone()));
    let refund_service = Arc::new(RefundService::new(
        store.clone(),
        store.clone(),
        gateway,
        events,
        &config.marketplace,
    ));
    let health_service = Arc::new(HealthService::new(store));

    let app = marketplace_routes(lead_service, refund_service, health_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead marketplace service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Register a starter broker and a few jobs so the in-memory deployment is
/// usable out of the box.
fn bootstrap_store(store: &MemoryStore) {
    let now = Utc::now();
    store.seed_broker(BrokerRecord {
        broker_id: "brk-001".to_string(),
        created_at: now,
        last_activity: Some(now),
        contractor_count: 3,
        hes_assessor_count: 1,
        inspector_count: 1,
    });
    for (job_ref, service_type) in [
        ("job-100", "insulation"),
        ("job-101", "hvac"),
        ("job-102", "air_sealing"),
    ] {
        store.seed_job(job_ref, "brk-001", service_type);
    }
    info!("seeded starter broker brk-001 with jobs job-100..job-102");
}
