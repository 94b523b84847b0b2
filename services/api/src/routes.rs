use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::json;

use leadmarket::marketplace::health::{health_router, HealthService};
use leadmarket::marketplace::leads::{lead_router, LeadService};
use leadmarket::marketplace::refunds::{refund_router, RefundService};

use crate::infra::{AppState, LoggingEventPublisher, MemoryStore, StubPaymentGateway};

pub(crate) type MarketLeadService = LeadService<MemoryStore, LoggingEventPublisher>;
pub(crate) type MarketRefundService =
    RefundService<MemoryStore, MemoryStore, StubPaymentGateway, LoggingEventPublisher>;
pub(crate) type MarketHealthService = HealthService<MemoryStore>;

pub(crate) fn marketplace_routes(
    leads: Arc<MarketLeadService>,
    refunds: Arc<MarketRefundService>,
    health: Arc<MarketHealthService>,
) -> axum::Router {
    lead_router(leads)
        .merge(refund_router(refunds))
        .merge(health_router(health))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
