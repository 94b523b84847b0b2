use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;

use super::repository::BrokerStatsRepository;
use super::service::{HealthError, HealthService};
use crate::error::error_response;

/// Router builder exposing the broker health endpoints.
pub fn health_router<R>(service: Arc<HealthService<R>>) -> Router
where
    R: BrokerStatsRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/brokers/:broker_id/health",
            get(score_handler::<R>),
        )
        .route(
            "/api/v1/brokers/:broker_id/health/audit",
            get(audit_handler::<R>),
        )
        .with_state(service)
}

fn health_error_response(error: HealthError) -> Response {
    error_response(error.kind(), error.to_string())
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<HealthService<R>>>,
    Path(broker_id): Path<String>,
) -> Response
where
    R: BrokerStatsRepository + 'static,
{
    match service.score(&broker_id, Utc::now()) {
        Ok(score) => (StatusCode::OK, axum::Json(score)).into_response(),
        Err(error) => health_error_response(error),
    }
}

pub(crate) async fn audit_handler<R>(
    State(service): State<Arc<HealthService<R>>>,
    Path(broker_id): Path<String>,
) -> Response
where
    R: BrokerStatsRepository + 'static,
{
    match service.audit(&broker_id, Utc::now()) {
        Ok(audit) => (StatusCode::OK, axum::Json(audit)).into_response(),
        Err(error) => health_error_response(error),
    }
}
