use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;

use super::domain::{LeadDraft, LeadId, LeadPatch};
use super::repository::LeadRepository;
use super::service::{LeadError, LeadService};
use crate::error::error_response;
use crate::marketplace::events::EventPublisher;

/// Router builder exposing the lead lifecycle endpoints.
pub fn lead_router<R, E>(service: Arc<LeadService<R, E>>) -> Router
where
    R: LeadRepository + 'static,
    E: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/leads", post(create_handler::<R, E>))
        .route(
            "/api/v1/leads/:lead_id",
            get(get_handler::<R, E>)
                .patch(update_handler::<R, E>)
                .delete(delete_handler::<R, E>),
        )
        .route("/api/v1/leads/:lead_id/post", post(post_handler::<R, E>))
        .route(
            "/api/v1/leads/:lead_id/purchase",
            post(purchase_handler::<R, E>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct PurchaseRequest {
    pub(crate) buyer_id: String,
    pub(crate) buyer_type: String,
}

fn lead_error_response(error: LeadError) -> Response {
    error_response(error.kind(), error.to_string())
}

pub(crate) async fn create_handler<R, E>(
    State(service): State<Arc<LeadService<R, E>>>,
    axum::Json(draft): axum::Json<LeadDraft>,
) -> Response
where
    R: LeadRepository + 'static,
    E: EventPublisher + 'static,
{
    match service.create(draft, Utc::now()) {
        Ok(lead) => (StatusCode::CREATED, axum::Json(lead.view())).into_response(),
        Err(error) => lead_error_response(error),
    }
}

pub(crate) async fn post_handler<R, E>(
    State(service): State<Arc<LeadService<R, E>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    R: LeadRepository + 'static,
    E: EventPublisher + 'static,
{
    match service.post(&LeadId(lead_id), Utc::now()) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead.view())).into_response(),
        Err(error) => lead_error_response(error),
    }
}

pub(crate) async fn purchase_handler<R, E>(
    State(service): State<Arc<LeadService<R, E>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<PurchaseRequest>,
) -> Response
where
    R: LeadRepository + 'static,
    E: EventPublisher + 'static,
{
    match service.purchase(
        &LeadId(lead_id),
        &request.buyer_id,
        &request.buyer_type,
        Utc::now(),
    ) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead.view())).into_response(),
        Err(error) => lead_error_response(error),
    }
}

pub(crate) async fn update_handler<R, E>(
    State(service): State<Arc<LeadService<R, E>>>,
    Path(lead_id): Path<String>,
    axum::Json(patch): axum::Json<LeadPatch>,
) -> Response
where
    R: LeadRepository + 'static,
    E: EventPublisher + 'static,
{
    match service.update(&LeadId(lead_id), patch) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead.view())).into_response(),
        Err(error) => lead_error_response(error),
    }
}

pub(crate) async fn delete_handler<R, E>(
    State(service): State<Arc<LeadService<R, E>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    R: LeadRepository + 'static,
    E: EventPublisher + 'static,
{
    match service.delete(&LeadId(lead_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => lead_error_response(error),
    }
}

pub(crate) async fn get_handler<R, E>(
    State(service): State<Arc<LeadService<R, E>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    R: LeadRepository + 'static,
    E: EventPublisher + 'static,
{
    match service.get(&LeadId(lead_id)) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead.view())).into_response(),
        Err(error) => lead_error_response(error),
    }
}
