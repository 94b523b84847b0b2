use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::domain::{RefundClaim, RefundFilters, RefundRequest, RefundRequestId, RefundStatus};
use super::repository::RefundRequestRepository;
use super::service::{RefundError, RefundService};
use crate::error::{error_response, ErrorKind};
use crate::marketplace::events::EventPublisher;
use crate::marketplace::payments::{PaymentGateway, PaymentRepository};

/// Router builder exposing the refund workflow endpoints.
pub fn refund_router<R, P, G, E>(service: Arc<RefundService<R, P, G, E>>) -> Router
where
    R: RefundRequestRepository + 'static,
    P: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    E: EventPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/refund-requests",
            post(request_handler::<R, P, G, E>).get(list_handler::<R, P, G, E>),
        )
        .route(
            "/api/v1/refund-requests/:request_id",
            get(get_handler::<R, P, G, E>),
        )
        .route(
            "/api/v1/refund-requests/:request_id/approve",
            post(approve_handler::<R, P, G, E>),
        )
        .route(
            "/api/v1/refund-requests/:request_id/deny",
            post(deny_handler::<R, P, G, E>),
        )
        .route(
            "/api/v1/refund-requests/:request_id/request-info",
            post(info_handler::<R, P, G, E>),
        )
        .route(
            "/api/v1/contractors/:contractor_id/refund-requests",
            get(contractor_handler::<R, P, G, E>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) reviewer_id: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DenyRequest {
    pub(crate) reviewer_id: String,
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InfoRequest {
    pub(crate) reviewer_id: String,
    pub(crate) question: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) contractor_id: Option<String>,
    #[serde(default)]
    pub(crate) from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) to: Option<DateTime<Utc>>,
}

impl ListQuery {
    fn into_filters(self) -> Result<RefundFilters, Response> {
        let status = match self.status {
            Some(raw) => Some(RefundStatus::parse(&raw).ok_or_else(|| {
                error_response(
                    ErrorKind::Validation,
                    format!("'{raw}' is not a refund request status"),
                )
            })?),
            None => None,
        };

        Ok(RefundFilters {
            status,
            contractor_id: self.contractor_id,
            from: self.from,
            to: self.to,
        })
    }
}

fn refund_error_response(error: RefundError) -> Response {
    error_response(error.kind(), error.to_string())
}

fn views(requests: Vec<RefundRequest>) -> Response {
    let views: Vec<_> = requests.iter().map(RefundRequest::view).collect();
    (StatusCode::OK, axum::Json(views)).into_response()
}

pub(crate) async fn request_handler<R, P, G, E>(
    State(service): State<Arc<RefundService<R, P, G, E>>>,
    axum::Json(claim): axum::Json<RefundClaim>,
) -> Response
where
    R: RefundRequestRepository + 'static,
    P: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    E: EventPublisher + 'static,
{
    match service.request(claim, Utc::now()) {
        Ok(request) => (StatusCode::CREATED, axum::Json(request.view())).into_response(),
        Err(error) => refund_error_response(error),
    }
}

pub(crate) async fn get_handler<R, P, G, E>(
    State(service): State<Arc<RefundService<R, P, G, E>>>,
    Path(request_id): Path<String>,
) -> Response
where
    R: RefundRequestRepository + 'static,
    P: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    E: EventPublisher + 'static,
{
    match service.get(&RefundRequestId(request_id)) {
        Ok(request) => (StatusCode::OK, axum::Json(request.view())).into_response(),
        Err(error) => refund_error_response(error),
    }
}

pub(crate) async fn list_handler<R, P, G, E>(
    State(service): State<Arc<RefundService<R, P, G, E>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: RefundRequestRepository + 'static,
    P: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    E: EventPublisher + 'static,
{
    let filters = match query.into_filters() {
        Ok(filters) => filters,
        Err(response) => return response,
    };

    match service.list(&filters) {
        Ok(requests) => views(requests),
        Err(error) => refund_error_response(error),
    }
}

pub(crate) async fn contractor_handler<R, P, G, E>(
    State(service): State<Arc<RefundService<R, P, G, E>>>,
    Path(contractor_id): Path<String>,
) -> Response
where
    R: RefundRequestRepository + 'static,
    P: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    E: EventPublisher + 'static,
{
    match service.list_for_contractor(&contractor_id) {
        Ok(requests) => views(requests),
        Err(error) => refund_error_response(error),
    }
}

pub(crate) async fn approve_handler<R, P, G, E>(
    State(service): State<Arc<RefundService<R, P, G, E>>>,
    Path(request_id): Path<String>,
    axum::Json(review): axum::Json<ReviewRequest>,
) -> Response
where
    R: RefundRequestRepository + 'static,
    P: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    E: EventPublisher + 'static,
{
    match service.approve(
        &RefundRequestId(request_id),
        &review.reviewer_id,
        review.notes,
        Utc::now(),
    ) {
        Ok(request) => (StatusCode::OK, axum::Json(request.view())).into_response(),
        Err(error) => refund_error_response(error),
    }
}

pub(crate) async fn deny_handler<R, P, G, E>(
    State(service): State<Arc<RefundService<R, P, G, E>>>,
    Path(request_id): Path<String>,
    axum::Json(review): axum::Json<DenyRequest>,
) -> Response
where
    R: RefundRequestRepository + 'static,
    P: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    E: EventPublisher + 'static,
{
    match service.deny(
        &RefundRequestId(request_id),
        &review.reviewer_id,
        &review.reason,
        Utc::now(),
    ) {
        Ok(request) => (StatusCode::OK, axum::Json(request.view())).into_response(),
        Err(error) => refund_error_response(error),
    }
}

pub(crate) async fn info_handler<R, P, G, E>(
    State(service): State<Arc<RefundService<R, P, G, E>>>,
    Path(request_id): Path<String>,
    axum::Json(info): axum::Json<InfoRequest>,
) -> Response
where
    R: RefundRequestRepository + 'static,
    P: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    E: EventPublisher + 'static,
{
    match service.request_more_info(
        &RefundRequestId(request_id),
        &info.reviewer_id,
        &info.question,
        Utc::now(),
    ) {
        Ok(request) => (StatusCode::OK, axum::Json(request.view())).into_response(),
        Err(error) => refund_error_response(error),
    }
}
