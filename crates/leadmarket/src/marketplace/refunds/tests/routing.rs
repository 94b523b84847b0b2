use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::marketplace::refunds::router::refund_router;

async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn claim_payload(contractor_id: &str, lead_id: &str, reason: &str) -> Value {
    json!({
        "contractor_id": contractor_id,
        "lead_id": lead_id,
        "lead_kind": "standard",
        "reason": reason,
        "reason_category": "bad_contact_info",
        "notes": "called three times"
    })
}

fn post_json(uri: &str, payload: &Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(payload).expect("serialize payload"),
        ))
        .expect("request builds")
}

#[tokio::test]
async fn request_route_files_a_claim() {
    let ctx = build_service();
    ctx.payments.seed(payment("ctr-001", "lead-001", 45_00));
    let router = refund_router(Arc::new(ctx.service));

    let response = router
        .oneshot(post_json(
            "/api/v1/refund-requests",
            &claim_payload("ctr-001", "lead-001", "homeowner unreachable"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("pending")));
    assert!(payload.get("risk_score").is_some());
}

#[tokio::test]
async fn request_route_maps_missing_payment_to_not_found() {
    let ctx = build_service();
    let router = refund_router(Arc::new(ctx.service));

    let response = router
        .oneshot(post_json(
            "/api/v1/refund-requests",
            &claim_payload("ctr-404", "lead-404", "no payment exists"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("kind"), Some(&json!("not_found")));
}

#[tokio::test]
async fn approve_route_finalizes_the_request() {
    let ctx = build_service();
    ctx.payments.seed(payment("ctr-001", "lead-001", 45_00));
    let request = ctx
        .service
        .request(claim("ctr-001", "lead-001"), now())
        .expect("request files");
    let router = refund_router(Arc::new(ctx.service));

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/refund-requests/{}/approve", request.id.0),
            &json!({ "reviewer_id": "ops-7", "notes": "verified" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("approved")));
    assert_eq!(payload.get("reviewed_by"), Some(&json!("ops-7")));
}

#[tokio::test]
async fn deny_route_maps_terminal_state_to_conflict() {
    let ctx = build_service();
    ctx.payments.seed(payment("ctr-001", "lead-001", 45_00));
    let request = ctx
        .service
        .request(claim("ctr-001", "lead-001"), now())
        .expect("request files");
    ctx.service
        .approve(&request.id, "ops-7", None, now())
        .expect("approve succeeds");
    let router = refund_router(Arc::new(ctx.service));

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/refund-requests/{}/deny", request.id.0),
            &json!({ "reviewer_id": "ops-8", "reason": "second opinion" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_route_filters_by_status() {
    let ctx = build_service();
    ctx.payments.seed(payment("ctr-001", "lead-001", 45_00));
    ctx.service
        .request(claim("ctr-001", "lead-001"), now())
        .expect("request files");
    let router = refund_router(Arc::new(ctx.service));

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/refund-requests?status=pending")
                .body(axum::body::Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn list_route_rejects_unknown_status_filter() {
    let ctx = build_service();
    let router = refund_router(Arc::new(ctx.service));

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/refund-requests?status=limbo")
                .body(axum::body::Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn contractor_route_scopes_the_listing() {
    let ctx = build_service();
    ctx.payments.seed(payment("ctr-001", "lead-001", 45_00));
    ctx.payments.seed(payment("ctr-002", "lead-002", 55_00));
    ctx.service
        .request(claim("ctr-001", "lead-001"), now())
        .expect("first request files");
    ctx.service
        .request(claim("ctr-002", "lead-002"), now())
        .expect("second request files");
    let router = refund_router(Arc::new(ctx.service));

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/contractors/ctr-002/refund-requests")
                .body(axum::body::Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let rows = payload.as_array().expect("array payload");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("contractor_id"), Some(&json!("ctr-002")));
}
