use super::common::*;
use crate::workflows::empanelment::router::empanelment_router;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(router: &Router, method: &str, uri: &str, payload: Option<Value>) -> Response {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    let request = match payload {
        Some(value) => builder
            .body(Body::from(value.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    };
    router.clone().oneshot(request).await.expect("router responds")
}

async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn intake_payload() -> Value {
    json!({
        "oem": {
            "legal_name": "ClearSky Controls Pvt Ltd",
            "contact_email": "compliance@clearsky.example"
        },
        "device_types": ["esp"],
        "opened_on": "2026-01-05"
    })
}

async fn open_application(router: &Router) -> String {
    let response = send(
        router,
        "POST",
        "/api/v1/empanelment/applications",
        Some(intake_payload()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    body["application_id"]
        .as_str()
        .expect("application id present")
        .to_string()
}

#[tokio::test]
async fn open_endpoint_returns_a_draft_view() {
    let (service, _, _) = build_service();
    let router = empanelment_router(service);

    let response = send(
        &router,
        "POST",
        "/api/v1/empanelment/applications",
        Some(intake_payload()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "draft");
    assert_eq!(body["version"], 1);
    assert!(body.get("recommendation").is_none());
}

#[tokio::test]
async fn status_endpoint_returns_404_for_unknown_ids() {
    let (service, _, _) = build_service();
    let router = empanelment_router(service);

    let response = send(
        &router,
        "GET",
        "/api/v1/empanelment/applications/apcd-999999",
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_mismatch_maps_to_forbidden() {
    let (service, _, _) = build_service();
    let router = empanelment_router(service);
    let id = open_application(&router).await;

    let response = send(
        &router,
        "POST",
        &format!("/api/v1/empanelment/applications/{id}/events"),
        Some(json!({
            "actor": { "user_id": "eval-7", "role": "evaluator" },
            "event": { "type": "submit" }
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn guard_failures_map_to_unprocessable_entity() {
    let (service, _, _) = build_service();
    let router = empanelment_router(service);
    let id = open_application(&router).await;

    // Fees outstanding.
    let response = send(
        &router,
        "POST",
        &format!("/api/v1/empanelment/applications/{id}/events"),
        Some(json!({
            "actor": { "user_id": "oem-42", "role": "applicant" },
            "event": { "type": "submit" }
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().expect("message").contains("fees"));
}

#[tokio::test]
async fn undefined_transitions_map_to_conflict() {
    let (service, _, _) = build_service();
    let router = empanelment_router(service);
    let id = open_application(&router).await;

    let response = send(
        &router,
        "POST",
        &format!("/api/v1/empanelment/applications/{id}/events"),
        Some(json!({
            "actor": { "user_id": "eval-7", "role": "evaluator" },
            "event": { "type": "finalize" }
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn payment_webhook_unlocks_submission() {
    let (service, _, _) = build_service();
    let router = empanelment_router(service);
    let id = open_application(&router).await;

    let response = send(
        &router,
        "POST",
        &format!("/api/v1/empanelment/applications/{id}/payments"),
        Some(json!({
            "device_type": "esp",
            "amount_inr": 25000,
            "reference": "utr-0001",
            "settled_on": "2026-01-06"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &router,
        "POST",
        &format!("/api/v1/empanelment/applications/{id}/events"),
        Some(json!({
            "actor": { "user_id": "oem-42", "role": "applicant" },
            "event": { "type": "submit" }
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "submitted");
    assert_eq!(body["version"], 3);
}

#[tokio::test]
async fn duplicate_webhook_maps_to_unprocessable_entity() {
    let (service, _, _) = build_service();
    let router = empanelment_router(service);
    let id = open_application(&router).await;

    let payload = json!({
        "device_type": "esp",
        "amount_inr": 25000,
        "reference": "utr-0001",
        "settled_on": "2026-01-06"
    });

    let response = send(
        &router,
        "POST",
        &format!("/api/v1/empanelment/applications/{id}/payments"),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &router,
        "POST",
        &format!("/api/v1/empanelment/applications/{id}/payments"),
        Some(payload),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn full_walk_reports_the_final_recommendation() {
    let (service, _, _) = build_service();
    let router = empanelment_router(service);
    let id = open_application(&router).await;

    send(
        &router,
        "POST",
        &format!("/api/v1/empanelment/applications/{id}/payments"),
        Some(json!({
            "device_type": "esp",
            "amount_inr": 25000,
            "reference": "utr-0001",
            "settled_on": "2026-01-06"
        })),
    )
    .await;

    for event in [
        json!({ "type": "submit" }),
        json!({ "type": "route_for_evaluation" }),
    ] {
        let actor = if event["type"] == "submit" {
            json!({ "user_id": "oem-42", "role": "applicant" })
        } else {
            json!({ "user_id": "eval-7", "role": "evaluator" })
        };
        let response = send(
            &router,
            "POST",
            &format!("/api/v1/empanelment/applications/{id}/events"),
            Some(json!({ "actor": actor, "event": event })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let awards: Vec<Value> = MANDATORY_CRITERIA
        .iter()
        .zip(APPROVE_AWARDS)
        .map(|(criterion, awarded)| json!({ "criterion": criterion, "awarded": awarded }))
        .collect();
    let response = send(
        &router,
        "POST",
        &format!("/api/v1/empanelment/applications/{id}/events"),
        Some(json!({
            "actor": { "user_id": "eval-7", "role": "evaluator" },
            "event": { "type": "record_scores", "awards": awards }
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &router,
        "POST",
        &format!("/api/v1/empanelment/applications/{id}/events"),
        Some(json!({
            "actor": { "user_id": "eval-7", "role": "evaluator" },
            "event": { "type": "finalize" }
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["recommendation"], "approve");
    assert_eq!(body["total_score"], 48);
    assert_eq!(body["max_attainable"], 70);

    let response = send(
        &router,
        "GET",
        &format!("/api/v1/empanelment/applications/{id}"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "approved");
}
