use super::common::*;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::waittimes::auth::ADMIN_CREDENTIAL_HEADER;
use crate::waittimes::ModerationService;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

fn admin_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(ADMIN_CREDENTIAL_HEADER, ADMIN_SECRET)
        .body(Body::empty())
        .expect("request builds")
}

fn public_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn submit_route_creates_pending_record() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/submissions",
            json!({ "hospitalName": "Mercy West", "waitTime": 25, "status": "approved" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["submission"]["status"], json!("pending"));
    assert_eq!(payload["submission"]["waitTime"], json!(25));
    assert_eq!(payload["notification"]["status"], json!("skipped"));
    assert!(payload["submission"]["id"].is_string());
}

#[tokio::test]
async fn submit_route_rejects_invalid_wait_time() {
    let (service, repository, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/submissions",
            json!({ "hospitalName": "Mercy West", "waitTime": "abc" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("waitTime"));
    assert_eq!(repository.len(), 0);
}

#[tokio::test]
async fn submit_route_rejects_malformed_json() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/submissions")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{ not json"))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_require_credential() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let missing = router
        .clone()
        .oneshot(public_get("/api/submissions/pending"))
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = router
        .oneshot(
            Request::put("/api/submissions/wt-000001/approve")
                .header(ADMIN_CREDENTIAL_HEADER, "letmein")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn moderation_routes_drive_the_lifecycle() {
    let (service, _, _) = build_service();
    let service = Arc::new(service);
    let first = service
        .submit_at(intake("HospitalA", 30), at(4, 9))
        .expect("submitted")
        .submission
        .id;
    let second = service
        .submit_at(intake("HospitalA", 45), at(4, 10))
        .expect("submitted")
        .submission
        .id;
    let router = crate::waittimes::submission_router(service, authorizer());

    let pending = router
        .clone()
        .oneshot(admin_request(Method::GET, "/api/submissions/pending"))
        .await
        .expect("route executes");
    assert_eq!(pending.status(), StatusCode::OK);
    assert_eq!(read_json_body(pending).await.as_array().map(Vec::len), Some(2));

    for id in [&first, &second] {
        let approved = router
            .clone()
            .oneshot(admin_request(
                Method::PUT,
                &format!("/api/submissions/{}/approve", id.0),
            ))
            .await
            .expect("route executes");
        assert_eq!(approved.status(), StatusCode::OK);
        assert_eq!(read_json_body(approved).await["status"], json!("approved"));
    }

    let current = router
        .clone()
        .oneshot(public_get("/api/wait-times/current"))
        .await
        .expect("route executes");
    assert_eq!(current.status(), StatusCode::OK);
    assert_eq!(
        read_json_body(current).await["HospitalA"]["waitTime"],
        json!(45)
    );

    let rejected = router
        .clone()
        .oneshot(admin_request(
            Method::PUT,
            &format!("/api/submissions/{}/reject", second.0),
        ))
        .await
        .expect("route executes");
    assert_eq!(read_json_body(rejected).await["status"], json!("rejected"));

    let history = router
        .clone()
        .oneshot(public_get("/api/wait-times/history"))
        .await
        .expect("route executes");
    let history = read_json_body(history).await;
    assert_eq!(history.as_array().map(Vec::len), Some(1));
    assert_eq!(history[0]["id"], json!(first.0));

    let trends = router
        .clone()
        .oneshot(public_get("/api/wait-times/trends"))
        .await
        .expect("route executes");
    assert_eq!(
        read_json_body(trends).await,
        json!({ "HospitalA": { "Tuesday": 30 } })
    );

    let deleted = router
        .clone()
        .oneshot(admin_request(
            Method::DELETE,
            &format!("/api/submissions/{}", first.0),
        ))
        .await
        .expect("route executes");
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(read_json_body(deleted).await["deleted"], json!(first.0));

    let again = router
        .clone()
        .oneshot(admin_request(
            Method::DELETE,
            &format!("/api/submissions/{}", first.0),
        ))
        .await
        .expect("route executes");
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let approved = router
        .oneshot(admin_request(Method::GET, "/api/submissions/approved"))
        .await
        .expect("route executes");
    assert_eq!(read_json_body(approved).await, json!([]));
}

#[tokio::test]
async fn approve_route_returns_not_found_for_unknown_id() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(admin_request(
            Method::PUT,
            "/api/submissions/wt-424242/approve",
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn read_views_are_empty_without_approved_reports() {
    let (service, _, _) = build_service();
    service
        .submit_at(intake("HospitalA", 30), at(4, 9))
        .expect("submitted");
    let router = router_with_service(service);

    for (uri, expected) in [
        ("/api/wait-times/current", json!({})),
        ("/api/wait-times/history", json!([])),
        ("/api/wait-times/trends", json!({})),
    ] {
        let response = router
            .clone()
            .oneshot(public_get(uri))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json_body(response).await, expected, "{uri}");
    }
}

#[tokio::test]
async fn store_outage_returns_internal_error() {
    let service = ModerationService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryNotifier::default()),
        moderation_config(),
    );
    let router = router_with_service(service);

    let pending = router
        .clone()
        .oneshot(admin_request(Method::GET, "/api/submissions/pending"))
        .await
        .expect("route executes");
    assert_eq!(pending.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let current = router
        .oneshot(public_get("/api/wait-times/current"))
        .await
        .expect("route executes");
    assert_eq!(current.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn send_email_route_notifies_reviewer() {
    let (service, repository, notifier) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/send-email",
            json!({ "hospitalName": "Mercy West", "newWaitTime": 40 }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["success"], json!(true));
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("Mercy West"));
    assert_eq!(repository.len(), 0);
}

#[tokio::test]
async fn notification_failure_returns_internal_error() {
    let repository = Arc::new(MemoryRepository::default());
    let service = ModerationService::new(
        repository.clone(),
        Arc::new(FailingNotifier),
        moderation_config(),
    );
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/notifications/reviewer",
            json!({ "hospitalName": "Mercy West", "newWaitTime": 40 }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(read_json_body(response).await["success"], json!(false));
    assert_eq!(repository.len(), 0);
}
