//! HTTP contract tests driving the router in-process.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pretty_assertions::assert_eq;
use scoreazy_core::config::{AdminConfig, ServiceConfig};
use scoreazy_core::notify::{MemoryNotifier, NotificationDispatcher};
use scoreazy_core::rate_guard::SlidingWindowGuard;
use scoreazy_core::SubmissionStore;
use scoreazy_service::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    _dir: tempfile::TempDir,
    app: Router,
}

fn test_app_with(admin: AdminConfig) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = ServiceConfig::default();
    cfg.admin = admin;
    cfg.database.path = dir.path().join("contacts.db").to_string_lossy().into_owned();

    let store = SubmissionStore::open(std::path::Path::new(&cfg.database.path), &cfg.database)
        .unwrap();
    let dispatcher =
        NotificationDispatcher::new(Arc::new(MemoryNotifier::new()), cfg.notifications.clone());
    let guard = Arc::new(SlidingWindowGuard::from_config(&cfg.rate_limit));
    let state = AppState::new(&cfg, store, guard, dispatcher);
    TestApp {
        _dir: dir,
        app: router(state),
    }
}

fn test_app() -> TestApp {
    test_app_with(AdminConfig {
        username: Some("admin".to_string()),
        password: Some("s3cret".to_string()),
    })
}

fn basic_auth() -> String {
    format!("Basic {}", STANDARD.encode("admin:s3cret"))
}

fn peer(last_octet: u8) -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([198, 51, 100, last_octet], 40000)))
}

async fn send(app: &Router, mut request: Request<Body>, from: u8) -> Response {
    request.extensions_mut().insert(peer(from));
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_contact(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::REFERER, "https://scoreazy.com/contact")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth());
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn jane() -> Value {
    json!({
        "name": "Jane Doe",
        "email": "Jane@Ex.com",
        "phone": "+911234567890",
        "message": "I need help with math."
    })
}

#[tokio::test]
async fn jane_doe_end_to_end() {
    let t = test_app();

    let response = send(&t.app, post_contact(&jane()), 1).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["success"], true);
    assert_eq!(
        created["message"],
        "Thank you for your message! We'll get back to you within 24 hours."
    );
    assert_eq!(created["data"]["email"], "jane@ex.com");
    assert_eq!(created["data"]["name"], "Jane Doe");
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert!(created["data"]["submittedAt"].as_str().unwrap().ends_with('Z'));

    // Admin search without credentials is challenged.
    let anonymous = Request::builder()
        .uri("/admin/contacts?search=jane")
        .body(Body::empty())
        .unwrap();
    let response = send(&t.app, anonymous, 2).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        "Basic realm=\"Admin Access\""
    );

    let response = send(&t.app, admin_request("GET", "/admin/contacts?search=jane", None), 2).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed["data"]["contacts"][0]["id"], id.as_str());
    assert_eq!(listed["data"]["contacts"][0]["status"], "new");
    assert_eq!(listed["data"]["contacts"][0]["source"], "https://scoreazy.com/contact");
    assert_eq!(
        listed["data"]["pagination"],
        json!({"currentPage": 1, "totalPages": 1, "totalItems": 1, "itemsPerPage": 20})
    );

    let response = send(
        &t.app,
        admin_request(
            "PUT",
            &format!("/admin/contacts/{id}"),
            Some(json!({"status": "converted"})),
        ),
        2,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["data"]["status"], "converted");

    let response = send(&t.app, admin_request("GET", "/api/contact/stats", None), 2).await;
    let stats = body_json(response).await;
    assert_eq!(stats["data"]["total"], 1);
    assert_eq!(stats["data"]["converted"], 1);
    assert_eq!(stats["data"]["recent"], 1);

    let response = send(&t.app, admin_request("GET", "/admin", None), 2).await;
    let dashboard = body_json(response).await;
    assert_eq!(dashboard["data"]["recentContacts"][0]["id"], id.as_str());
    assert_eq!(dashboard["data"]["stats"]["recentMonth"], 1);

    let response = send(&t.app, admin_request("GET", "/admin/export", None), 2).await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=contacts-"));
    assert!(disposition.ends_with(".csv"));
    let csv = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(csv.to_vec()).unwrap();
    assert!(csv.starts_with("Name,Email,Phone,Message,Status,Created At\n\"Jane Doe\""));

    let response = send(&t.app, admin_request("DELETE", &format!("/admin/contacts/{id}"), None), 2).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&t.app, admin_request("GET", &format!("/admin/contacts/{id}"), None), 2).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Contact not found");
}

#[tokio::test]
async fn validation_errors_list_fields() {
    let t = test_app();
    let mut body = jane();
    body["phone"] = json!("12-34");
    body["name"] = json!("J");

    let response = send(&t.app, post_contact(&body), 1).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Validation failed");
    assert_eq!(
        json["errors"],
        json!([
            {"field": "name", "msg": "Name must be between 2 and 100 characters"},
            {"field": "phone", "msg": "Please enter a valid phone number"}
        ])
    );
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let t = test_app();
    assert_eq!(send(&t.app, post_contact(&jane()), 1).await.status(), StatusCode::CREATED);

    let response = send(&t.app, post_contact(&jane()), 2).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_json(response).await["message"],
        "You have already submitted a contact form recently. Please wait 24 hours before submitting again."
    );
}

#[tokio::test]
async fn sixth_request_from_one_origin_is_rate_limited() {
    let t = test_app();
    for _ in 0..5 {
        let malformed = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = send(&t.app, malformed, 7).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = send(&t.app, post_contact(&jane()), 7).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(
        body_json(response).await["message"],
        "Too many contact form submissions from this IP, please try again later."
    );

    // Other origins are unaffected.
    assert_eq!(send(&t.app, post_contact(&jane()), 8).await.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn status_alias_rejects_unknown_status() {
    let t = test_app();
    let created = body_json(send(&t.app, post_contact(&jane()), 1).await).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let response = send(
        &t.app,
        admin_request(
            "PUT",
            &format!("/api/contact/{id}/status"),
            Some(json!({"status": "archived"})),
        ),
        2,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid status value");

    let response = send(
        &t.app,
        admin_request(
            "PUT",
            &format!("/api/contact/{id}/status"),
            Some(json!({"status": "contacted"})),
        ),
        2,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&t.app, admin_request("GET", "/api/contact?status=contacted", None), 2).await;
    let listed = body_json(response).await;
    assert_eq!(listed["data"]["pagination"]["itemsPerPage"], 10);
    assert_eq!(listed["data"]["contacts"][0]["status"], "contacted");
}

#[tokio::test]
async fn admin_is_closed_without_configured_credentials() {
    let t = test_app_with(AdminConfig::default());
    let response = send(&t.app, admin_request("GET", "/admin", None), 1).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn healthz_is_public() {
    let t = test_app();
    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let response = send(&t.app, request, 1).await;
    assert_eq!(response.status(), StatusCode::OK);
}
