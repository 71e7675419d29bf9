//! Drives the REST router in-process against a temporary store file.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use postboard_api::{AppStateInner, router};
use postboard_db::Database;

struct TestApp {
    _dir: tempfile::TempDir,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("db.json")).unwrap();
        Self {
            router: router(AppStateInner::new(db)),
            _dir: dir,
        }
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|v| v.to_string()).unwrap_or_default();
        self.raw(method, uri, body).await
    }

    async fn raw(&self, method: Method, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_user(&self, name: &str) -> Value {
        let (status, user) = self
            .call(Method::POST, "/api/users", Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        user
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn create_user_validates_and_rejects_duplicates() {
    let app = TestApp::new();

    let (status, body) = app
        .call(Method::POST, "/api/users", Some(json!({ "name": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User name is required.");

    let user = app.create_user("  Alice ").await;
    assert_eq!(user["name"], "Alice");

    let (status, body) = app
        .call(Method::POST, "/api/users", Some(json!({ "name": "alice" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User with this name already exists.");

    let (status, users) = app.call(Method::GET, "/api/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn send_then_list_messages() {
    let app = TestApp::new();
    let me = app.create_user("me").await;

    let (status, sent) = app
        .call(
            Method::POST,
            "/api/messages",
            Some(json!({ "text": "  hi ", "senderId": me["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["text"], "hi");
    assert_eq!(sent["senderName"], "me");
    assert_eq!(sent["edited"], false);

    let (status, messages) = app.call(Method::GET, "/api/messages", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages.as_array().unwrap().len(), 1);
    assert_eq!(messages[0]["id"], sent["id"]);
}

#[tokio::test]
async fn extra_body_fields_are_ignored() {
    let app = TestApp::new();

    let (status, user) = app
        .call(
            Method::POST,
            "/api/users",
            Some(json!({ "name": "bob", "avatar": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["name"], "bob");

    let (status, sent) = app
        .call(
            Method::POST,
            "/api/messages",
            Some(json!({ "text": "hi", "senderId": user["id"], "clientTag": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["text"], "hi");

    let uri = format!("/api/messages/{}", sent["id"].as_str().unwrap());
    let (status, edited) = app
        .call(Method::PUT, &uri, Some(json!({ "text": "hey", "edited": false })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["edited"], true);
}

#[tokio::test]
async fn send_message_errors() {
    let app = TestApp::new();

    let (status, body) = app
        .call(Method::POST, "/api/messages", Some(json!({ "text": "hi" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message text and senderId are required.");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/messages",
            Some(json!({ "text": "hi", "senderId": "ghost" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Sender user not found.");

    let (status, body) = app
        .raw(Method::POST, "/api/messages", "{broken".into())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn update_marks_edited() {
    let app = TestApp::new();
    let me = app.create_user("me").await;
    let (_, sent) = app
        .call(
            Method::POST,
            "/api/messages",
            Some(json!({ "text": "hi", "senderId": me["id"] })),
        )
        .await;
    let uri = format!("/api/messages/{}", sent["id"].as_str().unwrap());

    let (status, body) = app
        .call(Method::PUT, &uri, Some(json!({ "text": " " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message text cannot be empty.");

    let (status, updated) = app
        .call(Method::PUT, &uri, Some(json!({ "text": "hi there" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["text"], "hi there");
    assert_eq!(updated["edited"], true);
    assert!(updated["editedAt"].is_string());

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/messages/missing",
            Some(json!({ "text": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_message() {
    let app = TestApp::new();
    let me = app.create_user("me").await;
    let (_, sent) = app
        .call(
            Method::POST,
            "/api/messages",
            Some(json!({ "text": "bye", "senderId": me["id"] })),
        )
        .await;
    let uri = format!("/api/messages/{}", sent["id"].as_str().unwrap());

    let (status, body) = app.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Message deleted successfully.");

    let (status, _) = app.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, messages) = app.call(Method::GET, "/api/messages", None).await;
    assert!(messages.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn import_replaces_data_set() {
    let app = TestApp::new();
    app.create_user("old").await;

    let upload = json!({
        "users": [{ "id": "u1", "name": "me" }],
        "messages": [{
            "id": "m1",
            "text": "imported",
            "senderId": "u1",
            "senderName": "me",
            "timestamp": "2024-05-01T12:00:00.000Z"
        }]
    });
    let (status, body) = app
        .call(Method::POST, "/api/import", Some(upload))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Data imported successfully.");

    let (_, users) = app.call(Method::GET, "/api/users", None).await;
    assert_eq!(users, json!([{ "id": "u1", "name": "me" }]));
    let (_, messages) = app.call(Method::GET, "/api/messages", None).await;
    assert_eq!(messages[0]["text"], "imported");
}

#[tokio::test]
async fn incomplete_import_leaves_data_unchanged() {
    let app = TestApp::new();
    app.create_user("keep").await;

    let (status, body) = app
        .call(Method::POST, "/api/import", Some(json!({ "users": [] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid data format. Must contain users and messages arrays."
    );

    let (status, body) = app.raw(Method::POST, "/api/import", String::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded.");

    let (_, users) = app.call(Method::GET, "/api/users", None).await;
    assert_eq!(users[0]["name"], "keep");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Route /api/nope not found.");
}
