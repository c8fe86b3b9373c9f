//! End-to-end HTTP tests against the full router over in-memory backends.

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use common::{ManualClock, app_state, start_time};
use medipill::audit::{MemoryAuditLog, action};
use medipill::gateway;

struct TestApp {
    router: Router,
    audit: Arc<MemoryAuditLog>,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new() -> Self {
        let (state, audit, clock) = app_state();
        Self {
            router: gateway::app(state, "*"),
            audit,
            clock,
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.9")
            .header(header::USER_AGENT, "http-test");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> i64 {
        let (status, body) = self
            .send(
                "POST",
                "/api/register",
                None,
                Some(json!({ "username": username, "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }
}

#[tokio::test]
async fn register_login_and_fetch_profile() {
    let app = TestApp::new();
    let id = app.register("alice", "alice@example.com", "secret1").await;

    let (status, body) = app.login("alice@example.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert!(body["refresh_token"].is_string());

    let (status, profile) = app
        .send("GET", &format!("/api/users/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "alice@example.com");
    assert_eq!(profile["username"], "alice");
    assert!(profile.get("password_hash").is_none());

    let (status, _) = app
        .send("GET", &format!("/api/users/{}", id), Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let login = app
        .audit
        .events()
        .into_iter()
        .find(|e| e.action == action::LOGIN)
        .unwrap();
    assert_eq!(login.ip, "203.0.113.9");
    assert_eq!(login.user_agent, "http-test");
}

#[tokio::test]
async fn missing_bearer_is_token_required() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Token required" }));

    let (status, body) = app
        .send(
            "POST",
            "/api/logout",
            None,
            Some(json!({ "refresh_token": "whatever" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token required");
}

#[tokio::test]
async fn duplicate_and_invalid_registration() {
    let app = TestApp::new();
    app.register("alice", "alice@example.com", "secret1").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/register",
            None,
            Some(json!({ "username": "alice2", "email": "ALICE@example.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, _) = app
        .send(
            "POST",
            "/api/register",
            None,
            Some(json!({ "username": "bob", "email": "not-an-email", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/api/register",
            None,
            Some(json!({ "username": "bob", "email": "bob@example.com", "password": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_failures_lock_with_403() {
    let app = TestApp::new();
    app.register("alice", "alice@example.com", "secret1").await;

    for _ in 0..5 {
        let (status, body) = app.login("alice@example.com", "wrong").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password");
    }

    let (status, body) = app.login("alice@example.com", "secret1").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("locked"));
}

#[tokio::test]
async fn logout_then_refresh_is_rejected() {
    let app = TestApp::new();
    app.register("alice", "alice@example.com", "secret1").await;
    let (_, tokens) = app.login("alice@example.com", "secret1").await;
    let token = tokens["token"].as_str().unwrap();
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    let (status, body) = app
        .send(
            "POST",
            "/api/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access_token"].as_str().unwrap();
    let (status, _) = app.send("GET", "/api/users", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            "POST",
            "/api/logout",
            Some(token),
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, body) = app
        .send(
            "POST",
            "/api/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Refresh token has been revoked");
}

fn changed_at(body: &Value) -> DateTime<Utc> {
    serde_json::from_value(body["user"]["password_changed_at"].clone())
        .expect("password_changed_at in response")
}

#[tokio::test]
async fn password_change_returns_replacement_token() {
    let app = TestApp::new();
    let id = app.register("alice", "alice@example.com", "secret1").await;
    let (_, tokens) = app.login("alice@example.com", "secret1").await;
    let login_token = tokens["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/users/{}", id),
            Some(&login_token),
            Some(json!({ "password": "secret2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id);
    assert_eq!(changed_at(&body), start_time());
    assert!(body["message"].is_string());
    let first = body["token"].as_str().unwrap().to_string();

    let (status, _) = app.send("GET", "/api/users", Some(&first), None).await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(Duration::seconds(5));
    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/users/{}", id),
            Some(&first),
            Some(json!({ "password": "secret3" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(changed_at(&body), start_time() + Duration::seconds(5));
    let second = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.send("GET", "/api/users", Some(&first), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token is no longer valid, please login again.");

    let (status, _) = app.send("GET", "/api/users", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.login("alice@example.com", "secret3").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn users_may_only_modify_themselves() {
    let app = TestApp::new();
    let alice = app.register("alice", "alice@example.com", "secret1").await;
    let bob = app.register("bob", "bob@example.com", "secret1").await;
    let (_, tokens) = app.login("alice@example.com", "secret1").await;
    let token = tokens["token"].as_str().unwrap();

    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/users/{}", bob),
            Some(token),
            Some(json!({ "username": "mallory" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send("DELETE", &format!("/api/users/{}", bob), Some(token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/users/{}", alice),
            Some(token),
            Some(json!({ "email": "BOB@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/users/{}", alice),
            Some(token),
            Some(json!({ "username": "alicia" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alicia");

    let (status, _) = app
        .send("DELETE", &format!("/api/users/{}", alice), Some(token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send("GET", &format!("/api/users/{}", alice), Some(token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn medications_are_private_to_their_owner() {
    let app = TestApp::new();
    app.register("alice", "alice@example.com", "secret1").await;
    app.register("bob", "bob@example.com", "secret1").await;
    let (_, a) = app.login("alice@example.com", "secret1").await;
    let (_, b) = app.login("bob@example.com", "secret1").await;
    let alice = a["token"].as_str().unwrap();
    let bob = b["token"].as_str().unwrap();

    let (status, med) = app
        .send(
            "POST",
            "/api/medications",
            Some(alice),
            Some(json!({
                "type": 2,
                "name": "Insulin",
                "dose": "10u",
                "schedule_type": "daily"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(med["type"], 2);
    let path = format!("/api/medications/{}", med["id"]);

    let (status, _) = app.send("GET", &path, Some(bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, list) = app.send("GET", "/api/medications", Some(bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));

    let (status, updated) = app
        .send(
            "PUT",
            &path,
            Some(alice),
            Some(json!({ "dose": "12u", "schedule_type": "hourly" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["dose"], "12u");
    assert_eq!(updated["name"], "Insulin");
    assert_eq!(updated["schedule_type"], "hourly");

    let (status, _) = app.send("DELETE", &path, Some(bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send("DELETE", &path, Some(alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(app.audit.actions().contains(&action::MEDICATION_CREATE));
}

#[tokio::test]
async fn medication_input_is_validated() {
    let app = TestApp::new();
    app.register("alice", "alice@example.com", "secret1").await;
    let (_, a) = app.login("alice@example.com", "secret1").await;
    let alice = a["token"].as_str().unwrap();

    for body in [
        json!({ "type": 4, "name": "X", "dose": "1", "schedule_type": "daily" }),
        json!({ "name": "X", "dose": "1", "schedule_type": "yearly" }),
        json!({ "name": "", "dose": "1", "schedule_type": "daily" }),
    ] {
        let (status, resp) = app
            .send("POST", "/api/medications", Some(alice), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", resp);
    }
}

#[tokio::test]
async fn health_reports_in_memory_backends() {
    let app = TestApp::new();
    for uri in ["/", "/api/health"] {
        let (status, body) = app.send("GET", uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "not_connected");
        assert_eq!(body["cache"], "not_connected");
    }
}
