use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use helpdesk_api::session::create_token;
use helpdesk_api::triage::{TriageClassifier, TriageError};
use helpdesk_api::workflow::WorkflowNotifier;
use helpdesk_api::{AppState, AppStateInner, SessionSettings, router};
use helpdesk_db::Database;
use helpdesk_types::models::{Priority, Role, TriageResult};

// -- Fakes --

struct ScriptedClassifier(Option<TriageResult>);

#[async_trait]
impl TriageClassifier for ScriptedClassifier {
    async fn classify(&self, _title: &str, _description: &str) -> Result<TriageResult, TriageError> {
        self.0.clone().ok_or(TriageError::QuotaExhausted)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<i64>>,
    fail: bool,
}

#[async_trait]
impl WorkflowNotifier for RecordingNotifier {
    async fn ticket_created(&self, ticket_id: i64) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(ticket_id);
        if self.fail {
            anyhow::bail!("workflow service unreachable");
        }
        Ok(())
    }
}

fn login_failure() -> TriageResult {
    TriageResult {
        priority: Priority::High,
        summary: "Login failure".into(),
        suggested_response: Some("Please reset your password at https://example.com/reset".into()),
    }
}

// -- Harness --

struct TestApp {
    router: Router,
    state: AppState,
    notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    fn new() -> Self {
        Self::with(Some(login_failure()), RecordingNotifier::default())
    }

    fn with(triage: Option<TriageResult>, notifier: RecordingNotifier) -> Self {
        let notifier = Arc::new(notifier);
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            session: SessionSettings::new("test-secret"),
            classifier: Arc::new(ScriptedClassifier(triage)),
            workflow: notifier.clone(),
        });
        Self {
            router: router(state.clone()),
            state,
            notifier,
        }
    }

    /// Inserts an account directly and mints a session for it, skipping
    /// password hashing.
    fn account(&self, username: &str, role: Role) -> (i64, String) {
        let id = self
            .state
            .db
            .create_user(username, &format!("{username}@example.com"), "!", role)
            .unwrap();
        let token = create_token(&self.state.session, id, username, role).unwrap();
        (id, token)
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    async fn create_ticket(&self, token: &str, title: &str, description: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/tickets",
            Some(token),
            Some(json!({ "title": title, "description": description })),
        )
        .await
    }

    async fn open_ticket(&self, token: &str) -> i64 {
        let (status, body) = self
            .create_ticket(token, "Cannot login", "Login fails with wrong password error")
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn set_status(&self, token: &str, id: i64, status: &str) -> (StatusCode, Value) {
        self.send(
            Method::PATCH,
            &format!("/api/tickets/{id}"),
            Some(token),
            Some(json!({ "status": status })),
        )
        .await
    }

    async fn notified(&self) -> Vec<i64> {
        for _ in 0..50 {
            let seen = self.notifier.seen.lock().unwrap().clone();
            if !seen.is_empty() {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        vec![]
    }
}

// -- Scenarios --

#[tokio::test]
async fn register_login_and_file_a_ticket() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({ "username": "alice", "email": "alice@example.com", "password": "pw123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "username": "alice", "password": "pw123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["token"].as_str().unwrap().to_string();

    let (_, me) = app.get("/api/users/me", Some(&token)).await;
    assert_eq!(me["username"], "alice");

    let (status, ticket) = app
        .create_ticket(
            &token,
            "Cannot login",
            "Login fails with wrong password error, happens every time",
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{ticket}");
    assert_eq!(ticket["priority"], "high");
    assert_eq!(ticket["status"], "open");
    assert_eq!(ticket["owner"]["username"], "alice");
    assert_eq!(ticket["assessment"]["summary"], "Login failure");
    let id = ticket["id"].as_i64().unwrap();

    let (_, suggestion) = app.get(&format!("/api/tickets/{id}/ai-suggestion"), None).await;
    assert_eq!(
        suggestion["suggested_response"],
        "Please reset your password at https://example.com/reset"
    );

    let (_, messages) = app.get(&format!("/api/messages/ticket/{id}"), None).await;
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["type"], "client");
    assert_eq!(messages[0]["sender"]["username"], "alice");
    assert_eq!(
        messages[0]["content"],
        "Login fails with wrong password error, happens every time"
    );
    assert_eq!(messages[1]["type"], "admin");
    assert!(messages[1]["sender"].is_null());
    assert!(messages[1]["content"].as_str().unwrap().contains(&format!("#{id}")));

    assert_eq!(app.notified().await, vec![id]);
}

#[tokio::test]
async fn duplicate_accounts_and_bad_credentials() {
    let app = TestApp::new();
    app.account("alice", Role::User);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({ "username": "alice", "email": "other@example.com", "password": "pw123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({ "username": "alicia", "email": "alice@example.com", "password": "pw123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already exists");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({ "username": "carol", "email": "carol@example.com", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "identifier": "alice@example.com", "password": "whatever1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid username/email or password");
}

#[tokio::test]
async fn session_lookup_and_logout() {
    let app = TestApp::new();
    let (_, token) = app.account("alice", Role::User);

    let (status, me) = app.get("/api/users/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(me.is_null());

    let (status, me) = app.get("/api/users/me", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(me.is_null());

    let request = Request::builder()
        .uri("/api/users/logout")
        .header(header::COOKIE, format!("helpdesk_session={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.starts_with("helpdesk_session="));
}

#[tokio::test]
async fn health_is_outside_the_api_root() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn ticket_writes_require_a_session() {
    let app = TestApp::new();
    let (_, token) = app.account("alice", Role::User);
    let id = app.open_ticket(&token).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/tickets",
            None,
            Some(json!({ "title": "Printer", "description": "Printer does not print" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authenticated");

    let (status, _) = app.get("/api/tickets", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/tickets/{id}"),
            Some("forged"),
            Some(json!({ "status": "closed" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // reads stay public
    let (status, _) = app.get(&format!("/api/tickets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn title_and_description_boundaries() {
    let app = TestApp::new();
    let (_, token) = app.account("alice", Role::User);
    let description = "A long enough description";

    for (len, expected) in [
        (2, StatusCode::BAD_REQUEST),
        (3, StatusCode::CREATED),
        (200, StatusCode::CREATED),
        (201, StatusCode::BAD_REQUEST),
    ] {
        let (status, body) = app.create_ticket(&token, &"t".repeat(len), description).await;
        assert_eq!(status, expected, "title of {len}: {body}");
    }

    for (len, expected) in [
        (9, StatusCode::BAD_REQUEST),
        (10, StatusCode::CREATED),
        (5000, StatusCode::CREATED),
        (5001, StatusCode::BAD_REQUEST),
    ] {
        let (status, body) = app.create_ticket(&token, "Title", &"d".repeat(len)).await;
        assert_eq!(status, expected, "description of {len}: {body}");
    }

    let (_, tickets) = app.get("/api/tickets", Some(&token)).await;
    assert_eq!(tickets.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn malformed_bodies_and_ids_are_rejected() {
    let app = TestApp::new();
    let (_, token) = app.account("alice", Role::User);
    let id = app.open_ticket(&token).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/tickets",
            Some(&token),
            Some(json!({ "title": "Title", "description": "Long enough text", "priority": "high" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.set_status(&token, id, "pending").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/tickets/{id}"),
            Some(&token),
            Some(json!({ "owner": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/api/tickets/0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("positive"));

    let (status, _) = app.get("/api/tickets/-4/history", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/api/tickets/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = app
        .get(&format!("/api/messages/ticket/{id}?includeInternal=maybe"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");
}

#[tokio::test]
async fn status_changes_are_recorded_once() {
    let app = TestApp::new();
    let (_, alice) = app.account("alice", Role::User);
    let (_, admin) = app.account("root", Role::Admin);
    let id = app.open_ticket(&alice).await;
    let history_uri = format!("/api/tickets/{id}/history");

    let (status, body) = app.set_status(&admin, id, "open").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (_, history) = app.get(&history_uri, None).await;
    assert!(history.as_array().unwrap().is_empty());

    let (_, body) = app.set_status(&admin, id, "in_progress").await;
    assert_eq!(body["ticket"]["status"], "in_progress");
    let (_, history) = app.get(&history_uri, None).await;
    let history = history.as_array().unwrap().clone();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["old_status"], "open");
    assert_eq!(history[0]["new_status"], "in_progress");
    assert_eq!(history[0]["notes"], "Ticket moved to in progress");
    assert_eq!(history[0]["changed_by"]["username"], "root");

    app.set_status(&admin, id, "resolved").await;
    app.set_status(&alice, id, "closed").await;

    let (_, history) = app.get(&history_uri, None).await;
    let history = history.as_array().unwrap().clone();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["new_status"], "closed");
    assert_eq!(history[0]["changed_by"]["username"], "alice");
    assert_eq!(history[1]["new_status"], "resolved");
    assert_eq!(history[1]["notes"], "Ticket marked as resolved");
    assert_eq!(history[2]["new_status"], "in_progress");
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let app = TestApp::new();
    let (_, alice) = app.account("alice", Role::User);
    let (_, bob) = app.account("bob", Role::User);
    let (_, admin) = app.account("root", Role::Admin);
    let id = app.open_ticket(&alice).await;

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/tickets/{id}"),
            Some(&admin),
            Some(json!({ "priority": "low", "response": "Fixed in 2.1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["affected"], 1);
    assert_eq!(body["ticket"]["priority"], "low");
    assert_eq!(body["ticket"]["response"], "Fixed in 2.1");
    assert_eq!(body["ticket"]["title"], "Cannot login");
    assert_eq!(body["ticket"]["status"], "open");

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/tickets/{id}"),
            Some(&bob),
            Some(json!({ "title": "Hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.set_status(&admin, 999, "closed").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Ticket not found");
}

#[tokio::test]
async fn only_admins_set_priority_and_response() {
    let app = TestApp::new();
    let (_, alice) = app.account("alice", Role::User);
    let (_, admin) = app.account("root", Role::Admin);
    let id = app.open_ticket(&alice).await;
    let uri = format!("/api/tickets/{id}");

    for patch in [
        json!({ "priority": "low" }),
        json!({ "response": "Resolved it myself" }),
        json!({ "title": "Still broken", "priority": "high" }),
    ] {
        let (status, body) = app.send(Method::PATCH, &uri, Some(&alice), Some(patch)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    }

    let (_, ticket) = app.get(&uri, None).await;
    assert_eq!(ticket["priority"], "high");
    assert_eq!(ticket["title"], "Cannot login");
    assert!(ticket["response"].is_null());

    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&alice), Some(json!({ "title": "Cannot login on mobile" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({ "priority": "low" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ticket"]["priority"], "low");
}

#[tokio::test]
async fn sessions_for_deleted_accounts_cannot_write() {
    let app = TestApp::new();
    let (_, alice) = app.account("alice", Role::User);
    let id = app.open_ticket(&alice).await;
    let ghost = create_token(&app.state.session, 9999, "ghost", Role::Admin).unwrap();

    let (status, body) = app.set_status(&ghost, id, "closed").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/messages",
            Some(&ghost),
            Some(json!({ "ticket_id": id, "content": "Closing this out", "type": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");

    let (status, _) = app.send(Method::DELETE, &format!("/api/tickets/{id}"), Some(&ghost), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, ticket) = app.get(&format!("/api/tickets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticket["status"], "open");
    assert!(app.get(&format!("/api/tickets/{id}/history"), None).await.1.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let app = TestApp::new();
    let (_, alice) = app.account("alice", Role::User);
    let (_, bob) = app.account("bob", Role::User);
    let (_, admin) = app.account("root", Role::Admin);
    app.open_ticket(&alice).await;
    app.open_ticket(&bob).await;
    app.open_ticket(&alice).await;

    let (_, mine) = app.get("/api/tickets", Some(&alice)).await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|t| t["owner"]["username"] == "alice"));
    assert!(mine.iter().all(|t| t.get("messages").is_none()));

    let (_, all) = app.get("/api/tickets", Some(&admin)).await;
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 3);
    for ticket in all {
        assert_eq!(ticket["messages"].as_array().unwrap().len(), 2);
        assert_eq!(ticket["assessment"]["priority"], "high");
    }
}

#[tokio::test]
async fn internal_notes_are_admin_only() {
    let app = TestApp::new();
    let (_, alice) = app.account("alice", Role::User);
    let (_, admin) = app.account("root", Role::Admin);
    let id = app.open_ticket(&alice).await;

    let (status, note) = app
        .send(
            Method::POST,
            "/api/messages",
            Some(&admin),
            Some(json!({ "ticketId": id, "content": "customer seems confused", "type": "admin", "isInternal": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{note}");
    assert_eq!(note["is_internal"], true);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/messages",
            Some(&alice),
            Some(json!({ "ticket_id": id, "content": "secret", "type": "client", "is_internal": true })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/messages/ticket/{id}?includeInternal=true");
    let (_, public) = app.get(&format!("/api/messages/ticket/{id}"), None).await;
    assert_eq!(public.as_array().unwrap().len(), 2);

    let (_, anonymous) = app.get(&uri, None).await;
    assert!(anonymous.as_array().unwrap().iter().all(|m| m["is_internal"] == false));

    let (_, as_owner) = app.get(&uri, Some(&alice)).await;
    assert_eq!(as_owner.as_array().unwrap().len(), 2);

    let (_, as_admin) = app.get(&uri, Some(&admin)).await;
    let as_admin = as_admin.as_array().unwrap();
    assert_eq!(as_admin.len(), 3);
    assert_eq!(as_admin.iter().filter(|m| m["is_internal"] == true).count(), 1);

    let (_, ticket) = app.get(&format!("/api/tickets/{id}"), None).await;
    assert_eq!(ticket["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn messages_are_modified_only_by_their_author_or_an_admin() {
    let app = TestApp::new();
    let (_, alice) = app.account("alice", Role::User);
    let (_, bob) = app.account("bob", Role::User);
    let (_, admin) = app.account("root", Role::Admin);
    let id = app.open_ticket(&alice).await;

    let (status, reply) = app
        .send(
            Method::POST,
            "/api/messages",
            Some(&alice),
            Some(json!({ "ticket_id": id, "content": "Any update?", "type": "client" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{reply}");
    let message_uri = format!("/api/messages/{}", reply["id"]);

    let (status, _) = app
        .send(Method::PUT, &message_uri, Some(&bob), Some(json!({ "content": "hijacked" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::DELETE, &message_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/messages",
            Some(&bob),
            Some(json!({ "ticket_id": id, "content": "me too", "type": "client" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, edited) = app
        .send(Method::PUT, &message_uri, Some(&alice), Some(json!({ "content": "Any update on this?" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "Any update on this?");

    let (status, edited) = app
        .send(Method::PUT, &message_uri, Some(&admin), Some(json!({ "content": "[redacted]" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "[redacted]");

    let (status, _) = app
        .send(Method::PUT, &message_uri, Some(&admin), Some(json!({ "content": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(Method::DELETE, &message_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Message deleted successfully");

    let (status, _) = app.send(Method::DELETE, &message_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_ticket_removes_everything_it_owns() {
    let app = TestApp::new();
    let (_, alice) = app.account("alice", Role::User);
    let (_, bob) = app.account("bob", Role::User);
    let (_, admin) = app.account("root", Role::Admin);
    let id = app.open_ticket(&alice).await;
    app.set_status(&admin, id, "in_progress").await;
    app.set_status(&admin, id, "resolved").await;

    let uri = format!("/api/tickets/{id}");
    let (status, _) = app.send(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, history) = app.get(&format!("{uri}/history"), None).await;
    assert!(history.as_array().unwrap().is_empty());
    let (_, messages) = app.get(&format!("/api/messages/ticket/{id}"), None).await;
    assert!(messages.as_array().unwrap().is_empty());
    let (_, suggestion) = app.get(&format!("{uri}/ai-suggestion"), None).await;
    assert!(suggestion["suggested_response"].is_null());

    let (status, _) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn classifier_failure_aborts_creation() {
    let app = TestApp::with(None, RecordingNotifier::default());
    let (_, alice) = app.account("alice", Role::User);

    let (status, body) = app
        .create_ticket(&alice, "Cannot login", "Login fails with wrong password error")
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("quota"));

    let (_, tickets) = app.get("/api/tickets", Some(&alice)).await;
    assert!(tickets.as_array().unwrap().is_empty());
    assert!(app.state.db.list_tickets(None).unwrap().is_empty());
    assert!(app.notifier.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn workflow_failure_does_not_fail_creation() {
    let notifier = RecordingNotifier {
        fail: true,
        ..Default::default()
    };
    let app = TestApp::with(Some(login_failure()), notifier);
    let (_, alice) = app.account("alice", Role::User);

    let id = app.open_ticket(&alice).await;
    assert_eq!(app.notified().await, vec![id]);

    let (status, _) = app.get(&format!("/api/tickets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_suggestion_is_null() {
    let triage = TriageResult {
        priority: Priority::Medium,
        summary: "Dashboard crash".into(),
        suggested_response: None,
    };
    let app = TestApp::with(Some(triage), RecordingNotifier::default());
    let (_, alice) = app.account("alice", Role::User);
    let id = app.open_ticket(&alice).await;

    let (status, body) = app.get(&format!("/api/tickets/{id}/ai-suggestion"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "suggested_response": null }));

    let (status, body) = app.get("/api/tickets/4242/ai-suggestion", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["suggested_response"].is_null());
}
