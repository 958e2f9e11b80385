/// Integration tests for the Taskhub API
///
/// These tests drive the real router against a real Postgres database
/// (`DATABASE_URL`) and cover the full session flow end-to-end:
/// register / login / refresh / logout, the refresh-cookie semantics,
/// profile updates, and owner-scoped task CRUD with filtering, search,
/// sorting, and stats.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_json, refresh_cookie_pair, refresh_set_cookie, TestContext};
use serde_json::json;
use uuid::Uuid;

// ----------------------------------------------------------------------
// Registration
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_register_returns_session_and_cookie() {
    let ctx = TestContext::new().await.unwrap();

    let username = format!("{}reg", ctx.prefix);
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "secret1",
                "fullName": "Reg User"
            })
            .to_string(),
        ))
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let set_cookie = refresh_set_cookie(&response).expect("refresh cookie must be set");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Path=/api/auth"));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["username"], username);
    assert_eq!(body["data"]["user"]["fullName"], "Reg User");
    assert!(body["data"]["accessToken"].is_string());

    // Neither the password hash nor the refresh token may appear in
    // the body
    let raw = body.to_string();
    assert!(!raw.contains("password"));
    assert!(!raw.to_lowercase().contains("refreshtoken"));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("dup").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "username": session.username,
                "email": format!("other-{}", session.email),
                "password": "secret123"
            })
            .to_string(),
        ))
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Username already taken");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_register_validation_reports_fields() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "username": "ab",
                "email": "not-an-email",
                "password": "short"
            })
            .to_string(),
        ))
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_malformed_json_body_gets_the_envelope() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"username": "#))
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A broken body must still answer in the standard envelope, not
    // axum's plain-text rejection
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors[0]["field"], "body");

    ctx.cleanup().await.unwrap();
}

// ----------------------------------------------------------------------
// Login
// ----------------------------------------------------------------------

async fn login(
    ctx: &TestContext,
    identifier: &str,
    password: &str,
) -> axum::http::Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "identifier": identifier, "password": password }).to_string(),
        ))
        .unwrap();
    ctx.send(request).await
}

#[tokio::test]
async fn test_login_accepts_email_or_username() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("login").await;

    let response = login(&ctx, &session.email, &session.password).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["id"], session.user_id.to_string());

    let response = login(&ctx, &session.username, &session.password).await;
    assert_eq!(response.status(), StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("creds").await;

    // Wrong password
    let response = login(&ctx, &session.username, "wrong-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let wrong_pw = body_json(response).await;

    // Unknown identifier
    let response = login(&ctx, "no-such-user@example.com", "whatever1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let unknown = body_json(response).await;

    // Same message for both, so responses cannot be used to enumerate
    // existing accounts
    assert_eq!(wrong_pw["message"], "Invalid credentials");
    assert_eq!(unknown["message"], wrong_pw["message"]);

    ctx.cleanup().await.unwrap();
}

// ----------------------------------------------------------------------
// Refresh and logout
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_refresh_issues_working_access_token() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("refresh").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .header("cookie", &session.refresh_cookie)
        .body(Body::empty())
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let new_token = body["data"]["accessToken"].as_str().unwrap().to_string();

    // The refreshed token works on a protected endpoint
    let request = Request::builder()
        .method("GET")
        .uri("/api/auth/profile")
        .header("authorization", format!("Bearer {}", new_token))
        .body(Body::empty())
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], session.username);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .body(Body::empty())
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("logout").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header("authorization", session.auth_header())
        .body(Body::empty())
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Logout clears the cookie
    let set_cookie = refresh_set_cookie(&response).expect("logout must clear the cookie");
    assert!(set_cookie.starts_with("refreshToken=;") || set_cookie.contains("Max-Age=0"));

    // The old cookie no longer refreshes
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .header("cookie", &session.refresh_cookie)
        .body(Body::empty())
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_second_login_invalidates_first_refresh_token() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("relogin").await;
    let first_cookie = session.refresh_cookie.clone();

    // A second login replaces the stored refresh token
    let response = login(&ctx, &session.username, &session.password).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second_cookie = refresh_cookie_pair(&response).unwrap();

    // The first session's cookie is now revoked
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .header("cookie", &first_cookie)
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The new one works
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .header("cookie", &second_cookie)
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

// ----------------------------------------------------------------------
// Profile
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_profile_update_is_partial() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("prof").await;

    let request = Request::builder()
        .method("PUT")
        .uri("/api/auth/profile")
        .header("authorization", session.auth_header())
        .header("content-type", "application/json")
        .body(Body::from(json!({ "fullName": "New Name" }).to_string()))
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["fullName"], "New Name");
    // Username untouched
    assert_eq!(body["data"]["username"], session.username);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_profile_update_rejects_taken_username() {
    let ctx = TestContext::new().await.unwrap();
    let alice = ctx.register("alice").await;
    let bob = ctx.register("bob").await;

    let request = Request::builder()
        .method("PUT")
        .uri("/api/auth/profile")
        .header("authorization", bob.auth_header())
        .header("content-type", "application/json")
        .body(Body::from(json!({ "username": alice.username }).to_string()))
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    ctx.cleanup().await.unwrap();
}

// ----------------------------------------------------------------------
// Tasks
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_task_create_applies_defaults() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("tdef").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/tasks")
        .header("authorization", session.auth_header())
        .header("content-type", "application/json")
        .body(Body::from(json!({ "title": "Buy milk" }).to_string()))
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], "Buy milk");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["priority"], "medium");
    assert!(body["data"]["dueDate"].is_null());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_task_update_and_due_date_clearing() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("tupd").await;

    let id = ctx
        .create_task(
            &session,
            json!({ "title": "Report", "dueDate": "2026-09-01T12:00:00Z" }),
        )
        .await;

    // Partial update: status only, due date untouched
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/tasks/{}", id))
        .header("authorization", session.auth_header())
        .header("content-type", "application/json")
        .body(Body::from(json!({ "status": "in-progress" }).to_string()))
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "in-progress");
    assert!(!body["data"]["dueDate"].is_null());

    // Explicit null clears the due date
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/tasks/{}", id))
        .header("authorization", session.auth_header())
        .header("content-type", "application/json")
        .body(Body::from(json!({ "dueDate": null }).to_string()))
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["dueDate"].is_null());
    assert_eq!(body["data"]["status"], "in-progress");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_task_delete_then_fetch_is_not_found() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("tdel").await;

    let id = ctx.create_task(&session, json!({ "title": "Ephemeral" })).await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/tasks/{}", id))
        .header("authorization", session.auth_header())
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/tasks/{}", id))
        .header("authorization", session.auth_header())
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_tasks_are_owner_scoped() {
    let ctx = TestContext::new().await.unwrap();
    let alice = ctx.register("scopea").await;
    let bob = ctx.register("scopeb").await;

    let id = ctx.create_task(&alice, json!({ "title": "Private" })).await;

    // Bob cannot see, update, or delete Alice's task; all three behave
    // exactly like a task that does not exist
    for (method, body) in [
        ("GET", Body::empty()),
        ("PUT", Body::from(json!({ "title": "Stolen" }).to_string())),
        ("DELETE", Body::empty()),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(format!("/api/tasks/{}", id))
            .header("authorization", bob.auth_header())
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let response = ctx.send(request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{} leaked", method);
    }

    // Bob's listing is empty
    let request = Request::builder()
        .method("GET")
        .uri("/api/tasks")
        .header("authorization", bob.auth_header())
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_task_list_filters_search_and_sort() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("tlist").await;

    ctx.create_task(
        &session,
        json!({ "title": "Write report", "status": "completed", "priority": "high" }),
    )
    .await;
    ctx.create_task(
        &session,
        json!({ "title": "Buy milk", "priority": "low" }),
    )
    .await;
    ctx.create_task(
        &session,
        json!({ "title": "Annual review", "description": "report on the year" }),
    )
    .await;

    let list = |uri: String| {
        let auth = session.auth_header();
        let ctx = &ctx;
        async move {
            let request = Request::builder()
                .method("GET")
                .uri(uri)
                .header("authorization", auth)
                .body(Body::empty())
                .unwrap();
            let response = ctx.send(request).await;
            assert_eq!(response.status(), StatusCode::OK);
            body_json(response).await["data"].as_array().unwrap().clone()
        }
    };

    // Status filter uses the kebab-case wire spelling
    let completed = list("/api/tasks?status=completed".to_string()).await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0]["title"], "Write report");

    let low = list("/api/tasks?priority=low".to_string()).await;
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["title"], "Buy milk");

    // Search matches title or description, case-insensitively
    let report = list("/api/tasks?search=REPORT".to_string()).await;
    assert_eq!(report.len(), 2);

    // Sort by title ascending
    let sorted = list("/api/tasks?sortBy=title&order=asc".to_string()).await;
    let titles: Vec<&str> = sorted.iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Annual review", "Buy milk", "Write report"]);

    // Unknown filter values are a validation error, not a silent no-op
    let request = Request::builder()
        .method("GET")
        .uri("/api/tasks?status=bogus")
        .header("authorization", session.auth_header())
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_task_stats_counts_by_status() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("tstat").await;

    ctx.create_task(&session, json!({ "title": "a" })).await;
    ctx.create_task(&session, json!({ "title": "b", "status": "in-progress" }))
        .await;
    ctx.create_task(&session, json!({ "title": "c", "status": "completed" }))
        .await;
    ctx.create_task(&session, json!({ "title": "d", "status": "completed" }))
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/tasks/stats")
        .header("authorization", session.auth_header())
        .body(Body::empty())
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 4);
    assert_eq!(body["data"]["pending"], 1);
    assert_eq!(body["data"]["inProgress"], 1);
    assert_eq!(body["data"]["completed"], 2);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_malformed_task_id_is_not_found() {
    let ctx = TestContext::new().await.unwrap();
    let session = ctx.register("tmal").await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/tasks/not-a-uuid")
        .header("authorization", session.auth_header())
        .body(Body::empty())
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_tasks_require_authentication() {
    let ctx = TestContext::new().await.unwrap();

    // No token
    let request = Request::builder()
        .method("GET")
        .uri("/api/tasks")
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage token
    let request = Request::builder()
        .method("GET")
        .uri("/api/tasks")
        .header("authorization", "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A refresh token is not an access token, even though both are
    // signed JWTs
    let session = ctx.register("wrongkind").await;
    let refresh_value = session
        .refresh_cookie
        .trim_start_matches("refreshToken=")
        .to_string();
    let request = Request::builder()
        .method("GET")
        .uri("/api/tasks")
        .header("authorization", format!("Bearer {}", refresh_value))
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

// ----------------------------------------------------------------------
// Health
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_health_endpoint() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["database"], "ok");

    ctx.cleanup().await.unwrap();
}
