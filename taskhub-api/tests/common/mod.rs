/// Common test utilities for integration tests
///
/// Spins up the full router against the database named by
/// `DATABASE_URL` and drives it through `tower::Service`, no listening
/// socket needed. Each context uses a unique username prefix so tests
/// can run in parallel against one database; `cleanup()` removes every
/// user the context created (tasks go with them via ON DELETE CASCADE).

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use sqlx::PgPool;
use taskhub_api::app::{build_router, AppState};
use taskhub_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use tower::Service as _;
use uuid::Uuid;

/// Test context containing the app and its database pool
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub prefix: String,
}

/// Credentials and tokens for one registered test user
pub struct TestSession {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub access_token: String,
    /// `refreshToken=...` pair, ready for a Cookie header
    pub refresh_cookie: String,
}

impl TestSession {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl TestContext {
    /// Creates a new test context with migrations applied
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set for integration tests"))?;

        let db = PgPool::connect(&database_url).await?;

        // Path relative to Cargo.toml, not this file
        sqlx::migrate!("../migrations").run(&db).await?;

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: 5,
            },
            jwt: JwtConfig {
                access_secret: "integration-test-access-secret-0123456789".to_string(),
                refresh_secret: "integration-test-refresh-secret-0123456789".to_string(),
                access_ttl_minutes: 15,
                refresh_ttl_days: 7,
            },
        };

        let state = AppState::new(db.clone(), config);
        let app = build_router(state);

        // Short unique prefix keeps usernames inside the 30-char limit
        let prefix = format!("it{}", &Uuid::new_v4().simple().to_string()[..8]);

        Ok(TestContext { db, app, prefix })
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().call(request).await.unwrap()
    }

    /// Registers a fresh user and returns its session
    pub async fn register(&self, name: &str) -> TestSession {
        let username = format!("{}{}", self.prefix, name);
        let email = format!("{}@example.com", username);
        let password = "secret123".to_string();

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": password,
                })
                .to_string(),
            ))
            .unwrap();

        let response = self.send(request).await;
        assert_eq!(response.status(), StatusCode::CREATED, "register failed");

        let refresh_cookie =
            refresh_cookie_pair(&response).expect("register must set the refresh cookie");
        let body = body_json(response).await;

        TestSession {
            user_id: body["data"]["user"]["id"]
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .expect("register must return the user id"),
            username,
            email,
            password,
            access_token: body["data"]["accessToken"]
                .as_str()
                .expect("register must return an access token")
                .to_string(),
            refresh_cookie,
        }
    }

    /// Creates a task for the session and returns its id
    pub async fn create_task(&self, session: &TestSession, body: serde_json::Value) -> Uuid {
        let request = Request::builder()
            .method("POST")
            .uri("/api/tasks")
            .header("authorization", session.auth_header())
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = self.send(request).await;
        assert_eq!(response.status(), StatusCode::CREATED, "create task failed");

        let body = body_json(response).await;
        Uuid::parse_str(body["data"]["id"].as_str().unwrap()).unwrap()
    }

    /// Removes every user (and, via cascade, every task) this context
    /// created
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE username LIKE $1")
            .bind(format!("{}%", self.prefix))
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Reads a response body as JSON
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Extracts the `refreshToken=...` pair from Set-Cookie, if present
pub fn refresh_cookie_pair(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .map(|v| v.split(';').next().unwrap().to_string())
}

/// Full Set-Cookie header for the refresh cookie, attributes included
pub fn refresh_set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .map(str::to_string)
}
