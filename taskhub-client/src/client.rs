/// High-level API client
///
/// [`TaskhubClient`] wraps a reqwest client with a cookie store (for
/// the HTTP-only refresh cookie), the in-memory session state, and the
/// single-flight refresh coordinator. Authenticated calls go through
/// one choke point, [`TaskhubClient::send_authed`], which attaches the
/// bearer token and handles the 401 / refresh / retry dance. The
/// refresh request itself goes out raw, without interception, so the
/// flow can never recurse.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use taskhub_shared::dto::{
    ApiResponse, AuthData, CreateTaskRequest, LoginRequest, PublicUser, RefreshData,
    RegisterRequest, UpdateProfileRequest, UpdateTaskRequest,
};
use taskhub_shared::models::task::{
    SortField, SortOrder, Task, TaskPriority, TaskStats, TaskStatus,
};

use crate::error::ClientError;
use crate::interceptor::{RefreshCoordinator, RefreshError};
use crate::session::SessionState;

/// Query parameters for listing tasks
///
/// All fields are optional; the server applies its defaults (no
/// filters, newest first) for anything left unset.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub search: Option<String>,
    pub sort_by: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl TaskQuery {
    /// Wire spelling of the query string (camelCase keys, kebab-case
    /// status values)
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(sort_by) = self.sort_by {
            let value = match sort_by {
                SortField::CreatedAt => "createdAt",
                SortField::DueDate => "dueDate",
                SortField::Priority => "priority",
                SortField::Title => "title",
            };
            pairs.push(("sortBy", value.to_string()));
        }
        if let Some(order) = self.order {
            let value = match order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            pairs.push(("order", value.to_string()));
        }
        pairs
    }
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    session: SessionState,
    coordinator: RefreshCoordinator,
}

/// Client for the Taskhub API
///
/// Cloning is cheap and clones share the same session: tokens obtained
/// by one clone are visible to all of them, and concurrent 401s across
/// clones still trigger exactly one refresh.
#[derive(Clone)]
pub struct TaskhubClient {
    inner: Arc<Inner>,
}

impl TaskhubClient {
    /// Creates a client for the API at `base_url`
    /// (e.g. `http://localhost:8080`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            // The refresh token arrives as an HTTP-only cookie; the
            // cookie store sends it back on /api/auth requests without
            // the rest of the client ever seeing its value.
            .cookie_store(true)
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                session: SessionState::new(),
                coordinator: RefreshCoordinator::new(),
            }),
        })
    }

    /// Snapshot of the logged-in user, if any
    pub fn current_user(&self) -> Option<PublicUser> {
        self.inner.session.current_user()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.session.is_logged_in()
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    /// Registers a new account and starts a session
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<PublicUser, ClientError> {
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.map(str::to_string),
        };

        let response = self
            .inner
            .http
            .post(self.url("/api/auth/register"))
            .json(&body)
            .send()
            .await?;

        let auth: AuthData = parse_data(response).await?;
        self.establish_session(auth)
    }

    /// Logs in with an email address or username
    pub async fn login(&self, identifier: &str, password: &str) -> Result<PublicUser, ClientError> {
        let body = LoginRequest {
            identifier: identifier.to_string(),
            password: password.to_string(),
        };

        let response = self
            .inner
            .http
            .post(self.url("/api/auth/login"))
            .json(&body)
            .send()
            .await?;

        let auth: AuthData = parse_data(response).await?;
        self.establish_session(auth)
    }

    /// Logs out, revoking the refresh token server-side
    ///
    /// Local session state is cleared even if the server call fails;
    /// there is no way to keep using tokens we have thrown away.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self
            .send_authed(Method::POST, "/api/auth/logout", None, None)
            .await;
        self.inner.session.clear();
        result.map(|_| ())
    }

    /// Fetches the current user's profile from the server
    pub async fn profile(&self) -> Result<PublicUser, ClientError> {
        let response = self
            .send_authed(Method::GET, "/api/auth/profile", None, None)
            .await?;
        let user: PublicUser = parse_data(response).await?;
        self.inner.session.set_user(user.clone());
        Ok(user)
    }

    /// Updates the current user's profile
    pub async fn update_profile(
        &self,
        update: UpdateProfileRequest,
    ) -> Result<PublicUser, ClientError> {
        let body = serde_json::to_value(&update)
            .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?;
        let response = self
            .send_authed(Method::PUT, "/api/auth/profile", None, Some(body))
            .await?;
        let user: PublicUser = parse_data(response).await?;
        self.inner.session.set_user(user.clone());
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Lists the current user's tasks
    pub async fn list_tasks(&self, query: TaskQuery) -> Result<Vec<Task>, ClientError> {
        let pairs = query.to_pairs();
        let response = self
            .send_authed(Method::GET, "/api/tasks", Some(&pairs), None)
            .await?;
        parse_data(response).await
    }

    /// Creates a task
    pub async fn create_task(&self, task: CreateTaskRequest) -> Result<Task, ClientError> {
        let body = serde_json::to_value(&task)
            .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?;
        let response = self
            .send_authed(Method::POST, "/api/tasks", None, Some(body))
            .await?;
        parse_data(response).await
    }

    /// Fetches one task by id
    pub async fn get_task(&self, id: Uuid) -> Result<Task, ClientError> {
        let response = self
            .send_authed(Method::GET, &format!("/api/tasks/{}", id), None, None)
            .await?;
        parse_data(response).await
    }

    /// Partially updates a task
    pub async fn update_task(
        &self,
        id: Uuid,
        update: UpdateTaskRequest,
    ) -> Result<Task, ClientError> {
        let body = serde_json::to_value(&update)
            .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?;
        let response = self
            .send_authed(Method::PUT, &format!("/api/tasks/{}", id), None, Some(body))
            .await?;
        parse_data(response).await
    }

    /// Deletes a task
    pub async fn delete_task(&self, id: Uuid) -> Result<(), ClientError> {
        self.send_authed(Method::DELETE, &format!("/api/tasks/{}", id), None, None)
            .await
            .map(|_| ())
    }

    /// Per-status task counts for the current user
    pub async fn task_stats(&self) -> Result<TaskStats, ClientError> {
        let response = self
            .send_authed(Method::GET, "/api/tasks/stats", None, None)
            .await?;
        parse_data(response).await
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    fn establish_session(&self, auth: AuthData) -> Result<PublicUser, ClientError> {
        // A fresh session clears any sticky refresh failure
        self.inner.coordinator.reset();
        self.inner
            .session
            .establish(auth.access_token, auth.user.clone());
        Ok(auth.user)
    }

    /// Sends an authenticated request with one transparent refresh
    ///
    /// On 401 the access token is refreshed through the coordinator
    /// (so N concurrent 401s produce one refresh call) and the request
    /// is retried once with the new token. A 401 on the retry is
    /// surfaced as-is. A failed refresh clears the session and maps to
    /// [`ClientError::SessionExpired`].
    async fn send_authed(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&'static str, String)]>,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ClientError> {
        let token = self
            .inner
            .session
            .access_token()
            .ok_or(ClientError::NotLoggedIn)?;

        let response = self
            .send_once(method.clone(), path, query, body.as_ref(), &token)
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        tracing::debug!(%path, "Request returned 401, refreshing access token");
        let token = match self
            .inner
            .coordinator
            .run(|| self.call_refresh())
            .await
        {
            Ok(token) => token,
            Err(RefreshError::Failed(_)) | Err(RefreshError::AlreadyFailed) => {
                self.inner.session.clear();
                return Err(ClientError::SessionExpired);
            }
        };

        let response = self
            .send_once(method, path, query, body.as_ref(), &token)
            .await?;
        check_status(response).await
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&'static str, String)]>,
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self
            .inner
            .http
            .request(method, self.url(path))
            .bearer_auth(token);
        if let Some(pairs) = query {
            request = request.query(pairs);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Calls the refresh endpoint directly, bypassing interception
    ///
    /// The refresh cookie travels via the cookie store; no bearer
    /// token is attached. On success the new access token is installed
    /// in the session before being handed back to the coordinator.
    async fn call_refresh(&self) -> Result<String, String> {
        let response = self
            .inner
            .http
            .post(self.url("/api/auth/refresh"))
            .send()
            .await
            .map_err(|e| format!("refresh request failed: {}", e))?;

        match parse_data::<RefreshData>(response).await {
            Ok(data) => {
                self.inner
                    .session
                    .set_access_token(data.access_token.clone());
                Ok(data.access_token)
            }
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Maps a non-2xx response to [`ClientError::Api`] using the envelope
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let envelope: ApiResponse<serde_json::Value> = response
        .json()
        .await
        .unwrap_or_else(|_| ApiResponse::error("Unexpected server response"));

    Err(ClientError::Api {
        status,
        message: envelope
            .message
            .unwrap_or_else(|| "Request failed".to_string()),
        errors: envelope.errors.unwrap_or_default(),
    })
}

/// Unwraps a success envelope into its `data` payload
async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let response = check_status(response).await?;
    let envelope: ApiResponse<T> = response
        .json()
        .await
        .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?;

    envelope
        .data
        .ok_or_else(|| ClientError::UnexpectedResponse("missing data field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_query_empty_builds_no_pairs() {
        assert!(TaskQuery::default().to_pairs().is_empty());
    }

    #[test]
    fn test_task_query_uses_wire_spellings() {
        let query = TaskQuery {
            status: Some(TaskStatus::InProgress),
            priority: Some(TaskPriority::High),
            search: Some("report".to_string()),
            sort_by: Some(SortField::DueDate),
            order: Some(SortOrder::Asc),
        };

        let pairs = query.to_pairs();
        assert_eq!(
            pairs,
            vec![
                ("status", "in-progress".to_string()),
                ("priority", "high".to_string()),
                ("search", "report".to_string()),
                ("sortBy", "dueDate".to_string()),
                ("order", "asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = TaskhubClient::new("http://localhost:8080/").unwrap();
        assert_eq!(
            client.url("/api/tasks"),
            "http://localhost:8080/api/tasks"
        );
    }

    #[tokio::test]
    async fn test_authed_call_without_login_fails_fast() {
        let client = TaskhubClient::new("http://localhost:8080").unwrap();
        let result = client.task_stats().await;
        assert!(matches!(result, Err(ClientError::NotLoggedIn)));
    }
}
