/// Task endpoints
///
/// Owner-scoped CRUD plus list filtering and statistics. Every handler
/// runs behind the access-token middleware, and every query is scoped
/// to the authenticated user: a task id belonging to someone else is
/// indistinguishable from a nonexistent one (404, never 403).
///
/// # Endpoints
///
/// - `GET    /api/tasks`: list with optional `status`, `priority`,
///   `search`, `sortBy`, `order`
/// - `POST   /api/tasks`: create
/// - `GET    /api/tasks/stats`: per-status counts
/// - `GET    /api/tasks/:id`: fetch one
/// - `PUT    /api/tasks/:id`: partial update
/// - `DELETE /api/tasks/:id`: delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::auth::AuthUser,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use taskhub_shared::{
    dto::{ApiResponse, CreateTaskRequest, FieldError, UpdateTaskRequest},
    models::task::{
        CreateTask, SortField, SortOrder, Task, TaskFilter, TaskPriority, TaskStats, TaskStatus,
        UpdateTask,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Query parameters for the list endpoint
///
/// Kept as raw strings so invalid values produce field-level 400s
/// instead of axum's opaque query rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl ListTasksQuery {
    /// Validates and converts the raw query into a typed filter
    fn into_filter(self) -> Result<TaskFilter, ApiError> {
        let mut errors = Vec::new();
        let mut filter = TaskFilter::default();

        if let Some(ref value) = self.status {
            match TaskStatus::parse(value) {
                Some(status) => filter.status = Some(status),
                None => errors.push(FieldError {
                    field: "status".to_string(),
                    message: format!("Unknown status '{}'", value),
                }),
            }
        }

        if let Some(ref value) = self.priority {
            match TaskPriority::parse(value) {
                Some(priority) => filter.priority = Some(priority),
                None => errors.push(FieldError {
                    field: "priority".to_string(),
                    message: format!("Unknown priority '{}'", value),
                }),
            }
        }

        if let Some(ref value) = self.sort_by {
            match SortField::parse(value) {
                Some(sort_by) => filter.sort_by = sort_by,
                None => errors.push(FieldError {
                    field: "sortBy".to_string(),
                    message: format!("Unsortable field '{}'", value),
                }),
            }
        }

        if let Some(ref value) = self.order {
            match SortOrder::parse(value) {
                Some(order) => filter.order = order,
                None => errors.push(FieldError {
                    field: "order".to_string(),
                    message: format!("Order must be 'asc' or 'desc', got '{}'", value),
                }),
            }
        }

        filter.search = self.search.filter(|s| !s.trim().is_empty());

        if errors.is_empty() {
            Ok(filter)
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

/// Parses a path segment as a task id
///
/// A malformed id cannot resolve to a task the caller owns, so it gets
/// the same 404 as an unknown one.
fn parse_task_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::NotFound("Task not found".to_string()))
}

/// `GET /api/tasks`
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Task>>>> {
    let filter = query.into_filter()?;
    let tasks = Task::list(&state.db, auth.user_id, filter).await?;

    Ok(Json(ApiResponse::ok(tasks)))
}

/// `POST /api/tasks`
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): WithRejection<Json<CreateTaskRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Task>>)> {
    req.validate()?;

    let task = Task::create(
        &state.db,
        auth.user_id,
        CreateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
        },
    )
    .await?;

    tracing::debug!(task_id = %task.id, user_id = %auth.user_id, "Task created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message("Task created successfully", task)),
    ))
}

/// `GET /api/tasks/:id`
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Task>>> {
    let id = parse_task_id(&id)?;

    let task = Task::find_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(ApiResponse::ok(task)))
}

/// `PUT /api/tasks/:id`
///
/// Partial update: absent fields stay unchanged, and `dueDate: null`
/// clears the due date.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateTaskRequest>, ApiError>,
) -> ApiResult<Json<ApiResponse<Task>>> {
    let id = parse_task_id(&id)?;
    req.validate()?;

    let task = Task::update(
        &state.db,
        id,
        auth.user_id,
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(ApiResponse::ok_with_message(
        "Task updated successfully",
        task,
    )))
}

/// `DELETE /api/tasks/:id`
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let id = parse_task_id(&id)?;

    let deleted = Task::delete(&state.db, id, auth.user_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    Ok(Json(ApiResponse::ok_message("Task deleted successfully")))
}

/// `GET /api/tasks/stats`
pub async fn task_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<ApiResponse<TaskStats>>> {
    let stats = Task::stats(&state.db, auth.user_id).await?;

    Ok(Json(ApiResponse::ok(stats)))
}
