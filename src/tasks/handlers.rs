use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::{message_body, ApiError, ApiResult},
    state::AppState,
    tasks::{
        dto::{CreateTaskRequest, TaskResponse, UpdateTaskRequest},
        repo::{Task, TaskWriteError},
    },
};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task)
                .put(update_task)
                .patch(update_task)
                .delete(delete_task),
        )
}

fn not_found() -> ApiError {
    // Missing and not-owned are the same answer so task ids can't be probed.
    ApiError::NotFound("Task not found".into())
}

/// An id that isn't a UUID can't name any task, so it gets the same 404 as
/// an unknown one.
fn parse_task_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| not_found())
}

fn duplicate_title() -> ApiError {
    ApiError::validation("title", "A task with this title already exists for the user")
}

fn validate_title(title: &str) -> Result<&str, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("title", "Title must not be empty"));
    }
    Ok(title)
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = Task::list_by_user(&state.db, user_id).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let title = validate_title(&payload.title)?;
    let status = payload.status.unwrap_or_default();

    let task = Task::create(&state.db, user_id, title, payload.description.as_deref(), status)
        .await
        .map_err(|e| match e {
            TaskWriteError::DuplicateTitle => {
                warn!(%user_id, title, "duplicate task title");
                duplicate_title()
            }
            TaskWriteError::Db(e) => e.into(),
        })?;

    info!(%user_id, task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task.into())))
}

#[instrument(skip(state))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_task_id(&id)?;
    let task = Task::find_for_user(&state.db, user_id, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(task.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_task_id(&id)?;
    let title = payload
        .title
        .as_deref()
        .map(validate_title)
        .transpose()?;

    let task = Task::update_for_user(
        &state.db,
        user_id,
        id,
        title,
        payload.description.as_deref(),
        payload.status,
    )
    .await
    .map_err(|e| match e {
        TaskWriteError::DuplicateTitle => {
            warn!(%user_id, task_id = %id, "duplicate task title on update");
            duplicate_title()
        }
        TaskWriteError::Db(e) => e.into(),
    })?
    .ok_or_else(not_found)?;

    info!(%user_id, task_id = %task.id, "task updated");
    Ok(Json(task.into()))
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_task_id(&id)?;
    let deleted = Task::delete_for_user(&state.db, user_id, id).await?;
    if !deleted {
        return Err(not_found());
    }
    info!(%user_id, task_id = %id, "task deleted");
    Ok(message_body("Task deleted successfully."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_trimmed() {
        assert_eq!(validate_title("  Buy milk  ").unwrap(), "Buy milk");
    }

    #[test]
    fn empty_and_whitespace_titles_rejected() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn not_found_never_mentions_ownership() {
        let msg = not_found().to_string();
        assert_eq!(msg, "Task not found");
    }

    #[test]
    fn malformed_id_reads_as_missing() {
        let err = parse_task_id("not-a-uuid").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(parse_task_id("5f8b1c2e-0000-4000-8000-000000000000").is_ok());
    }
}
