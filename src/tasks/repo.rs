use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::is_unique_violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Write outcome for task inserts/updates. The per-owner title collision is
/// decided by the UNIQUE (user_id, title) constraint so concurrent writers
/// cannot both win; updating a row to its own current title does not trip it.
#[derive(Debug, thiserror::Error)]
pub enum TaskWriteError {
    #[error("a task with this title already exists for the user")]
    DuplicateTitle,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

const TITLE_CONSTRAINT: &str = "tasks_user_id_title_key";

fn map_write_error(err: sqlx::Error) -> TaskWriteError {
    if is_unique_violation(&err, TITLE_CONSTRAINT) {
        TaskWriteError::DuplicateTitle
    } else {
        TaskWriteError::Db(err)
    }
}

impl Task {
    /// All tasks owned by `user_id`, newest first (id breaks ties so the
    /// order is stable).
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, status, created_at, updated_at
            FROM tasks
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    /// A single task, only if owned by `user_id`. A task owned by someone
    /// else comes back as `None`, same as a missing one.
    pub async fn find_for_user(
        db: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, status, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// Insert a task owned by `user_id`. Timestamps take their column
    /// defaults.
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
        status: TaskStatus,
    ) -> Result<Task, TaskWriteError> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(status)
        .fetch_one(db)
        .await
        .map_err(map_write_error)
    }

    /// Partial update of an owned task; absent fields keep their value,
    /// `updated_at` is stamped server-side. `None` means no such owned task.
    pub async fn update_for_user(
        db: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        status: Option<TaskStatus>,
    ) -> Result<Option<Task>, TaskWriteError> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                status = COALESCE($5, status),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(status)
        .fetch_optional(db)
        .await
        .map_err(map_write_error)
    }

    /// Delete an owned task. `false` means no such owned task, which makes
    /// a repeated delete indistinguishable from deleting a stranger's task.
    pub async fn delete_for_user(
        db: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
