//! Row types and the fetch helpers shared by [`Store`](super::Store) and
//! [`StoreTxn`](super::StoreTxn).
//!
//! Helpers take a `&mut SqliteConnection` so they run either on a pooled
//! connection or inside an open transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use taskboard_proto::api::{ProjectSummary, UserSummary, WorkspaceSummary};
use taskboard_proto::change_request::{ChangeRequest, ChangeRequestStatus};
use taskboard_proto::ids::{
    ChangeRequestId, NotificationId, ProjectId, TaskId, UserId, WorkspaceId,
};
use taskboard_proto::notification::Notification;
use taskboard_proto::task::{Task, TaskStatus};
use uuid::Uuid;

use super::StoreError;

pub(super) const TASK_COLUMNS: &str =
    "id, project_id, name, description, status, due_date, created_at";
pub(super) const CHANGE_REQUEST_COLUMNS: &str = "id, task_id, requester_id, original_status, \
     new_status, new_due_date, reason, status, processor_id, created_at, updated_at";
pub(super) const NOTIFICATION_COLUMNS: &str = "id, user_id, message, link, change_request_id, \
     is_read, workspace_id, project_id, task_id, actor_id, created_at";

fn parse_status(text: &str) -> Result<TaskStatus, StoreError> {
    text.parse()
        .map_err(|e: taskboard_proto::task::ParseTaskStatusError| StoreError::Corrupt(e.to_string()))
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserRow {
    id: Uuid,
    name: Option<String>,
    username: String,
}

impl From<UserRow> for UserSummary {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            username: row.username,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct WorkspaceRow {
    id: Uuid,
    name: String,
    owner_id: Uuid,
}

impl From<WorkspaceRow> for WorkspaceSummary {
    fn from(row: WorkspaceRow) -> Self {
        Self {
            id: WorkspaceId::from_uuid(row.id),
            name: row.name,
            owner_id: UserId::from_uuid(row.owner_id),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProjectRow {
    id: Uuid,
    name: String,
    workspace_id: Uuid,
}

impl From<ProjectRow> for ProjectSummary {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: ProjectId::from_uuid(row.id),
            name: row.name,
            workspace_id: WorkspaceId::from_uuid(row.workspace_id),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct TaskRow {
    pub(super) id: Uuid,
    project_id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TaskRow {
    pub(super) fn into_task(self, assignee_ids: Vec<UserId>) -> Result<Task, StoreError> {
        Ok(Task {
            id: TaskId::from_uuid(self.id),
            name: self.name,
            description: self.description,
            status: parse_status(&self.status)?,
            due_date: self.due_date,
            project_id: ProjectId::from_uuid(self.project_id),
            assignee_ids,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ChangeRequestRow {
    id: Uuid,
    task_id: Uuid,
    requester_id: Uuid,
    original_status: String,
    new_status: Option<String>,
    new_due_date: Option<DateTime<Utc>>,
    reason: Option<String>,
    status: String,
    processor_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ChangeRequestRow> for ChangeRequest {
    type Error = StoreError;

    fn try_from(row: ChangeRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ChangeRequestId::from_uuid(row.id),
            task_id: TaskId::from_uuid(row.task_id),
            requester_id: UserId::from_uuid(row.requester_id),
            original_status: parse_status(&row.original_status)?,
            new_status: row.new_status.as_deref().map(parse_status).transpose()?,
            new_due_date: row.new_due_date,
            reason: row.reason,
            status: row
                .status
                .parse::<ChangeRequestStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            processor_id: row.processor_id.map(UserId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    message: String,
    link: Option<String>,
    change_request_id: Option<Uuid>,
    is_read: bool,
    workspace_id: Option<Uuid>,
    project_id: Option<Uuid>,
    task_id: Option<Uuid>,
    actor_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: NotificationId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            message: row.message,
            link: row.link,
            change_request_id: row.change_request_id.map(ChangeRequestId::from_uuid),
            is_read: row.is_read,
            workspace_id: row.workspace_id.map(WorkspaceId::from_uuid),
            project_id: row.project_id.map(ProjectId::from_uuid),
            task_id: row.task_id.map(TaskId::from_uuid),
            actor_id: row.actor_id.map(UserId::from_uuid),
            created_at: row.created_at,
        }
    }
}

pub(super) async fn fetch_assignee_ids(
    conn: &mut SqliteConnection,
    task_id: TaskId,
) -> Result<Vec<UserId>, StoreError> {
    let rows = sqlx::query_as::<_, (Uuid,)>(
        "SELECT user_id FROM task_assignees WHERE task_id = ? ORDER BY user_id",
    )
    .bind(*task_id.as_uuid())
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id,)| UserId::from_uuid(id))
        .collect())
}

pub(super) async fn fetch_task(
    conn: &mut SqliteConnection,
    task_id: TaskId,
) -> Result<Option<Task>, StoreError> {
    let row = sqlx::query_as::<_, TaskRow>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"
    ))
    .bind(*task_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        None => Ok(None),
        Some(row) => {
            let assignees = fetch_assignee_ids(conn, task_id).await?;
            row.into_task(assignees).map(Some)
        }
    }
}

pub(super) async fn insert_notification(
    conn: &mut SqliteConnection,
    n: &Notification,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO notifications (id, user_id, message, link, change_request_id, is_read, \
         workspace_id, project_id, task_id, actor_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(*n.id.as_uuid())
    .bind(*n.user_id.as_uuid())
    .bind(&n.message)
    .bind(&n.link)
    .bind(n.change_request_id.map(|id| *id.as_uuid()))
    .bind(n.is_read)
    .bind(n.workspace_id.map(|id| *id.as_uuid()))
    .bind(n.project_id.map(|id| *id.as_uuid()))
    .bind(n.task_id.map(|id| *id.as_uuid()))
    .bind(n.actor_id.map(|id| *id.as_uuid()))
    .bind(n.created_at)
    .execute(conn)
    .await?;
    Ok(())
}
