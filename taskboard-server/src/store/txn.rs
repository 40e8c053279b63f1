//! Write transaction over the task database.
//!
//! Dropping a [`StoreTxn`] without calling [`StoreTxn::commit`] rolls every
//! statement back.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use taskboard_proto::change_request::{ChangeRequest, ChangeRequestStatus};
use taskboard_proto::ids::{ChangeRequestId, NotificationId, TaskId, UserId};
use taskboard_proto::notification::Notification;
use taskboard_proto::task::{Task, TaskStatus};

use super::{StoreError, rows};

/// An open `SQLite` transaction.
pub struct StoreTxn {
    tx: Transaction<'static, Sqlite>,
}

impl StoreTxn {
    pub(super) const fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    /// Commits every statement issued through this transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the commit fails.
    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Reads a task inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure.
    pub async fn get_task(&mut self, id: TaskId) -> Result<Option<Task>, StoreError> {
        rows::fetch_task(&mut *self.tx, id).await
    }

    /// Inserts a task row and its assignee rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn insert_task(&mut self, task: &Task) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO tasks (id, project_id, name, description, status, due_date, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(*task.id.as_uuid())
        .bind(*task.project_id.as_uuid())
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.due_date)
        .bind(task.created_at)
        .execute(&mut *self.tx)
        .await?;
        self.replace_assignees(task.id, &task.assignee_ids).await
    }

    /// Writes every mutable column of `task` and replaces its assignee set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn update_task(&mut self, task: &Task) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE tasks SET name = ?, description = ?, status = ?, due_date = ? WHERE id = ?",
        )
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.due_date)
        .bind(*task.id.as_uuid())
        .execute(&mut *self.tx)
        .await?;
        self.replace_assignees(task.id, &task.assignee_ids).await
    }

    async fn replace_assignees(
        &mut self,
        task_id: TaskId,
        assignee_ids: &[UserId],
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
            .bind(*task_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        for user_id in assignee_ids {
            sqlx::query("INSERT OR IGNORE INTO task_assignees (task_id, user_id) VALUES (?, ?)")
                .bind(*task_id.as_uuid())
                .bind(*user_id.as_uuid())
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    /// Applies an approved or rejected request to the task. `None` leaves the
    /// column untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn apply_task_change(
        &mut self,
        task_id: TaskId,
        status: Option<TaskStatus>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        if status.is_none() && due_date.is_none() {
            return Ok(());
        }
        sqlx::query(
            "UPDATE tasks SET status = COALESCE(?, status), due_date = COALESCE(?, due_date) \
             WHERE id = ?",
        )
        .bind(status.map(TaskStatus::as_str))
        .bind(due_date)
        .bind(*task_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Inserts a new change request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn insert_change_request(&mut self, cr: &ChangeRequest) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO change_requests (id, task_id, requester_id, original_status, new_status, \
             new_due_date, reason, status, processor_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(*cr.id.as_uuid())
        .bind(*cr.task_id.as_uuid())
        .bind(*cr.requester_id.as_uuid())
        .bind(cr.original_status.as_str())
        .bind(cr.new_status.map(TaskStatus::as_str))
        .bind(cr.new_due_date)
        .bind(&cr.reason)
        .bind(cr.status.as_str())
        .bind(cr.processor_id.map(|id| *id.as_uuid()))
        .bind(cr.created_at)
        .bind(cr.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Moves a request from `PENDING` to `status`, recording the processor.
    ///
    /// Returns `false` without writing anything if the request is no longer
    /// pending, so two concurrent resolutions cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn transition_change_request(
        &mut self,
        id: ChangeRequestId,
        status: ChangeRequestStatus,
        processor_id: UserId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE change_requests SET status = ?, processor_id = ?, updated_at = ? \
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(status.as_str())
        .bind(*processor_id.as_uuid())
        .bind(Utc::now())
        .bind(*id.as_uuid())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Inserts notifications in order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn insert_notifications(
        &mut self,
        notifications: &[Notification],
    ) -> Result<(), StoreError> {
        for notification in notifications {
            rows::insert_notification(&mut *self.tx, notification).await?;
        }
        Ok(())
    }

    /// Rewrites the message of every notification tied to a request, except
    /// those addressed to `except_user`. Returns how many rows changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn rewrite_request_notifications(
        &mut self,
        change_request_id: ChangeRequestId,
        except_user: UserId,
        message: &str,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET message = ? WHERE change_request_id = ? AND user_id != ?",
        )
        .bind(message)
        .bind(*change_request_id.as_uuid())
        .bind(*except_user.as_uuid())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Sets the read flag on one notification.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn set_notification_read(
        &mut self,
        id: NotificationId,
        is_read: bool,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE notifications SET is_read = ? WHERE id = ?")
            .bind(is_read)
            .bind(*id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}
