//! SQLite persistence for users, workspaces, tasks, change requests, and
//! notifications.
//!
//! [`Store`] answers reads on pooled connections and seeds records.
//! Multi-row writes go through [`StoreTxn`], obtained from [`Store::begin`],
//! so a failure part way through leaves nothing behind.
//!
//! An in-memory store has a single connection. Never call a [`Store`] method
//! while a [`StoreTxn`] from the same store is still open.

mod rows;
mod txn;

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use taskboard_proto::api::{ProjectSummary, UserSummary, WorkspaceSummary};
use taskboard_proto::change_request::ChangeRequest;
use taskboard_proto::ids::{
    ChangeRequestId, NotificationId, ProjectId, TaskId, UserId, WorkspaceId,
};
use taskboard_proto::notification::{Notification, UnreadGroup};
use taskboard_proto::role::{MemberRole, Role};
use taskboard_proto::task::{Task, TaskStatus};
use uuid::Uuid;

use rows::{
    CHANGE_REQUEST_COLUMNS, ChangeRequestRow, NOTIFICATION_COLUMNS, NotificationRow, ProjectRow,
    TASK_COLUMNS, TaskRow, UserRow, WorkspaceRow,
};
pub use txn::StoreTxn;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors raised by the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected or failed a query.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed at startup.
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be decoded into a domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The directory for the database file could not be created.
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        /// Directory that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Fields of a task created through [`Store::create_task`].
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<chrono::DateTime<Utc>>,
    pub assignee_ids: Vec<UserId>,
}

/// Handle to the task database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if needed) the database at `url` and runs migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL is invalid, the database cannot be
    /// opened, or migrations fail.
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        if url.contains(":memory:") {
            return Self::open_in_memory().await;
        }
        if let Some(parent) = sqlite_file_parent(url) {
            std::fs::create_dir_all(&parent)
                .map_err(|source| StoreError::CreateDir { path: parent, source })?;
        }
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::migrated(pool).await
    }

    /// Opens a private in-memory database.
    ///
    /// The pool holds exactly one connection that is never recycled, since
    /// each `SQLite` memory connection is its own database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or migrations fail.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, StoreError> {
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    /// Starts a write transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if no connection is available.
    pub async fn begin(&self) -> Result<StoreTxn, StoreError> {
        Ok(StoreTxn::new(self.pool.begin().await?))
    }

    // ───────────────────────────── Seeding ──────────────────────────────

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure, including a taken username.
    pub async fn create_user(
        &self,
        name: Option<&str>,
        username: &str,
    ) -> Result<UserSummary, StoreError> {
        let id = UserId::new();
        sqlx::query("INSERT INTO users (id, name, username) VALUES (?, ?, ?)")
            .bind(*id.as_uuid())
            .bind(name)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(UserSummary {
            id,
            name: name.map(str::to_string),
            username: username.to_string(),
        })
    }

    /// Creates a workspace owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn create_workspace(
        &self,
        name: &str,
        owner_id: UserId,
    ) -> Result<WorkspaceSummary, StoreError> {
        let id = WorkspaceId::new();
        sqlx::query("INSERT INTO workspaces (id, name, owner_id) VALUES (?, ?, ?)")
            .bind(*id.as_uuid())
            .bind(name)
            .bind(*owner_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(WorkspaceSummary {
            id,
            name: name.to_string(),
            owner_id,
        })
    }

    /// Adds or updates a membership row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn add_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO workspace_members (workspace_id, user_id, role) VALUES (?, ?, ?) \
             ON CONFLICT (workspace_id, user_id) DO UPDATE SET role = excluded.role",
        )
        .bind(*workspace_id.as_uuid())
        .bind(*user_id.as_uuid())
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Creates a project inside a workspace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn create_project(
        &self,
        workspace_id: WorkspaceId,
        name: &str,
    ) -> Result<ProjectSummary, StoreError> {
        let id = ProjectId::new();
        sqlx::query("INSERT INTO projects (id, workspace_id, name) VALUES (?, ?, ?)")
            .bind(*id.as_uuid())
            .bind(*workspace_id.as_uuid())
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(ProjectSummary {
            id,
            name: name.to_string(),
            workspace_id,
        })
    }

    /// Creates a task with its assignees.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn create_task(&self, new: NewTask) -> Result<Task, StoreError> {
        let mut assignee_ids = new.assignee_ids;
        assignee_ids.sort_unstable();
        assignee_ids.dedup();
        let task = Task {
            id: TaskId::new(),
            name: new.name,
            description: new.description,
            status: new.status,
            due_date: new.due_date,
            project_id: new.project_id,
            assignee_ids,
            created_at: Utc::now(),
        };
        let mut txn = self.begin().await?;
        txn.insert_task(&task).await?;
        txn.commit().await?;
        Ok(task)
    }

    // ─────────────────────── Users and workspaces ───────────────────────

    /// Looks up a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn get_user(&self, id: UserId) -> Result<Option<UserSummary>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, name, username FROM users WHERE id = ?")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserSummary::from))
    }

    /// Looks up a workspace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn get_workspace(
        &self,
        id: WorkspaceId,
    ) -> Result<Option<WorkspaceSummary>, StoreError> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT id, name, owner_id FROM workspaces WHERE id = ?",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(WorkspaceSummary::from))
    }

    /// Looks up a project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn get_project(&self, id: ProjectId) -> Result<Option<ProjectSummary>, StoreError> {
        let row = sqlx::query_as::<_, ProjectRow>(
            "SELECT id, name, workspace_id FROM projects WHERE id = ?",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ProjectSummary::from))
    }

    /// Resolves the role of `user_id` in a workspace. `None` for outsiders and
    /// for unknown workspaces.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on query failure or an unknown stored role.
    pub async fn role_of(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> Result<Option<Role>, StoreError> {
        let Some(workspace) = self.get_workspace(workspace_id).await? else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT role FROM workspace_members WHERE workspace_id = ? AND user_id = ?",
        )
        .bind(*workspace_id.as_uuid())
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        let membership = row
            .map(|(role,)| role.parse::<MemberRole>())
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Role::resolve(workspace.owner_id, user_id, membership))
    }

    /// Users holding the `admin` membership role, in join order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn workspace_admins(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<UserId>, StoreError> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            "SELECT user_id FROM workspace_members WHERE workspace_id = ? AND role = 'admin' \
             ORDER BY rowid",
        )
        .bind(*workspace_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id,)| UserId::from_uuid(id))
            .collect())
    }

    // ─────────────────────────────── Tasks ──────────────────────────────

    /// Looks up a task with its assignees.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure.
    pub async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        rows::fetch_task(&mut conn, id).await
    }

    /// Tasks in a workspace assigned to `user_id`, earliest due date first and
    /// undated tasks last.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure.
    pub async fn assigned_tasks(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> Result<Vec<Task>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let task_rows = sqlx::query_as::<_, TaskRow>(
            "SELECT t.id, t.project_id, t.name, t.description, t.status, t.due_date, t.created_at \
             FROM tasks t \
             JOIN projects p ON p.id = t.project_id \
             JOIN task_assignees a ON a.task_id = t.id \
             WHERE p.workspace_id = ? AND a.user_id = ? \
             ORDER BY t.due_date IS NULL, t.due_date, t.created_at",
        )
        .bind(*workspace_id.as_uuid())
        .bind(*user_id.as_uuid())
        .fetch_all(&mut *conn)
        .await?;

        let mut tasks = Vec::with_capacity(task_rows.len());
        for row in task_rows {
            let task_id = TaskId::from_uuid(row.id);
            let assignees = rows::fetch_assignee_ids(&mut conn, task_id).await?;
            tasks.push(row.into_task(assignees)?);
        }
        Ok(tasks)
    }

    /// Public identities of the given users, in the given order. Unknown ids
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn users(&self, ids: &[UserId]) -> Result<Vec<UserSummary>, StoreError> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.get_user(*id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    // ────────────────────────── Change requests ─────────────────────────

    /// Looks up a change request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure.
    pub async fn get_change_request(
        &self,
        id: ChangeRequestId,
    ) -> Result<Option<ChangeRequest>, StoreError> {
        let row = sqlx::query_as::<_, ChangeRequestRow>(&format!(
            "SELECT {CHANGE_REQUEST_COLUMNS} FROM change_requests WHERE id = ?"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ChangeRequest::try_from).transpose()
    }

    /// Pending change requests for a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on failure.
    pub async fn pending_change_requests(
        &self,
        task_id: TaskId,
    ) -> Result<Vec<ChangeRequest>, StoreError> {
        let rows = sqlx::query_as::<_, ChangeRequestRow>(&format!(
            "SELECT {CHANGE_REQUEST_COLUMNS} FROM change_requests \
             WHERE task_id = ? AND status = 'PENDING' ORDER BY created_at, id"
        ))
        .bind(*task_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ChangeRequest::try_from).collect()
    }

    // ──────────────────────────── Notifications ─────────────────────────

    /// Looks up a notification.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn get_notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, StoreError> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Notification::from))
    }

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn notifications_for(&self, user_id: UserId) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(*user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    /// All notifications tied to a change request, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn notifications_for_request(
        &self,
        change_request_id: ChangeRequestId,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE change_request_id = ? \
             ORDER BY created_at, id"
        ))
        .bind(*change_request_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    /// Unread notifications of a user grouped by (workspace, project).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn unread_groups(&self, user_id: UserId) -> Result<Vec<UnreadGroup>, StoreError> {
        let rows = sqlx::query_as::<_, (Option<Uuid>, Option<Uuid>, i64)>(
            "SELECT workspace_id, project_id, COUNT(*) FROM notifications \
             WHERE user_id = ? AND is_read = 0 GROUP BY workspace_id, project_id",
        )
        .bind(*user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(workspace_id, project_id, count)| UnreadGroup {
                workspace_id: workspace_id.map(WorkspaceId::from_uuid),
                project_id: project_id.map(ProjectId::from_uuid),
                count: u64::try_from(count).unwrap_or_default(),
            })
            .collect())
    }

    /// Sets the read flag on one notification.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn set_notification_read(
        &self,
        id: NotificationId,
        is_read: bool,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE notifications SET is_read = ? WHERE id = ?")
            .bind(is_read)
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Marks every unread notification of a user read. Returns how many
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, StoreError> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                .bind(*user_id.as_uuid())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Deletes a notification. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure.
    pub async fn delete_notification(&self, id: NotificationId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// Directory that must exist before `SQLite` can create the file named by a
/// `sqlite:` URL.
fn sqlite_file_parent(url: &str) -> Option<PathBuf> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;
    let parent = std::path::Path::new(path).parent()?;
    if parent.as_os_str().is_empty() {
        None
    } else {
        Some(parent.to_path_buf())
    }
}
