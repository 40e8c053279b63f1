//! Task model, direct-edit patch, and read-time status projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::change_request::{ChangeRequest, ChangeRequestStatus};
use crate::ids::{ProjectId, TaskId, UserId};
use crate::patch::Patch;

/// Maximum allowed task name length in characters.
pub const MAX_TASK_NAME_LENGTH: usize = 256;

/// Workflow column a task sits in.
///
/// The serialized form is the human-readable label, which is also what the
/// store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not yet scheduled.
    Backlog,
    /// Scheduled, not started.
    Todo,
    /// Actively being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// A change request is waiting on an approver.
    #[serde(rename = "In Review")]
    InReview,
    /// Finished.
    Done,
}

/// Error returned when text does not name a [`TaskStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid task status: {0}")]
pub struct ParseTaskStatusError(pub String);

impl TaskStatus {
    /// All statuses in board order.
    pub const ALL: [Self; 5] = [
        Self::Backlog,
        Self::Todo,
        Self::InProgress,
        Self::InReview,
        Self::Done,
    ];

    /// Returns the label used on the wire and in the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::Todo => "Todo",
            Self::InProgress => "In Progress",
            Self::InReview => "In Review",
            Self::Done => "Done",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseTaskStatusError(s.to_string()))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Short title.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Stored status. Readers should go through [`project_status`].
    pub status: TaskStatus,
    /// Optional deadline.
    pub due_date: Option<DateTime<Utc>>,
    /// Owning project.
    pub project_id: ProjectId,
    /// Users the task is assigned to.
    pub assignee_ids: Vec<UserId>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

/// Direct edit of a task by a workspace owner or admin.
///
/// Every field is independently optional. `description` and `due_date`
/// additionally distinguish "clear" from "leave alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// New name. Must not be blank.
    #[serde(default)]
    pub name: Option<String>,
    /// New description, or `null` to clear it.
    #[serde(default)]
    pub description: Patch<String>,
    /// New status. "In Review" is rejected.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// New due date, or `null` to clear it.
    #[serde(default)]
    pub due_date: Patch<DateTime<Utc>>,
    /// Full replacement of the assignee set.
    #[serde(default)]
    pub assignee_ids: Option<Vec<UserId>>,
}

/// Reasons a [`TaskPatch`] is refused before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskPatchError {
    /// No field was supplied.
    #[error("no update data provided")]
    Empty,
    /// `name` was supplied but blank.
    #[error("task name is required")]
    BlankName,
    /// `name` exceeds [`MAX_TASK_NAME_LENGTH`].
    #[error("task name too long (max {MAX_TASK_NAME_LENGTH} characters)")]
    NameTooLong,
    /// Direct edits may not put a task into review.
    #[error("status \"In Review\" is set by change requests only")]
    ReviewStatus,
}

impl TaskPatch {
    /// Returns `true` if no field was supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_absent()
            && self.status.is_none()
            && self.due_date.is_absent()
            && self.assignee_ids.is_none()
    }

    /// Checks the patch on its own, without looking at the task.
    ///
    /// # Errors
    ///
    /// Returns the first [`TaskPatchError`] that applies.
    pub fn validate(&self) -> Result<(), TaskPatchError> {
        if self.is_empty() {
            return Err(TaskPatchError::Empty);
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(TaskPatchError::BlankName);
            }
            if name.chars().count() > MAX_TASK_NAME_LENGTH {
                return Err(TaskPatchError::NameTooLong);
            }
        }
        if self.status == Some(TaskStatus::InReview) {
            return Err(TaskPatchError::ReviewStatus);
        }
        Ok(())
    }

    /// Applies the patch to a task in place.
    pub fn apply_to(self, task: &mut Task) {
        if let Some(name) = self.name {
            task.name = name.trim().to_string();
        }
        task.description = self.description.apply(task.description.take());
        if let Some(status) = self.status {
            task.status = status;
        }
        task.due_date = self.due_date.apply(task.due_date.take());
        if let Some(mut assignees) = self.assignee_ids {
            assignees.sort_unstable();
            assignees.dedup();
            task.assignee_ids = assignees;
        }
    }
}

/// Status shown to readers.
///
/// A task with any pending change request reads as "In Review" whatever its
/// stored status is. Requests for other tasks in `requests` are ignored.
#[must_use]
pub fn project_status(task: &Task, requests: &[ChangeRequest]) -> TaskStatus {
    let pending = requests
        .iter()
        .any(|cr| cr.task_id == task.id && cr.status == ChangeRequestStatus::Pending);
    if pending {
        TaskStatus::InReview
    } else {
        task.status
    }
}
