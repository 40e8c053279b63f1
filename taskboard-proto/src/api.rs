//! JSON response bodies for the HTTP surface.
//!
//! Request bodies live next to the type they act on
//! ([`SubmitChangeRequest`](crate::change_request::SubmitChangeRequest),
//! [`NotificationUpdate`](crate::notification::NotificationUpdate),
//! [`TaskPatch`](crate::task::TaskPatch)).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::change_request::ChangeRequest;
use crate::ids::{ProjectId, TaskId, UserId, WorkspaceId};
use crate::notification::Notification;
use crate::role::Role;
use crate::task::TaskStatus;

/// Public identity of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: Option<String>,
    pub username: String,
}

impl UserSummary {
    /// Name shown in notification text: display name, else username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    pub id: WorkspaceId,
    pub name: String,
    pub owner_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub workspace_id: WorkspaceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: ProjectId,
}

/// A project together with the workspace it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWithWorkspace {
    #[serde(flatten)]
    pub project: ProjectSummary,
    pub workspace: WorkspaceSummary,
}

/// A task together with its project and workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskWithProject {
    #[serde(flatten)]
    pub task: TaskSummary,
    pub project: ProjectWithWorkspace,
}

/// A change request with everything the inbox needs to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequestDetail {
    #[serde(flatten)]
    pub request: ChangeRequest,
    pub task: TaskWithProject,
    pub requester: UserSummary,
    pub processor: Option<UserSummary>,
}

/// One entry of `GET /api/notifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub workspace: Option<WorkspaceSummary>,
    pub project: Option<ProjectSummary>,
    pub task: Option<TaskSummary>,
    pub actor: Option<UserSummary>,
    pub change_request: Option<ChangeRequestDetail>,
}

/// Project name attached to an assigned task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectName {
    pub name: String,
}

/// One entry of `GET /api/workspaces/{ws}/tasks`.
///
/// `status` is the projected status, not necessarily the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedTask {
    pub id: TaskId,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: ProjectId,
    pub project: ProjectName,
    pub assignees: Vec<UserSummary>,
    pub change_requests: Vec<ChangeRequest>,
}

/// Response to a change-request submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub action: String,
    pub change_request: ChangeRequest,
}

/// Generic acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub const OK: Self = Self { success: true };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResponse {
    pub role: Role,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
