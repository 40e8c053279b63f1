//! Per-recipient inbox entries and unread badge counts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::change_request::Decision;
use crate::ids::{ChangeRequestId, NotificationId, ProjectId, TaskId, UserId, WorkspaceId};

/// One inbox entry for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// Recipient.
    pub user_id: UserId,
    /// Server-generated text.
    pub message: String,
    /// Deep link into the dashboard.
    pub link: Option<String>,
    /// Change request this entry is about, if any.
    pub change_request_id: Option<ChangeRequestId>,
    /// Whether the recipient has seen it.
    pub is_read: bool,
    /// Workspace the event happened in.
    pub workspace_id: Option<WorkspaceId>,
    /// Project the event happened in.
    pub project_id: Option<ProjectId>,
    /// Task the event is about.
    pub task_id: Option<TaskId>,
    /// User who caused the event.
    pub actor_id: Option<UserId>,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

/// Body of `PATCH /api/notifications/{id}`.
///
/// A decision resolves the linked change request and always marks the
/// notification read; `is_read` alone just toggles the flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationUpdate {
    /// New read flag.
    #[serde(default)]
    pub is_read: Option<bool>,
    /// Verdict on the linked change request.
    #[serde(default, alias = "decision")]
    pub change_request_status: Option<Decision>,
}

/// Unread notifications for one (workspace, project) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadGroup {
    /// Workspace, if the notifications carry one.
    pub workspace_id: Option<WorkspaceId>,
    /// Project, if the notifications carry one.
    pub project_id: Option<ProjectId>,
    /// Number of unread notifications in the group.
    pub count: u64,
}

/// Unread counts for badge rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounts {
    /// Workspace id -> unread count.
    pub workspaces: BTreeMap<String, u64>,
    /// Workspace id -> project id -> unread count.
    pub projects: BTreeMap<String, BTreeMap<String, u64>>,
    /// All unread notifications, including those without a workspace.
    pub total: u64,
}

impl UnreadCounts {
    /// Folds grouped counts into per-workspace and per-project totals.
    ///
    /// Groups without a workspace only contribute to `total`; a project is
    /// only recorded under the workspace it was grouped with.
    #[must_use]
    pub fn from_groups(groups: &[UnreadGroup]) -> Self {
        let mut counts = Self::default();
        for group in groups {
            counts.total += group.count;
            let Some(workspace_id) = group.workspace_id else {
                continue;
            };
            let ws_key = workspace_id.to_string();
            *counts.workspaces.entry(ws_key.clone()).or_default() += group.count;
            if let Some(project_id) = group.project_id {
                *counts
                    .projects
                    .entry(ws_key)
                    .or_default()
                    .entry(project_id.to_string())
                    .or_default() += group.count;
            }
        }
        counts
    }
}
