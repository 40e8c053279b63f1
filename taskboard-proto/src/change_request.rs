//! Change requests: member proposals to alter a task, decided by an approver.
//!
//! A request starts `PENDING` and moves exactly once to `APPROVED` or
//! `REJECTED`. [`ChangeRequestStatus::resolve`] encodes the only legal
//! transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChangeRequestId, TaskId, UserId};
use crate::task::TaskStatus;

/// Lifecycle state of a change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeRequestStatus {
    /// Waiting on an approver.
    Pending,
    /// Accepted; the proposal was applied to the task.
    Approved,
    /// Declined; the task was restored to its original status.
    Rejected,
}

/// An approver's verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Apply the proposal.
    Approved,
    /// Discard the proposal.
    Rejected,
}

/// Error returned when text does not name a [`ChangeRequestStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid change request status: {0}")]
pub struct ParseChangeRequestStatusError(pub String);

/// A resolved request cannot be decided again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("change request already {}", .0.as_str().to_lowercase())]
pub struct AlreadyResolved(pub ChangeRequestStatus);

impl ChangeRequestStatus {
    /// Returns the label used on the wire and in the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Returns `true` for `APPROVED` and `REJECTED`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Computes the state after `decision`.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyResolved`] if the request is no longer pending.
    pub const fn resolve(self, decision: Decision) -> Result<Self, AlreadyResolved> {
        match self {
            Self::Pending => Ok(decision.into_status()),
            Self::Approved | Self::Rejected => Err(AlreadyResolved(self)),
        }
    }
}

impl std::str::FromStr for ChangeRequestStatus {
    type Err = ParseChangeRequestStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(ParseChangeRequestStatusError(s.to_string())),
        }
    }
}

impl std::fmt::Display for ChangeRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Decision {
    /// The terminal status this decision leads to.
    #[must_use]
    pub const fn into_status(self) -> ChangeRequestStatus {
        match self {
            Self::Approved => ChangeRequestStatus::Approved,
            Self::Rejected => ChangeRequestStatus::Rejected,
        }
    }

    /// Past-tense verb used in notification text.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// A proposal to alter one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    /// Unique request identifier.
    pub id: ChangeRequestId,
    /// Task the proposal targets.
    pub task_id: TaskId,
    /// User who submitted the request.
    pub requester_id: UserId,
    /// Task status captured at submission.
    pub original_status: TaskStatus,
    /// Proposed status, if the request changes status.
    pub new_status: Option<TaskStatus>,
    /// Proposed due date, if the request changes the due date.
    pub new_due_date: Option<DateTime<Utc>>,
    /// Free-text justification.
    pub reason: Option<String>,
    /// Lifecycle state.
    pub status: ChangeRequestStatus,
    /// Approver who resolved the request.
    pub processor_id: Option<UserId>,
    /// When the request was submitted.
    pub created_at: DateTime<Utc>,
    /// When the request last changed.
    pub updated_at: DateTime<Utc>,
}

impl ChangeRequest {
    /// Builds a new pending request against a task in `original_status`.
    #[must_use]
    pub fn pending(
        task_id: TaskId,
        requester_id: UserId,
        original_status: TaskStatus,
        proposal: SubmitChangeRequest,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ChangeRequestId::new(),
            task_id,
            requester_id,
            original_status,
            new_status: proposal.new_status,
            new_due_date: proposal.new_due_date,
            reason: proposal.reason,
            status: ChangeRequestStatus::Pending,
            processor_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Task status after `decision` is applied to a task currently in `current`.
    ///
    /// Approval moves to `new_status` when one was proposed and otherwise
    /// leaves the task alone. Rejection always restores `original_status`.
    #[must_use]
    pub fn status_after(&self, decision: Decision, current: TaskStatus) -> TaskStatus {
        match decision {
            Decision::Approved => self.new_status.unwrap_or(current),
            Decision::Rejected => self.original_status,
        }
    }
}

/// Body of a change-request submission. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitChangeRequest {
    /// Proposed status.
    #[serde(default)]
    pub new_status: Option<TaskStatus>,
    /// Proposed due date (RFC 3339).
    #[serde(default)]
    pub new_due_date: Option<DateTime<Utc>>,
    /// Free-text justification.
    #[serde(default)]
    pub reason: Option<String>,
}
