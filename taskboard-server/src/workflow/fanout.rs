//! Recipient selection and server-side message text for change-request
//! notifications.

use taskboard_proto::change_request::Decision;
use taskboard_proto::ids::{UserId, WorkspaceId};

/// Name used when the processor has neither a display name nor a username.
pub const FALLBACK_PROCESSOR_NAME: &str = "An administrator";

/// Users notified of a new change request.
///
/// Admins in the order given, then the owner, with duplicates and the
/// requester removed.
#[must_use]
pub fn recipients_for(owner_id: UserId, admin_ids: &[UserId], requester_id: UserId) -> Vec<UserId> {
    let mut recipients: Vec<UserId> = Vec::with_capacity(admin_ids.len() + 1);
    for id in admin_ids.iter().copied().chain(std::iter::once(owner_id)) {
        if id != requester_id && !recipients.contains(&id) {
            recipients.push(id);
        }
    }
    recipients
}

/// Label for the approver in outcome messages.
#[must_use]
pub fn processor_label(display_name: &str) -> &str {
    if display_name.trim().is_empty() {
        FALLBACK_PROCESSOR_NAME
    } else {
        display_name
    }
}

#[must_use]
pub fn request_message(requester: &str, task: &str, project: &str) -> String {
    format!("User {requester} requested a change for task \"{task}\" in project \"{project}\"")
}

/// Replacement text for the approvers' copies once a request is decided.
#[must_use]
pub fn outcome_message(task: &str, decision: Decision, processor: &str) -> String {
    format!(
        "Request for task \"{task}\" was {} by {}.",
        decision.verb(),
        processor_label(processor)
    )
}

/// Text of the notification sent back to the requester.
#[must_use]
pub fn requester_message(task: &str, decision: Decision, processor: &str) -> String {
    format!(
        "Your change request for task \"{task}\" has been {} by {}.",
        decision.verb(),
        processor_label(processor)
    )
}

#[must_use]
pub fn notifications_link(workspace_id: WorkspaceId) -> String {
    format!("/dashboard/workspaces/{workspace_id}/notifications")
}

#[must_use]
pub fn tasks_link(workspace_id: WorkspaceId) -> String {
    format!("/dashboard/workspaces/{workspace_id}/tasks")
}
