//! Submitting a change request and notifying the approvers.

use taskboard_proto::change_request::{ChangeRequest, SubmitChangeRequest};
use taskboard_proto::ids::{NotificationId, TaskId, WorkspaceId};
use taskboard_proto::notification::Notification;

use super::fanout::{notifications_link, recipients_for, request_message};
use super::require_role;
use crate::auth::Principal;
use crate::error::AppError;
use crate::store::Store;

/// Records a pending change request for a task and notifies every admin and
/// the owner of the workspace, except the requester.
///
/// The request captures the task's stored status as `original_status`. The
/// request and its notifications are written in one transaction.
///
/// # Errors
///
/// - [`AppError::NotFound`] if the task does not exist or lives in another
///   workspace.
/// - [`AppError::Forbidden`] if the caller holds no role in the workspace.
/// - [`AppError::Store`] on persistence failure.
pub async fn submit_change_request(
    store: &Store,
    principal: &Principal,
    workspace_id: WorkspaceId,
    task_id: TaskId,
    proposal: SubmitChangeRequest,
) -> Result<ChangeRequest, AppError> {
    let task = store
        .get_task(task_id)
        .await?
        .ok_or_else(|| AppError::not_found("Task"))?;
    let project = store
        .get_project(task.project_id)
        .await?
        .filter(|project| project.workspace_id == workspace_id)
        .ok_or_else(|| AppError::not_found("Task"))?;
    let workspace = store
        .get_workspace(workspace_id)
        .await?
        .ok_or_else(|| AppError::not_found("Workspace"))?;
    require_role(store, workspace_id, principal).await?;

    let admins = store.workspace_admins(workspace_id).await?;
    let recipients = recipients_for(workspace.owner_id, &admins, principal.id);

    let request = ChangeRequest::pending(task.id, principal.id, task.status, proposal);
    let message = request_message(principal.display_name(), &task.name, &project.name);
    let link = notifications_link(workspace_id);
    let notifications: Vec<Notification> = recipients
        .iter()
        .map(|&user_id| Notification {
            id: NotificationId::new(),
            user_id,
            message: message.clone(),
            link: Some(link.clone()),
            change_request_id: Some(request.id),
            is_read: false,
            workspace_id: Some(workspace_id),
            project_id: Some(project.id),
            task_id: Some(task.id),
            actor_id: Some(principal.id),
            created_at: request.created_at,
        })
        .collect();

    let mut txn = store.begin().await?;
    txn.insert_change_request(&request).await?;
    txn.insert_notifications(&notifications).await?;
    txn.commit().await?;

    tracing::info!(
        change_request_id = %request.id,
        task_id = %task.id,
        requester_id = %principal.id,
        recipients = notifications.len(),
        "change request submitted"
    );
    Ok(request)
}
