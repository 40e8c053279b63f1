//! Read-flag updates and approval decisions on a notification.

use taskboard_proto::change_request::Decision;
use taskboard_proto::ids::{NotificationId, UserId};
use taskboard_proto::notification::{Notification, NotificationUpdate};

use super::fanout::{outcome_message, processor_label, requester_message, tasks_link};
use crate::auth::Principal;
use crate::error::AppError;
use crate::store::Store;

/// Applies a `PATCH` to one of the caller's notifications.
///
/// With a decision, the linked change request is resolved and the
/// notification is marked read whatever `is_read` says. Without one, only the
/// read flag changes.
///
/// # Errors
///
/// - [`AppError::NotFound`] if the notification does not exist or belongs to
///   someone else.
/// - Any error of [`resolve_change_request`] when a decision is given.
pub async fn update_notification(
    store: &Store,
    principal: &Principal,
    notification_id: NotificationId,
    update: NotificationUpdate,
) -> Result<(), AppError> {
    let notification = owned_notification(store, principal.id, notification_id).await?;

    match update.change_request_status {
        Some(decision) => resolve_change_request(store, principal, &notification, decision).await,
        None => {
            if let Some(is_read) = update.is_read {
                store.set_notification_read(notification.id, is_read).await?;
            }
            Ok(())
        }
    }
}

pub(super) async fn owned_notification(
    store: &Store,
    user_id: UserId,
    notification_id: NotificationId,
) -> Result<Notification, AppError> {
    store
        .get_notification(notification_id)
        .await?
        .filter(|n| n.user_id == user_id)
        .ok_or_else(|| AppError::not_found("Notification"))
}

/// Decides the change request linked to `notification`.
///
/// In one transaction: moves the request out of `PENDING`, applies the
/// decision to the task, rewrites the approvers' notifications, notifies the
/// requester, and marks `notification` read. Approval writes the proposed
/// status and due date where present. Rejection restores the status captured
/// at submission.
///
/// # Errors
///
/// - [`AppError::InvalidState`] if the notification has no change request or
///   the request was already decided.
/// - [`AppError::Forbidden`] if the caller is the requester or is not an
///   owner or admin of the task's workspace.
/// - [`AppError::NotFound`] if the request or its task has disappeared.
/// - [`AppError::Store`] on persistence failure.
pub async fn resolve_change_request(
    store: &Store,
    principal: &Principal,
    notification: &Notification,
    decision: Decision,
) -> Result<(), AppError> {
    let Some(change_request_id) = notification.change_request_id else {
        return Err(AppError::InvalidState(
            "Notification is not linked to a change request".to_string(),
        ));
    };
    let request = store
        .get_change_request(change_request_id)
        .await?
        .ok_or_else(|| AppError::not_found("Change request"))?;
    if request.requester_id == principal.id {
        tracing::warn!(
            change_request_id = %request.id,
            user_id = %principal.id,
            "requester tried to resolve own change request"
        );
        return Err(AppError::Forbidden(
            "You cannot resolve your own change request".to_string(),
        ));
    }
    let task = store
        .get_task(request.task_id)
        .await?
        .ok_or_else(|| AppError::not_found("Task"))?;
    let project = store
        .get_project(task.project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project"))?;
    let workspace_id = project.workspace_id;
    let can_approve = store
        .role_of(workspace_id, principal.id)
        .await?
        .is_some_and(|role| role.can_approve());
    if !can_approve {
        tracing::warn!(
            change_request_id = %request.id,
            user_id = %principal.id,
            "non-admin tried to resolve change request"
        );
        return Err(AppError::Forbidden(
            "Only workspace owners and admins can resolve change requests".to_string(),
        ));
    }
    let resolved = request.status.resolve(decision)?;

    let processor = processor_label(principal.display_name());
    let outcome = Notification {
        id: NotificationId::new(),
        user_id: request.requester_id,
        message: requester_message(&task.name, decision, processor),
        link: Some(tasks_link(workspace_id)),
        change_request_id: None,
        is_read: false,
        workspace_id: Some(workspace_id),
        project_id: Some(project.id),
        task_id: Some(task.id),
        actor_id: Some(principal.id),
        created_at: chrono::Utc::now(),
    };

    let mut txn = store.begin().await?;
    if !txn
        .transition_change_request(request.id, resolved, principal.id)
        .await?
    {
        tracing::warn!(change_request_id = %request.id, "change request resolved concurrently");
        return Err(AppError::InvalidState(
            "change request already resolved".to_string(),
        ));
    }
    match decision {
        Decision::Approved => {
            txn.apply_task_change(task.id, request.new_status, request.new_due_date)
                .await?;
        }
        Decision::Rejected => {
            txn.apply_task_change(task.id, Some(request.original_status), None)
                .await?;
        }
    }
    txn.rewrite_request_notifications(
        request.id,
        request.requester_id,
        &outcome_message(&task.name, decision, processor),
    )
    .await?;
    txn.insert_notifications(std::slice::from_ref(&outcome))
        .await?;
    txn.set_notification_read(notification.id, true).await?;
    txn.commit().await?;

    tracing::info!(
        change_request_id = %request.id,
        task_id = %task.id,
        processor_id = %principal.id,
        status = %resolved,
        task_status = %request.status_after(decision, task.status),
        "change request resolved"
    );
    Ok(())
}
