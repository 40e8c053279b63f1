//! Task reads with projected status, role lookup, and direct task edits.

use std::collections::HashMap;

use taskboard_proto::api::{AssignedTask, ProjectName};
use taskboard_proto::ids::{ProjectId, TaskId, WorkspaceId};
use taskboard_proto::role::Role;
use taskboard_proto::task::{Task, TaskPatch, project_status};

use super::require_role;
use crate::auth::Principal;
use crate::error::AppError;
use crate::store::Store;

/// Tasks in a workspace assigned to the caller.
///
/// Ordered by due date with undated tasks last. Each task carries its pending
/// change requests, and reads as "In Review" while any exist.
///
/// # Errors
///
/// - [`AppError::Forbidden`] if the caller holds no role in the workspace.
/// - [`AppError::Store`] on persistence failure.
pub async fn assigned_tasks(
    store: &Store,
    principal: &Principal,
    workspace_id: WorkspaceId,
) -> Result<Vec<AssignedTask>, AppError> {
    require_role(store, workspace_id, principal).await?;

    let tasks = store.assigned_tasks(workspace_id, principal.id).await?;
    let mut project_names: HashMap<ProjectId, String> = HashMap::new();
    let mut assigned = Vec::with_capacity(tasks.len());
    for task in tasks {
        let project_name = match project_names.get(&task.project_id) {
            Some(name) => name.clone(),
            None => {
                let name = store
                    .get_project(task.project_id)
                    .await?
                    .map(|project| project.name)
                    .unwrap_or_default();
                project_names.insert(task.project_id, name.clone());
                name
            }
        };
        let assignees = store.users(&task.assignee_ids).await?;
        let change_requests = store.pending_change_requests(task.id).await?;
        let status = project_status(&task, &change_requests);
        assigned.push(AssignedTask {
            id: task.id,
            name: task.name,
            description: task.description,
            status,
            due_date: task.due_date,
            project_id: task.project_id,
            project: ProjectName { name: project_name },
            assignees,
            change_requests,
        });
    }
    Ok(assigned)
}

/// The caller's role in a workspace.
///
/// # Errors
///
/// - [`AppError::Forbidden`] if the caller holds no role in the workspace.
/// - [`AppError::Store`] on persistence failure.
pub async fn user_role(
    store: &Store,
    principal: &Principal,
    workspace_id: WorkspaceId,
) -> Result<Role, AppError> {
    require_role(store, workspace_id, principal).await
}

/// Edits a task directly. Owners and admins only.
///
/// # Errors
///
/// - [`AppError::Validation`] if the patch is empty, names the task with a
///   blank or overlong name, or sets "In Review".
/// - [`AppError::Forbidden`] unless the caller is an owner or admin.
/// - [`AppError::NotFound`] if the task is not in the project or the project
///   is not in the workspace.
/// - [`AppError::Store`] on persistence failure.
pub async fn edit_task(
    store: &Store,
    principal: &Principal,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
    task_id: TaskId,
    patch: TaskPatch,
) -> Result<Task, AppError> {
    patch.validate()?;

    let role = require_role(store, workspace_id, principal).await?;
    if !role.can_approve() {
        tracing::warn!(
            user_id = %principal.id,
            task_id = %task_id,
            role = %role,
            "member tried to edit task directly"
        );
        return Err(AppError::Forbidden(
            "Only workspace owners and admins can edit tasks".to_string(),
        ));
    }
    store
        .get_project(project_id)
        .await?
        .filter(|project| project.workspace_id == workspace_id)
        .ok_or_else(|| AppError::not_found("Project"))?;
    if let Some(assignee_ids) = &patch.assignee_ids {
        let mut wanted = assignee_ids.clone();
        wanted.sort_unstable();
        wanted.dedup();
        if store.users(&wanted).await?.len() != wanted.len() {
            return Err(AppError::Validation("unknown assignee".to_string()));
        }
    }

    let mut txn = store.begin().await?;
    let mut task = txn
        .get_task(task_id)
        .await?
        .filter(|task| task.project_id == project_id)
        .ok_or_else(|| AppError::not_found("Task"))?;
    patch.apply_to(&mut task);
    txn.update_task(&task).await?;
    txn.commit().await?;

    tracing::info!(task_id = %task.id, editor_id = %principal.id, status = %task.status, "task edited");
    Ok(task)
}
