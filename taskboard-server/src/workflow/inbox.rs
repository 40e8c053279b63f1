//! Listing, counting, and clearing a user's notifications.

use std::collections::HashMap;

use taskboard_proto::api::{
    ChangeRequestDetail, NotificationView, ProjectSummary, ProjectWithWorkspace, TaskSummary,
    TaskWithProject, UserSummary, WorkspaceSummary,
};
use taskboard_proto::ids::{
    ChangeRequestId, NotificationId, ProjectId, TaskId, UserId, WorkspaceId,
};
use taskboard_proto::notification::{Notification, UnreadCounts};

use super::resolve::owned_notification;
use crate::auth::Principal;
use crate::error::AppError;
use crate::store::{Store, StoreError};

/// The caller's notifications, newest first, with the records they refer to.
///
/// # Errors
///
/// Returns [`AppError::Store`] on persistence failure.
pub async fn list_notifications(
    store: &Store,
    principal: &Principal,
) -> Result<Vec<NotificationView>, AppError> {
    let notifications = store.notifications_for(principal.id).await?;
    let mut lookup = Lookup::new(store);
    let mut views = Vec::with_capacity(notifications.len());
    for notification in notifications {
        views.push(lookup.view(notification).await?);
    }
    Ok(views)
}

/// Unread counts of the caller grouped by workspace and project.
///
/// # Errors
///
/// Returns [`AppError::Store`] on persistence failure.
pub async fn unread_counts(store: &Store, principal: &Principal) -> Result<UnreadCounts, AppError> {
    let groups = store.unread_groups(principal.id).await?;
    Ok(UnreadCounts::from_groups(&groups))
}

/// Marks every unread notification of the caller read. Returns how many
/// changed.
///
/// # Errors
///
/// Returns [`AppError::Store`] on persistence failure.
pub async fn mark_all_read(store: &Store, principal: &Principal) -> Result<u64, AppError> {
    let changed = store.mark_all_read(principal.id).await?;
    tracing::info!(user_id = %principal.id, changed, "notifications marked read");
    Ok(changed)
}

/// Deletes one of the caller's notifications.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the notification does not exist or
/// belongs to someone else.
pub async fn delete_notification(
    store: &Store,
    principal: &Principal,
    notification_id: NotificationId,
) -> Result<(), AppError> {
    let notification = owned_notification(store, principal.id, notification_id).await?;
    if !store.delete_notification(notification.id).await? {
        return Err(AppError::not_found("Notification"));
    }
    tracing::info!(notification_id = %notification.id, user_id = %principal.id, "notification deleted");
    Ok(())
}

/// Memoizing loader for the records a page of notifications refers to.
struct Lookup<'a> {
    store: &'a Store,
    users: HashMap<UserId, Option<UserSummary>>,
    workspaces: HashMap<WorkspaceId, Option<WorkspaceSummary>>,
    projects: HashMap<ProjectId, Option<ProjectSummary>>,
    tasks: HashMap<TaskId, Option<TaskSummary>>,
    requests: HashMap<ChangeRequestId, Option<ChangeRequestDetail>>,
}

impl<'a> Lookup<'a> {
    fn new(store: &'a Store) -> Self {
        Self {
            store,
            users: HashMap::new(),
            workspaces: HashMap::new(),
            projects: HashMap::new(),
            tasks: HashMap::new(),
            requests: HashMap::new(),
        }
    }

    async fn view(&mut self, notification: Notification) -> Result<NotificationView, StoreError> {
        let workspace = match notification.workspace_id {
            Some(id) => self.workspace(id).await?,
            None => None,
        };
        let project = match notification.project_id {
            Some(id) => self.project(id).await?,
            None => None,
        };
        let task = match notification.task_id {
            Some(id) => self.task(id).await?,
            None => None,
        };
        let actor = match notification.actor_id {
            Some(id) => self.user(id).await?,
            None => None,
        };
        let change_request = match notification.change_request_id {
            Some(id) => self.change_request(id).await?,
            None => None,
        };
        Ok(NotificationView {
            notification,
            workspace,
            project,
            task,
            actor,
            change_request,
        })
    }

    async fn user(&mut self, id: UserId) -> Result<Option<UserSummary>, StoreError> {
        if let Some(cached) = self.users.get(&id) {
            return Ok(cached.clone());
        }
        let user = self.store.get_user(id).await?;
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn workspace(&mut self, id: WorkspaceId) -> Result<Option<WorkspaceSummary>, StoreError> {
        if let Some(cached) = self.workspaces.get(&id) {
            return Ok(cached.clone());
        }
        let workspace = self.store.get_workspace(id).await?;
        self.workspaces.insert(id, workspace.clone());
        Ok(workspace)
    }

    async fn project(&mut self, id: ProjectId) -> Result<Option<ProjectSummary>, StoreError> {
        if let Some(cached) = self.projects.get(&id) {
            return Ok(cached.clone());
        }
        let project = self.store.get_project(id).await?;
        self.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn task(&mut self, id: TaskId) -> Result<Option<TaskSummary>, StoreError> {
        if let Some(cached) = self.tasks.get(&id) {
            return Ok(cached.clone());
        }
        let task = self.store.get_task(id).await?.map(|task| TaskSummary {
            id: task.id,
            name: task.name,
            status: task.status,
            due_date: task.due_date,
            project_id: task.project_id,
        });
        self.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn change_request(
        &mut self,
        id: ChangeRequestId,
    ) -> Result<Option<ChangeRequestDetail>, StoreError> {
        if let Some(cached) = self.requests.get(&id) {
            return Ok(cached.clone());
        }
        let detail = self.load_change_request(id).await?;
        self.requests.insert(id, detail.clone());
        Ok(detail)
    }

    async fn load_change_request(
        &mut self,
        id: ChangeRequestId,
    ) -> Result<Option<ChangeRequestDetail>, StoreError> {
        let Some(request) = self.store.get_change_request(id).await? else {
            return Ok(None);
        };
        let Some(task) = self.task(request.task_id).await? else {
            return Ok(None);
        };
        let Some(project) = self.project(task.project_id).await? else {
            return Ok(None);
        };
        let Some(workspace) = self.workspace(project.workspace_id).await? else {
            return Ok(None);
        };
        let Some(requester) = self.user(request.requester_id).await? else {
            return Ok(None);
        };
        let processor = match request.processor_id {
            Some(processor_id) => self.user(processor_id).await?,
            None => None,
        };
        Ok(Some(ChangeRequestDetail {
            request,
            task: TaskWithProject {
                task,
                project: ProjectWithWorkspace { project, workspace },
            },
            requester,
            processor,
        }))
    }
}
