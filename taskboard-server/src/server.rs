//! HTTP surface: shared state, routes, and JSON handlers.
//!
//! Handlers are thin. They extract the [`Principal`], path ids, and body,
//! call into [`crate::workflow`], and serialize the result. Errors render
//! through [`AppError`]'s `IntoResponse`.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use taskboard_proto::api::{
    AssignedTask, NotificationView, RoleResponse, SubmitResponse, SuccessResponse,
};
use taskboard_proto::change_request::SubmitChangeRequest;
use taskboard_proto::ids::{NotificationId, ProjectId, TaskId, WorkspaceId};
use taskboard_proto::notification::{NotificationUpdate, UnreadCounts};
use taskboard_proto::task::{Task, TaskPatch};

use crate::auth::Principal;
use crate::error::AppError;
use crate::store::Store;
use crate::workflow;

/// Shared server state. Handlers only read it; all mutable state lives in
/// the store.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database handle.
    pub store: Store,
}

impl AppState {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

/// Builds the router for every route of the service.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/workspaces/{workspace_id}/tasks/{task_id}/change-request",
            post(submit_change_request),
        )
        .route("/api/workspaces/{workspace_id}/tasks", get(assigned_tasks))
        .route("/api/workspaces/{workspace_id}/user-role", get(user_role))
        .route(
            "/api/workspaces/{workspace_id}/projects/{project_id}/tasks/{task_id}",
            patch(edit_task),
        )
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/counts", get(unread_counts))
        .route("/api/notifications/mark-all-as-read", post(mark_all_read))
        .route(
            "/api/notifications/{notification_id}",
            patch(update_notification).delete(delete_notification),
        )
        .with_state(state)
}

/// Starts the server on `addr` over `store`.
///
/// Returns the bound address (useful when binding to port 0) and the handle
/// of the serving task.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
    store: Store,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::new(store))).await
}

/// Starts the server with a pre-built [`AppState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "http server error");
        }
    });

    Ok((bound_addr, handle))
}

async fn submit_change_request(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path((workspace_id, task_id)): Path<(WorkspaceId, TaskId)>,
    Json(body): Json<SubmitChangeRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let change_request =
        workflow::submit_change_request(&state.store, &principal, workspace_id, task_id, body)
            .await?;
    Ok(Json(SubmitResponse {
        success: true,
        action: "requested".to_string(),
        change_request,
    }))
}

async fn assigned_tasks(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(workspace_id): Path<WorkspaceId>,
) -> Result<Json<Vec<AssignedTask>>, AppError> {
    let tasks = workflow::assigned_tasks(&state.store, &principal, workspace_id).await?;
    Ok(Json(tasks))
}

async fn user_role(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(workspace_id): Path<WorkspaceId>,
) -> Result<Json<RoleResponse>, AppError> {
    let role = workflow::user_role(&state.store, &principal, workspace_id).await?;
    Ok(Json(RoleResponse { role }))
}

async fn edit_task(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path((workspace_id, project_id, task_id)): Path<(WorkspaceId, ProjectId, TaskId)>,
    Json(body): Json<TaskPatch>,
) -> Result<Json<Task>, AppError> {
    let task = workflow::edit_task(
        &state.store,
        &principal,
        workspace_id,
        project_id,
        task_id,
        body,
    )
    .await?;
    Ok(Json(task))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<NotificationView>>, AppError> {
    let views = workflow::list_notifications(&state.store, &principal).await?;
    Ok(Json(views))
}

async fn unread_counts(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<UnreadCounts>, AppError> {
    let counts = workflow::unread_counts(&state.store, &principal).await?;
    Ok(Json(counts))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<SuccessResponse>, AppError> {
    workflow::mark_all_read(&state.store, &principal).await?;
    Ok(Json(SuccessResponse::OK))
}

async fn update_notification(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(notification_id): Path<NotificationId>,
    Json(body): Json<NotificationUpdate>,
) -> Result<Json<SuccessResponse>, AppError> {
    workflow::update_notification(&state.store, &principal, notification_id, body).await?;
    Ok(Json(SuccessResponse::OK))
}

async fn delete_notification(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(notification_id): Path<NotificationId>,
) -> Result<Json<SuccessResponse>, AppError> {
    workflow::delete_notification(&state.store, &principal, notification_id).await?;
    Ok(Json(SuccessResponse::OK))
}
