//! Request-scoped operations behind the HTTP routes.
//!
//! Every operation takes the [`Store`](crate::store::Store) and the calling
//! [`Principal`](crate::auth::Principal) explicitly. Lookups and permission
//! checks run on pooled connections first; the writes of one operation then
//! run in a single [`StoreTxn`](crate::store::StoreTxn).

pub mod fanout;
pub mod inbox;
pub mod resolve;
pub mod submit;
pub mod tasks;

use taskboard_proto::ids::WorkspaceId;
use taskboard_proto::role::Role;

use crate::auth::Principal;
use crate::error::AppError;
use crate::store::Store;

pub use inbox::{delete_notification, list_notifications, mark_all_read, unread_counts};
pub use resolve::update_notification;
pub use submit::submit_change_request;
pub use tasks::{assigned_tasks, edit_task, user_role};

/// Role of the caller in a workspace, or [`AppError::Forbidden`] for
/// outsiders.
async fn require_role(
    store: &Store,
    workspace_id: WorkspaceId,
    principal: &Principal,
) -> Result<Role, AppError> {
    if let Some(role) = store.role_of(workspace_id, principal.id).await? {
        return Ok(role);
    }
    tracing::warn!(
        user_id = %principal.id,
        workspace_id = %workspace_id,
        "caller is not a member of the workspace"
    );
    Err(AppError::Forbidden(
        "Not a member of this workspace".to_string(),
    ))
}
