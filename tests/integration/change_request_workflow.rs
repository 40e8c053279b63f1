//! Integration tests for the change-request workflow.
//!
//! Drives submission, approval, rejection, and the inbox directly through
//! the workflow API against an in-memory store.
//!
//! Verification command: `cargo test --test change_request_workflow`

use chrono::{TimeZone, Utc};
use taskboard_proto::change_request::{ChangeRequestStatus, Decision, SubmitChangeRequest};
use taskboard_proto::ids::{NotificationId, TaskId};
use taskboard_proto::notification::{Notification, NotificationUpdate};
use taskboard_proto::role::{MemberRole, Role};
use taskboard_proto::patch::Patch;
use taskboard_proto::task::{TaskPatch, TaskStatus};
use taskboard_server::auth::Principal;
use taskboard_server::error::AppError;
use taskboard_server::store::{NewTask, Store};
use taskboard_server::workflow::{self, resolve::resolve_change_request};

// =============================================================================
// Fixture
// =============================================================================

/// Workspace "Acme" owned by O with admin M and member U, and task T in
/// project "Launch" assigned to U with status "Todo".
struct World {
    store: Store,
    owner: Principal,
    admin: Principal,
    member: Principal,
    workspace_id: taskboard_proto::ids::WorkspaceId,
    project_id: taskboard_proto::ids::ProjectId,
    task_id: TaskId,
}

async fn world() -> World {
    let store = Store::open_in_memory().await.unwrap();
    let owner = store.create_user(Some("Olga"), "olga").await.unwrap();
    let admin = store.create_user(Some("Marek"), "marek").await.unwrap();
    let member = store.create_user(None, "ursula").await.unwrap();
    let workspace = store.create_workspace("Acme", owner.id).await.unwrap();
    store
        .add_member(workspace.id, admin.id, MemberRole::Admin)
        .await
        .unwrap();
    store
        .add_member(workspace.id, member.id, MemberRole::Member)
        .await
        .unwrap();
    let project = store.create_project(workspace.id, "Launch").await.unwrap();
    let task = store
        .create_task(NewTask {
            project_id: project.id,
            name: "Write docs".to_string(),
            description: None,
            status: TaskStatus::Todo,
            due_date: None,
            assignee_ids: vec![member.id],
        })
        .await
        .unwrap();
    World {
        store,
        owner: owner.into(),
        admin: admin.into(),
        member: member.into(),
        workspace_id: workspace.id,
        project_id: project.id,
        task_id: task.id,
    }
}

impl World {
    async fn submit(&self, proposal: SubmitChangeRequest) -> taskboard_proto::change_request::ChangeRequest {
        workflow::submit_change_request(
            &self.store,
            &self.member,
            self.workspace_id,
            self.task_id,
            proposal,
        )
        .await
        .unwrap()
    }

    async fn inbox(&self, who: &Principal) -> Vec<Notification> {
        self.store.notifications_for(who.id).await.unwrap()
    }

    /// The notification `who` received for the latest request.
    async fn request_notification(&self, who: &Principal) -> Notification {
        self.inbox(who)
            .await
            .into_iter()
            .find(|n| n.change_request_id.is_some())
            .unwrap()
    }

    async fn decide(&self, who: &Principal, decision: Decision) -> Result<(), AppError> {
        let notification = self.request_notification(who).await;
        workflow::update_notification(
            &self.store,
            who,
            notification.id,
            NotificationUpdate {
                is_read: None,
                change_request_status: Some(decision),
            },
        )
        .await
    }

    async fn displayed_status(&self) -> TaskStatus {
        let tasks = workflow::assigned_tasks(&self.store, &self.member, self.workspace_id)
            .await
            .unwrap();
        tasks
            .into_iter()
            .find(|t| t.id == self.task_id)
            .unwrap()
            .status
    }

    async fn stored_status(&self) -> TaskStatus {
        self.store.get_task(self.task_id).await.unwrap().unwrap().status
    }
}

fn proposing(status: TaskStatus) -> SubmitChangeRequest {
    SubmitChangeRequest {
        new_status: Some(status),
        new_due_date: None,
        reason: Some("finished early".to_string()),
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn submission_notifies_owner_and_admin_and_shows_in_review() {
    let w = world().await;
    let request = w.submit(proposing(TaskStatus::Done)).await;

    assert_eq!(request.original_status, TaskStatus::Todo);
    assert_eq!(request.new_status, Some(TaskStatus::Done));
    assert_eq!(request.status, ChangeRequestStatus::Pending);

    let notified = w.store.notifications_for_request(request.id).await.unwrap();
    let mut recipients: Vec<_> = notified.iter().map(|n| n.user_id).collect();
    recipients.sort_unstable();
    let mut expected = vec![w.owner.id, w.admin.id];
    expected.sort_unstable();
    assert_eq!(recipients, expected);
    assert!(w.inbox(&w.member).await.is_empty());

    let n = &notified[0];
    assert_eq!(
        n.message,
        "User ursula requested a change for task \"Write docs\" in project \"Launch\""
    );
    assert_eq!(
        n.link.as_deref(),
        Some(format!("/dashboard/workspaces/{}/notifications", w.workspace_id).as_str())
    );
    assert_eq!(n.actor_id, Some(w.member.id));
    assert_eq!(n.task_id, Some(w.task_id));
    assert!(!n.is_read);

    assert_eq!(w.displayed_status().await, TaskStatus::InReview);
    assert_eq!(w.stored_status().await, TaskStatus::Todo);
}

#[tokio::test]
async fn owner_approval_applies_status_and_notifies_requester() {
    let w = world().await;
    let request = w.submit(proposing(TaskStatus::Done)).await;
    let acting = w.request_notification(&w.owner).await;

    w.decide(&w.owner, Decision::Approved).await.unwrap();

    assert_eq!(w.stored_status().await, TaskStatus::Done);
    assert_eq!(w.displayed_status().await, TaskStatus::Done);

    let stored = w.store.get_change_request(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ChangeRequestStatus::Approved);
    assert_eq!(stored.processor_id, Some(w.owner.id));

    let for_requester = w.inbox(&w.member).await;
    assert_eq!(for_requester.len(), 1);
    assert_eq!(
        for_requester[0].message,
        "Your change request for task \"Write docs\" has been approved by Olga."
    );
    assert_eq!(
        for_requester[0].link.as_deref(),
        Some(format!("/dashboard/workspaces/{}/tasks", w.workspace_id).as_str())
    );
    assert_eq!(for_requester[0].change_request_id, None);

    for n in w.store.notifications_for_request(request.id).await.unwrap() {
        assert_eq!(n.message, "Request for task \"Write docs\" was approved by Olga.");
    }
    let acting = w.store.get_notification(acting.id).await.unwrap().unwrap();
    assert!(acting.is_read);
    assert!(!w.request_notification(&w.admin).await.is_read);
}

#[tokio::test]
async fn admin_rejection_restores_original_status() {
    let w = world().await;
    let request = w.submit(proposing(TaskStatus::Done)).await;

    w.decide(&w.admin, Decision::Rejected).await.unwrap();

    assert_eq!(w.stored_status().await, TaskStatus::Todo);
    assert_eq!(w.displayed_status().await, TaskStatus::Todo);
    let stored = w.store.get_change_request(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ChangeRequestStatus::Rejected);
    assert_eq!(stored.processor_id, Some(w.admin.id));
    assert_eq!(
        w.inbox(&w.member).await[0].message,
        "Your change request for task \"Write docs\" has been rejected by Marek."
    );
}

#[tokio::test]
async fn requester_cannot_resolve_own_request() {
    let w = world().await;
    let request = w.submit(proposing(TaskStatus::Done)).await;
    let owners_copy = w.request_notification(&w.owner).await;

    // Someone else's notification is invisible to the requester.
    let via_patch = workflow::update_notification(
        &w.store,
        &w.member,
        owners_copy.id,
        NotificationUpdate {
            is_read: None,
            change_request_status: Some(Decision::Approved),
        },
    )
    .await;
    assert!(matches!(via_patch, Err(AppError::NotFound(_))));

    let direct = resolve_change_request(&w.store, &w.member, &owners_copy, Decision::Approved).await;
    assert!(matches!(direct, Err(AppError::Forbidden(_))));

    let stored = w.store.get_change_request(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ChangeRequestStatus::Pending);
    assert_eq!(w.stored_status().await, TaskStatus::Todo);
    assert!(w.inbox(&w.member).await.is_empty());
}

#[tokio::test]
async fn approving_due_date_only_keeps_status() {
    let w = world().await;
    let due = Utc.with_ymd_and_hms(2026, 11, 30, 17, 0, 0).unwrap();
    w.submit(SubmitChangeRequest {
        new_status: None,
        new_due_date: Some(due),
        reason: None,
    })
    .await;

    w.decide(&w.owner, Decision::Approved).await.unwrap();

    let task = w.store.get_task(w.task_id).await.unwrap().unwrap();
    assert_eq!(task.due_date, Some(due));
    assert_eq!(task.status, TaskStatus::Todo);
}

// =============================================================================
// Invariants
// =============================================================================

#[tokio::test]
async fn second_resolution_is_rejected_without_side_effects() {
    let w = world().await;
    w.submit(proposing(TaskStatus::Done)).await;
    w.decide(&w.owner, Decision::Approved).await.unwrap();

    let second = w.decide(&w.admin, Decision::Rejected).await;
    assert!(matches!(second, Err(AppError::InvalidState(_))));

    let again = w.decide(&w.owner, Decision::Rejected).await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));

    assert_eq!(w.stored_status().await, TaskStatus::Done);
    assert_eq!(w.inbox(&w.member).await.len(), 1);
    assert!(!w.request_notification(&w.admin).await.is_read);
}

#[tokio::test]
async fn member_approver_is_forbidden() {
    let w = world().await;
    let second_member: Principal = w.store.create_user(None, "vera").await.unwrap().into();
    w.store
        .add_member(w.workspace_id, second_member.id, MemberRole::Member)
        .await
        .unwrap();
    w.submit(proposing(TaskStatus::Done)).await;
    let owners_copy = w.request_notification(&w.owner).await;

    let result =
        resolve_change_request(&w.store, &second_member, &owners_copy, Decision::Approved).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(w.stored_status().await, TaskStatus::Todo);
}

#[tokio::test]
async fn admin_requester_is_left_out_of_fanout() {
    let w = world().await;
    let request = workflow::submit_change_request(
        &w.store,
        &w.admin,
        w.workspace_id,
        w.task_id,
        proposing(TaskStatus::InProgress),
    )
    .await
    .unwrap();

    let notified = w.store.notifications_for_request(request.id).await.unwrap();
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0].user_id, w.owner.id);
    assert_eq!(
        notified[0].message,
        "User Marek requested a change for task \"Write docs\" in project \"Launch\""
    );
}

#[tokio::test]
async fn submission_checks_workspace_and_membership() {
    let w = world().await;
    let outsider: Principal = w.store.create_user(None, "eve").await.unwrap().into();

    let forbidden = workflow::submit_change_request(
        &w.store,
        &outsider,
        w.workspace_id,
        w.task_id,
        proposing(TaskStatus::Done),
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    let other_ws = w.store.create_workspace("Other", w.owner.id).await.unwrap();
    let wrong_ws = workflow::submit_change_request(
        &w.store,
        &w.member,
        other_ws.id,
        w.task_id,
        proposing(TaskStatus::Done),
    )
    .await;
    assert!(matches!(wrong_ws, Err(AppError::NotFound(_))));

    let missing = workflow::submit_change_request(
        &w.store,
        &w.member,
        w.workspace_id,
        TaskId::new(),
        proposing(TaskStatus::Done),
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    assert!(w.inbox(&w.owner).await.is_empty());
}

#[tokio::test]
async fn notification_without_request_cannot_be_decided() {
    let w = world().await;
    w.submit(proposing(TaskStatus::Done)).await;
    w.decide(&w.owner, Decision::Approved).await.unwrap();

    let outcome = w.inbox(&w.member).await.remove(0);
    let result = workflow::update_notification(
        &w.store,
        &w.member,
        outcome.id,
        NotificationUpdate {
            is_read: None,
            change_request_status: Some(Decision::Approved),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));
}

// =============================================================================
// Inbox and direct edits
// =============================================================================

#[tokio::test]
async fn inbox_lists_detail_counts_and_clears() {
    let w = world().await;
    let request = w.submit(proposing(TaskStatus::Done)).await;

    let views = workflow::list_notifications(&w.store, &w.owner).await.unwrap();
    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert_eq!(view.workspace.as_ref().unwrap().name, "Acme");
    assert_eq!(view.project.as_ref().unwrap().name, "Launch");
    assert_eq!(view.actor.as_ref().unwrap().username, "ursula");
    let detail = view.change_request.as_ref().unwrap();
    assert_eq!(detail.request.id, request.id);
    assert_eq!(detail.task.project.workspace.id, w.workspace_id);
    assert_eq!(detail.requester.id, w.member.id);
    assert!(detail.processor.is_none());

    let counts = workflow::unread_counts(&w.store, &w.owner).await.unwrap();
    assert_eq!(counts.total, 1);
    assert_eq!(counts.workspaces[&w.workspace_id.to_string()], 1);
    assert_eq!(
        counts.projects[&w.workspace_id.to_string()][&w.project_id.to_string()],
        1
    );

    assert_eq!(workflow::mark_all_read(&w.store, &w.owner).await.unwrap(), 1);
    let counts = workflow::unread_counts(&w.store, &w.owner).await.unwrap();
    assert_eq!(counts.total, 0);

    let id = view.notification.id;
    workflow::update_notification(
        &w.store,
        &w.owner,
        id,
        NotificationUpdate {
            is_read: Some(false),
            change_request_status: None,
        },
    )
    .await
    .unwrap();
    assert!(!w.store.get_notification(id).await.unwrap().unwrap().is_read);

    let not_yours = workflow::delete_notification(&w.store, &w.admin, id).await;
    assert!(matches!(not_yours, Err(AppError::NotFound(_))));
    workflow::delete_notification(&w.store, &w.owner, id).await.unwrap();
    let gone = workflow::delete_notification(&w.store, &w.owner, NotificationId::new()).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
    assert!(w.inbox(&w.owner).await.is_empty());
}

#[tokio::test]
async fn user_role_resolves_hierarchy() {
    let w = world().await;
    assert_eq!(
        workflow::user_role(&w.store, &w.owner, w.workspace_id).await.unwrap(),
        Role::Owner
    );
    assert_eq!(
        workflow::user_role(&w.store, &w.admin, w.workspace_id).await.unwrap(),
        Role::Admin
    );
    assert_eq!(
        workflow::user_role(&w.store, &w.member, w.workspace_id).await.unwrap(),
        Role::Member
    );
}

#[tokio::test]
async fn direct_edit_by_admin_and_refusals() {
    let w = world().await;
    let due = Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap();
    let patch = TaskPatch {
        name: Some("  Write more docs ".to_string()),
        description: Patch::Set("all modules".to_string()),
        status: Some(TaskStatus::InProgress),
        due_date: Patch::Set(due),
        assignee_ids: Some(vec![w.member.id, w.admin.id]),
    };
    let task = workflow::edit_task(
        &w.store,
        &w.admin,
        w.workspace_id,
        w.project_id,
        w.task_id,
        patch,
    )
    .await
    .unwrap();
    assert_eq!(task.name, "Write more docs");
    assert_eq!(task.status, TaskStatus::InProgress);

    let stored = w.store.get_task(w.task_id).await.unwrap().unwrap();
    assert_eq!(stored.description.as_deref(), Some("all modules"));
    assert_eq!(stored.due_date, Some(due));
    assert_eq!(stored.assignee_ids.len(), 2);

    let clear = TaskPatch {
        due_date: Patch::Clear,
        ..TaskPatch::default()
    };
    workflow::edit_task(&w.store, &w.owner, w.workspace_id, w.project_id, w.task_id, clear)
        .await
        .unwrap();
    let stored = w.store.get_task(w.task_id).await.unwrap().unwrap();
    assert_eq!(stored.due_date, None);
    assert_eq!(stored.description.as_deref(), Some("all modules"));

    let by_member = workflow::edit_task(
        &w.store,
        &w.member,
        w.workspace_id,
        w.project_id,
        w.task_id,
        TaskPatch {
            status: Some(TaskStatus::Done),
            ..TaskPatch::default()
        },
    )
    .await;
    assert!(matches!(by_member, Err(AppError::Forbidden(_))));

    let into_review = workflow::edit_task(
        &w.store,
        &w.owner,
        w.workspace_id,
        w.project_id,
        w.task_id,
        TaskPatch {
            status: Some(TaskStatus::InReview),
            ..TaskPatch::default()
        },
    )
    .await;
    assert!(matches!(into_review, Err(AppError::Validation(_))));

    let empty = workflow::edit_task(
        &w.store,
        &w.owner,
        w.workspace_id,
        w.project_id,
        w.task_id,
        TaskPatch::default(),
    )
    .await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    let other_project = w.store.create_project(w.workspace_id, "Other").await.unwrap();
    let wrong_project = workflow::edit_task(
        &w.store,
        &w.owner,
        w.workspace_id,
        other_project.id,
        w.task_id,
        TaskPatch {
            status: Some(TaskStatus::Done),
            ..TaskPatch::default()
        },
    )
    .await;
    assert!(matches!(wrong_project, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn rejection_overrides_direct_edit_made_while_pending() {
    let w = world().await;
    w.submit(proposing(TaskStatus::Done)).await;
    workflow::edit_task(
        &w.store,
        &w.owner,
        w.workspace_id,
        w.project_id,
        w.task_id,
        TaskPatch {
            status: Some(TaskStatus::InProgress),
            ..TaskPatch::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(w.displayed_status().await, TaskStatus::InReview);

    w.decide(&w.owner, Decision::Rejected).await.unwrap();
    assert_eq!(w.stored_status().await, TaskStatus::Todo);
}
