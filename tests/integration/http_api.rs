//! Integration tests for the JSON HTTP surface.
//!
//! Starts the server on an OS-assigned port over an in-memory store and
//! drives the change-request lifecycle with `reqwest`.
//!
//! Verification command: `cargo test --test http_api`

use reqwest::StatusCode;
use serde_json::{Value, json};
use taskboard_proto::api::{ErrorBody, SubmitResponse, SuccessResponse, UserSummary};
use taskboard_proto::ids::{ProjectId, TaskId, WorkspaceId};
use taskboard_proto::notification::UnreadCounts;
use taskboard_proto::role::MemberRole;
use taskboard_proto::task::TaskStatus;
use taskboard_server::auth::USER_ID_HEADER;
use taskboard_server::server::start_server;
use taskboard_server::store::{NewTask, Store};

// =============================================================================
// Helpers
// =============================================================================

struct Api {
    base: String,
    client: reqwest::Client,
    store: Store,
    owner: UserSummary,
    admin: UserSummary,
    member: UserSummary,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
    task_id: TaskId,
}

async fn start() -> Api {
    let store = Store::open_in_memory().await.unwrap();
    let owner = store.create_user(Some("Olga"), "olga").await.unwrap();
    let admin = store.create_user(None, "marek").await.unwrap();
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

    let (addr, _handle) = start_server("127.0.0.1:0", store.clone())
        .await
        .expect("failed to start test server");

    Api {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        store,
        owner,
        admin,
        member,
        workspace_id: workspace.id,
        project_id: project.id,
        task_id: task.id,
    }
}

impl Api {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn get(&self, user: &UserSummary, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header(USER_ID_HEADER, user.id.to_string())
    }

    fn post(&self, user: &UserSummary, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header(USER_ID_HEADER, user.id.to_string())
    }

    fn patch(&self, user: &UserSummary, path: &str) -> reqwest::RequestBuilder {
        self.client
            .patch(self.url(path))
            .header(USER_ID_HEADER, user.id.to_string())
    }

    fn delete(&self, user: &UserSummary, path: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .header(USER_ID_HEADER, user.id.to_string())
    }

    fn change_request_path(&self) -> String {
        format!(
            "/api/workspaces/{}/tasks/{}/change-request",
            self.workspace_id, self.task_id
        )
    }

    fn tasks_path(&self) -> String {
        format!("/api/workspaces/{}/tasks", self.workspace_id)
    }

    async fn submit(&self, body: Value) -> SubmitResponse {
        let response = self
            .post(&self.member, &self.change_request_path())
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }

    async fn notifications(&self, user: &UserSummary) -> Vec<Value> {
        let response = self.get(user, "/api/notifications").send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }

    async fn my_task_status(&self) -> String {
        let tasks: Vec<Value> = self
            .get(&self.member, &self.tasks_path())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        tasks[0]["status"].as_str().unwrap().to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn requests_without_known_identity_are_401() {
    let api = start().await;

    let missing = api
        .client
        .get(api.url("/api/notifications"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let unknown = api
        .client
        .post(api.url(&api.change_request_path()))
        .header(USER_ID_HEADER, TaskId::new().to_string())
        .json(&json!({ "newStatus": "Done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = unknown.json().await.unwrap();
    assert_eq!(body.error, "Not authenticated");
}

#[tokio::test]
async fn full_approval_lifecycle_over_http() {
    let api = start().await;

    let submitted = api
        .submit(json!({ "newStatus": "Done", "reason": "shipped" }))
        .await;
    assert!(submitted.success);
    assert_eq!(submitted.action, "requested");
    assert_eq!(submitted.change_request.original_status, TaskStatus::Todo);
    assert_eq!(api.my_task_status().await, "In Review");

    let owner_inbox = api.notifications(&api.owner).await;
    assert_eq!(owner_inbox.len(), 1);
    let entry = &owner_inbox[0];
    assert_eq!(entry["isRead"], false);
    assert_eq!(entry["workspace"]["name"], "Acme");
    assert_eq!(entry["changeRequest"]["status"], "PENDING");
    assert_eq!(entry["changeRequest"]["requester"]["username"], "ursula");
    assert_eq!(
        entry["changeRequest"]["task"]["project"]["workspace"]["id"],
        api.workspace_id.to_string()
    );

    let counts: UnreadCounts = api
        .get(&api.owner, "/api/notifications/counts")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(counts.total, 1);

    let notification_id = entry["id"].as_str().unwrap().to_string();
    let approve = api
        .patch(&api.owner, &format!("/api/notifications/{notification_id}"))
        .json(&json!({ "changeRequestStatus": "APPROVED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(approve.status(), StatusCode::OK);
    let ack: SuccessResponse = approve.json().await.unwrap();
    assert!(ack.success);

    assert_eq!(api.my_task_status().await, "Done");
    let member_inbox = api.notifications(&api.member).await;
    assert_eq!(member_inbox.len(), 1);
    assert_eq!(
        member_inbox[0]["message"],
        "Your change request for task \"Write docs\" has been approved by Olga."
    );
    assert_eq!(member_inbox[0]["actor"]["username"], "olga");

    let again = api
        .patch(&api.owner, &format!("/api/notifications/{notification_id}"))
        .json(&json!({ "decision": "REJECTED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(api.my_task_status().await, "Done");
    assert_eq!(api.notifications(&api.member).await.len(), 1);
}

#[tokio::test]
async fn rejection_and_self_resolution_over_http() {
    let api = start().await;
    api.submit(json!({ "newStatus": "In Progress" })).await;

    let admin_inbox = api.notifications(&api.admin).await;
    let notification_id = admin_inbox[0]["id"].as_str().unwrap().to_string();
    let path = format!("/api/notifications/{notification_id}");

    let by_requester = api
        .patch(&api.member, &path)
        .json(&json!({ "changeRequestStatus": "APPROVED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(by_requester.status(), StatusCode::NOT_FOUND);

    let reject = api
        .patch(&api.admin, &path)
        .json(&json!({ "changeRequestStatus": "REJECTED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(reject.status(), StatusCode::OK);
    assert_eq!(api.my_task_status().await, "Todo");

    let owner_inbox = api.notifications(&api.owner).await;
    assert_eq!(
        owner_inbox[0]["message"],
        "Request for task \"Write docs\" was rejected by marek."
    );
}

#[tokio::test]
async fn invalid_status_in_submission_is_rejected() {
    let api = start().await;
    let response = api
        .post(&api.member, &api.change_request_path())
        .json(&json!({ "newStatus": "Shipped" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert!(
        api.store
            .pending_change_requests(api.task_id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn mark_all_read_and_delete() {
    let api = start().await;
    api.submit(json!({ "newDueDate": "2026-12-01T09:00:00Z" }))
        .await;

    let done = api
        .post(&api.owner, "/api/notifications/mark-all-as-read")
        .send()
        .await
        .unwrap();
    assert_eq!(done.status(), StatusCode::OK);
    let counts: UnreadCounts = api
        .get(&api.owner, "/api/notifications/counts")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(counts.total, 0);

    let inbox = api.notifications(&api.owner).await;
    let path = format!("/api/notifications/{}", inbox[0]["id"].as_str().unwrap());

    let foreign = api.delete(&api.admin, &path).send().await.unwrap();
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    let deleted = api.delete(&api.owner, &path).send().await.unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert!(api.notifications(&api.owner).await.is_empty());
}

#[tokio::test]
async fn direct_task_edit_over_http() {
    let api = start().await;
    let path = format!(
        "/api/workspaces/{}/projects/{}/tasks/{}",
        api.workspace_id, api.project_id, api.task_id
    );

    let edited = api
        .patch(&api.owner, &path)
        .json(&json!({ "status": "In Progress", "description": "draft", "dueDate": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(edited.status(), StatusCode::OK);
    let task: Value = edited.json().await.unwrap();
    assert_eq!(task["status"], "In Progress");
    assert_eq!(task["description"], "draft");

    let by_member = api
        .patch(&api.member, &path)
        .json(&json!({ "status": "Done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(by_member.status(), StatusCode::FORBIDDEN);

    let empty = api
        .patch(&api.owner, &path)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = empty.json().await.unwrap();
    assert_eq!(body.error, "no update data provided");

    let review = api
        .patch(&api.owner, &path)
        .json(&json!({ "status": "In Review" }))
        .send()
        .await
        .unwrap();
    assert_eq!(review.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_role_endpoint() {
    let api = start().await;
    let path = format!("/api/workspaces/{}/user-role", api.workspace_id);
    let role: Value = api
        .get(&api.admin, &path)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(role, json!({ "role": "admin" }));
}
