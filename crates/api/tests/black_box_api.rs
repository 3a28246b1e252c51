//! Black-box tests over the full HTTP surface.
//!
//! Each test boots the app on an ephemeral port, mints its own tokens, and
//! talks to it with a plain HTTP client. Projections are fed asynchronously
//! from the bus, so assertions that depend on a prior mutation poll the read
//! side until it catches up.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use bugtrail_auth::{Hs256TokenCodec, PrincipalId};

struct TestApp {
    base: String,
    client: Client,
    codec: Hs256TokenCodec,
}

impl TestApp {
    async fn spawn() -> Self {
        let secret = b"black-box-secret";
        let app = bugtrail_api::app::build_app(secret).await.unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            client: Client::new(),
            codec: Hs256TokenCodec::new(secret),
        }
    }

    fn token(&self, principal: PrincipalId, email: &str) -> String {
        self.codec
            .issue(principal, email, Utc::now(), chrono::Duration::minutes(30))
            .unwrap()
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn send(
        &self,
        method: reqwest::Method,
        token: &str,
        path: &str,
        body: Option<Value>,
    ) -> reqwest::Response {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.unwrap()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.send(reqwest::Method::POST, token, path, Some(body)).await
    }

    async fn patch(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.send(reqwest::Method::PATCH, token, path, Some(body)).await
    }

    async fn put(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.send(reqwest::Method::PUT, token, path, Some(body)).await
    }

    async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.send(reqwest::Method::DELETE, token, path, None).await
    }

    /// Poll a GET endpoint until the projection catches up.
    async fn get_json_until(
        &self,
        token: &str,
        path: &str,
        pred: impl Fn(&Value) -> bool,
    ) -> Value {
        for _ in 0..300 {
            let resp = self.get(token, path).await;
            if resp.status() == StatusCode::OK {
                let value: Value = resp.json().await.unwrap();
                if pred(&value) {
                    return value;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("read side never caught up for {path}");
    }

    /// Register a company and wait until the creator's seat resolves.
    async fn register_company(&self, name: &str) -> (PrincipalId, String) {
        let principal = PrincipalId::new();
        let token = self.token(principal, "founder@example.com");

        let resp = self
            .post(&token, "/companies", json!({ "name": name }))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        self.get_json_until(&token, "/whoami", |v| !v["membership"].is_null())
            .await;
        (principal, token)
    }

    /// Invite a fresh principal with `role` and wait for their seat.
    async fn seat(&self, admin_token: &str, role: &str) -> (String, String) {
        let principal = PrincipalId::new();
        let resp = self
            .post(
                admin_token,
                "/company/members",
                json!({ "principal_id": principal, "role": role }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.unwrap();
        let member_id = body["member_id"].as_str().unwrap().to_string();

        let token = self.token(principal, "member@example.com");
        self.get_json_until(&token, "/whoami", |v| v["membership"]["role"] == role)
            .await;
        (token, member_id)
    }

    async fn create_project(&self, token: &str, name: &str) -> String {
        let resp = self
            .post(token, "/projects", json!({ "name": name }))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.unwrap();
        let project_id = body["project_id"].as_str().unwrap().to_string();
        self.get_json_until(token, &format!("/projects/{project_id}"), |_| true)
            .await;
        project_id
    }

    async fn create_ticket(&self, token: &str, project_id: &str, title: &str) -> String {
        let resp = self
            .post(
                token,
                "/tickets",
                json!({
                    "project_id": project_id,
                    "title": title,
                    "kind": "defect",
                }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.unwrap();
        let ticket_id = body["ticket_id"].as_str().unwrap().to_string();
        self.get_json_until(token, &format!("/tickets/{ticket_id}"), |_| true)
            .await;
        ticket_id
    }
}

#[tokio::test]
async fn health_is_public_and_everything_else_requires_a_token() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(format!("{}/health", app.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.client.get(format!("{}/whoami", app.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.get("not-a-jwt", "/whoami").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    // Authenticated but unseated principals are NoMembership, not Forbidden.
    let principal = PrincipalId::new();
    let token = app.token(principal, "drifter@example.com");
    let resp = app.get(&token, "/projects").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "no_membership");
}

#[tokio::test]
async fn membership_is_exclusive_per_principal() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.register_company("Acme").await;

    // The founder cannot register a second company.
    let resp = app.post(&admin, "/companies", json!({ "name": "Second" })).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Inviting an already-seated principal conflicts too.
    let (dev_token, _) = app.seat(&admin, "developer").await;
    let whoami: Value = app.get(&dev_token, "/whoami").await.json().await.unwrap();
    let dev_principal = whoami["principal_id"].as_str().unwrap();
    let resp = app
        .post(
            &admin,
            "/company/members",
            json!({ "principal_id": dev_principal, "role": "submitter" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn roster_changes_take_effect_on_the_next_request() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.register_company("Acme").await;
    let (dev_token, dev_member) = app.seat(&admin, "developer").await;

    // Developers cannot create projects.
    let resp = app.post(&dev_token, "/projects", json!({ "name": "Core" })).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Promote to project manager; no re-login needed.
    let resp = app
        .patch(
            &admin,
            &format!("/company/members/{dev_member}"),
            json!({ "role": "project_manager" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    app.get_json_until(&dev_token, "/whoami", |v| {
        v["membership"]["role"] == "project_manager"
    })
    .await;

    let resp = app.post(&dev_token, "/projects", json!({ "name": "Core" })).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Same-role change is a clean no-op.
    let resp = app
        .patch(
            &admin,
            &format!("/company/members/{dev_member}"),
            json!({ "role": "project_manager" }),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["changed"], false);

    // Removal cuts access off at membership resolution.
    let resp = app.delete(&admin, &format!("/company/members/{dev_member}")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    app.get_json_until(&dev_token, "/whoami", |v| v["membership"].is_null())
        .await;
    let resp = app.get(&dev_token, "/projects").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "no_membership");
}

#[tokio::test]
async fn company_keeps_its_last_admin() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.register_company("Acme").await;
    let whoami: Value = app.get(&admin, "/whoami").await.json().await.unwrap();
    let admin_member = whoami["membership"]["member_id"].as_str().unwrap().to_string();

    let resp = app
        .patch(
            &admin,
            &format!("/company/members/{admin_member}"),
            json!({ "role": "developer" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app.delete(&admin, &format!("/company/members/{admin_member}")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn ticket_scope_is_two_tier() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.register_company("Acme").await;
    let (pm_token, pm_member) = app.seat(&admin, "project_manager").await;
    let (dev_token, dev_member) = app.seat(&admin, "developer").await;
    let (sub_token, _) = app.seat(&admin, "submitter").await;

    let managed = app.create_project(&admin, "Managed").await;
    let resp = app
        .put(
            &admin,
            &format!("/projects/{managed}/manager"),
            json!({ "member_id": pm_member }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    app.get_json_until(&admin, &format!("/projects/{managed}"), |v| {
        v["manager_id"] == pm_member.as_str()
    })
    .await;

    let unmanaged = app.create_project(&admin, "Unmanaged").await;

    let t1 = app.create_ticket(&sub_token, &managed, "Crash on save").await;
    let t2 = app.create_ticket(&admin, &unmanaged, "Slow search").await;

    // Role gate: developers cannot open tickets at all.
    let resp = app
        .post(
            &dev_token,
            "/tickets",
            json!({ "project_id": managed, "title": "x", "kind": "defect" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Scope gate: an unassigned developer cannot move a ticket.
    let resp = app
        .put(&dev_token, &format!("/tickets/{t1}/status"), json!({ "status": "testing" }))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "not_accessible");

    // Once assigned, the same developer may.
    let resp = app
        .put(
            &admin,
            &format!("/tickets/{t1}/assignee"),
            json!({ "assignee_id": dev_member }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    app.get_json_until(&dev_token, &format!("/tickets/{t1}"), |v| {
        v["assignee_id"] == dev_member.as_str()
    })
    .await;
    let resp = app
        .put(
            &dev_token,
            &format!("/tickets/{t1}/status"),
            json!({ "status": "in_development" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Managers reach tickets on their own projects, and only those.
    let resp = app
        .put(&pm_token, &format!("/tickets/{t1}/priority"), json!({ "priority": "urgent" }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app
        .put(&pm_token, &format!("/tickets/{t2}/priority"), json!({ "priority": "urgent" }))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Listings apply the same visibility.
    let visible: Value = app.get(&sub_token, "/tickets").await.json().await.unwrap();
    let titles: Vec<_> = visible
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Crash on save".to_string()]);
}

#[tokio::test]
async fn archive_blocks_general_mutations_but_not_detail_edits() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.register_company("Acme").await;
    let project = app.create_project(&admin, "Core").await;
    let ticket = app.create_ticket(&admin, &project, "Flaky import").await;

    // Archiving is idempotent, reported through `changed`.
    let resp = app.post(&admin, &format!("/projects/{project}/archive"), json!({})).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["changed"], true);
    app.get_json_until(&admin, &format!("/projects/{project}"), |v| v["archived"] == true)
        .await;
    let resp = app.post(&admin, &format!("/projects/{project}/archive"), json!({})).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["changed"], false);

    // No new tickets under an archived project.
    let resp = app
        .post(
            &admin,
            "/tickets",
            json!({ "project_id": project, "title": "late", "kind": "defect" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_state");

    // Name edits still pass; anything more is rejected wholesale.
    let resp = app
        .patch(&admin, &format!("/projects/{project}"), json!({ "name": "Core (frozen)" }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app
        .patch(
            &admin,
            &format!("/projects/{project}"),
            json!({ "name": "Core v2", "priority": "high" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Unarchive restores the full surface.
    let resp = app.post(&admin, &format!("/projects/{project}/unarchive"), json!({})).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["changed"], true);
    app.get_json_until(&admin, &format!("/projects/{project}"), |v| v["archived"] == false)
        .await;
    let resp = app
        .post(
            &admin,
            "/tickets",
            json!({ "project_id": project, "title": "back", "kind": "feature" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Same contract on tickets, including comments.
    let resp = app.post(&admin, &format!("/tickets/{ticket}/archive"), json!({})).await;
    assert_eq!(resp.status(), StatusCode::OK);
    app.get_json_until(&admin, &format!("/tickets/{ticket}"), |v| v["archived"] == true)
        .await;
    let resp = app
        .put(&admin, &format!("/tickets/{ticket}/status"), json!({ "status": "resolved" }))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let resp = app
        .post(&admin, &format!("/tickets/{ticket}/comments"), json!({ "message": "hi" }))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let resp = app
        .patch(&admin, &format!("/tickets/{ticket}"), json!({ "title": "Flaky import (old)" }))
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["changed"], true);

    // Deletion is frozen with the rest; unarchiving restores it.
    let resp = app.delete(&admin, &format!("/tickets/{ticket}")).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let resp = app.post(&admin, &format!("/tickets/{ticket}/unarchive"), json!({})).await;
    assert_eq!(resp.status(), StatusCode::OK);
    app.get_json_until(&admin, &format!("/tickets/{ticket}"), |v| v["archived"] == false)
        .await;
    let resp = app.delete(&admin, &format!("/tickets/{ticket}")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn foreign_and_missing_resources_read_identically() {
    let app = TestApp::spawn().await;
    let (_, admin_a) = app.register_company("Acme").await;
    let (_, admin_b) = app.register_company("Globex").await;
    let (dev_a, _) = app.seat(&admin_a, "developer").await;

    let project = app.create_project(&admin_a, "Core").await;
    let ticket = app.create_ticket(&admin_a, &project, "Crash on save").await;

    // Another company's admin probing the ticket.
    let foreign = app.get(&admin_b, &format!("/tickets/{ticket}")).await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    let foreign_body: Value = foreign.json().await.unwrap();

    // A nonexistent ticket id.
    let missing = app
        .get(&admin_a, &format!("/tickets/{}", uuid::Uuid::now_v7()))
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let missing_body: Value = missing.json().await.unwrap();
    assert_eq!(foreign_body, missing_body);

    // A same-company member outside the ticket's scope gets the same body.
    let scoped = app.get(&dev_a, &format!("/tickets/{ticket}")).await;
    assert_eq!(scoped.status(), StatusCode::FORBIDDEN);
    let scoped_body: Value = scoped.json().await.unwrap();
    assert_eq!(scoped_body, missing_body);
}

#[tokio::test]
async fn comments_bind_ownership_and_feed_the_audit_trail() {
    let app = TestApp::spawn().await;
    let (_, admin) = app.register_company("Acme").await;
    let (sub_token, _) = app.seat(&admin, "submitter").await;

    let project = app.create_project(&admin, "Core").await;
    let ticket = app.create_ticket(&sub_token, &project, "Crash on save").await;

    let resp = app
        .post(&sub_token, &format!("/tickets/{ticket}/comments"), json!({ "message": "repro attached" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let comment_id = body["comment_id"].as_str().unwrap().to_string();
    app.get_json_until(&sub_token, &format!("/tickets/{ticket}/comments"), |v| {
        v.as_array().is_some_and(|c| c.len() == 1)
    })
    .await;

    // Admins cannot touch another member's comment.
    let resp = app
        .patch(
            &admin,
            &format!("/tickets/{ticket}/comments/{comment_id}"),
            json!({ "message": "edited by admin" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "not_accessible");
    let resp = app
        .delete(&admin, &format!("/tickets/{ticket}/comments/{comment_id}"))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The sender can.
    let resp = app
        .patch(
            &sub_token,
            &format!("/tickets/{ticket}/comments/{comment_id}"),
            json!({ "message": "repro attached (updated)" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app
        .delete(&sub_token, &format!("/tickets/{ticket}/comments/{comment_id}"))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Every mutation, including the deletion, stays on the history.
    let history = app
        .get_json_until(&sub_token, &format!("/tickets/{ticket}/history"), |v| {
            v.as_array().is_some_and(|h| h.len() == 4)
        })
        .await;
    let kinds: Vec<_> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        kinds,
        vec!["opened", "comment_added", "comment_edited", "comment_deleted"]
    );
}
