//! Integration tests for the HTTP API.
//!
//! Drives the real router through axum-test's in-memory transport.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::{Value, json};
use stce::api::{AppState, RouterOptions, router};
use stce_core::{Hasher, PasswordCost, TokenSigner, memory_store};
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct Harness {
    server: TestServer,
    state: AppState,
    _uploads: TempDir,
}

fn harness_with(options: RouterOptions) -> Harness {
    let uploads = tempfile::tempdir().unwrap();
    let state = AppState::new(
        Arc::new(memory_store().unwrap()),
        Hasher::new(PasswordCost::Minimal).unwrap(),
        TokenSigner::new(b"api-test-secret", 3600),
        uploads.path(),
    );
    let server = TestServer::new(router(state.clone(), options)).unwrap();
    Harness {
        server,
        state,
        _uploads: uploads,
    }
}

fn harness() -> Harness {
    harness_with(RouterOptions {
        auth_rate_per_sec: 1000,
        ..RouterOptions::default()
    })
}

fn register_body(username: &str) -> Value {
    json!({
        "username": username,
        "password": "password123",
        "name": format!("{username} name"),
        "student_number": format!("S-{username}"),
        "phone_number": "010-0000-0000",
        "email": format!("{username}@example.com"),
        "major": "Computer Science",
        "join_year": 2023,
        "birth_date": "2001-02-03",
        "gender": "Female",
        "education_status": "Enrolled"
    })
}

/// Register `username` and return `(id, token)`.
async fn register(h: &Harness, username: &str) -> (u64, String) {
    let res = h.server.post("/auth/register").json(&register_body(username)).await;
    res.assert_status(StatusCode::CREATED);
    let body: Value = res.json();
    (
        body["user"]["id"].as_u64().unwrap(),
        body["access_token"].as_str().unwrap().to_string(),
    )
}

async fn register_admin(h: &Harness, username: &str) -> (u64, String) {
    let (id, token) = register(h, username).await;
    h.state.admin.set_admin(username, true).unwrap();
    (id, token)
}

fn team_body(roles: Value) -> Value {
    json!({
        "title": "Compiler club",
        "category": "project",
        "periodStart": "2026-01-01",
        "periodEnd": "2026-06-30",
        "deadline": "2025-12-15",
        "description": "write a compiler",
        "contact": "kakao: compiler",
        "roles": roles
    })
}

// =============================================================================
// HEALTH & AUTH
// =============================================================================

#[tokio::test]
async fn test_health() {
    let h = harness();
    let res = h.server.get("/health").await;
    res.assert_status_ok();
    let body: Value = res.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_register_then_login() {
    let h = harness();
    let res = h.server.post("/auth/register").json(&register_body("kimcs")).await;
    res.assert_status(StatusCode::CREATED);
    let body: Value = res.json();
    assert_eq!(body["user"]["username"], "kimcs");
    assert_eq!(body["user"]["is_admin"], false);
    assert!(body["user"].get("password_hash").is_none());

    let res = h
        .server
        .post("/auth/login")
        .json(&json!({"username": "kimcs", "password": "password123"}))
        .await;
    res.assert_status_ok();
    assert!(res.json::<Value>()["access_token"].is_string());
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let h = harness();
    register(&h, "dupe").await;
    let res = h.server.post("/auth/register").json(&register_body("dupe")).await;
    res.assert_status(StatusCode::CONFLICT);
    let body: Value = res.json();
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["error"], "username already exists");
}

#[tokio::test]
async fn test_register_validation_errors_are_400() {
    let h = harness();
    let mut body = register_body("ok-name");
    body["email"] = json!("not-an-email");
    let res = h.server.post("/auth/register").json(&body).await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert!(res.json::<Value>()["error"].as_str().unwrap().contains("email"));

    let res = h.server.post("/auth/register").json(&json!({"username": "x"})).await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_login_failures_share_a_message() {
    let h = harness();
    register(&h, "member").await;
    let wrong_pw = h
        .server
        .post("/auth/login")
        .json(&json!({"username": "member", "password": "wrong-password"}))
        .await;
    let unknown = h
        .server
        .post("/auth/login")
        .json(&json!({"username": "nobody", "password": "password123"}))
        .await;
    wrong_pw.assert_status(StatusCode::UNAUTHORIZED);
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw.json::<Value>()["error"], unknown.json::<Value>()["error"]);
}

#[tokio::test]
async fn test_auth_routes_are_rate_limited() {
    let h = harness_with(RouterOptions {
        auth_rate_per_sec: 1,
        ..RouterOptions::default()
    });
    let creds = json!({"username": "nobody", "password": "password123"});
    h.server.post("/auth/login").json(&creds).await;
    let res = h.server.post("/auth/login").json(&creds).await;
    res.assert_status(StatusCode::TOO_MANY_REQUESTS);

    // Other routes are unaffected.
    h.server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let h = harness();
    h.server
        .post("/api/v1/teams")
        .json(&team_body(json!([{"roleName": "dev", "recruitCount": 1}])))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .get("/api/v1/study/1")
        .authorization_bearer("garbage.token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// MEMBERS & ADMIN
// =============================================================================

#[tokio::test]
async fn test_public_member_list_hides_private_fields() {
    let h = harness();
    register(&h, "quiet").await;
    let res = h.server.get("/api/v1/members").await;
    res.assert_status_ok();
    let list: Vec<Value> = res.json();
    assert_eq!(list.len(), 1);
    let card = list[0].as_object().unwrap();
    assert_eq!(card["name"], "quiet name");
    assert!(!card.contains_key("email"));
    assert!(!card.contains_key("student_number"));
}

#[tokio::test]
async fn test_admin_routes_reject_regular_members() {
    let h = harness();
    let (_, token) = register(&h, "regular").await;
    let res = h
        .server
        .get("/api/v1/admin/members/search")
        .add_query_param("type", "name")
        .add_query_param("word", "reg")
        .authorization_bearer(&token)
        .await;
    res.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_search_update_remove() {
    let h = harness();
    let (_, admin) = register_admin(&h, "root").await;
    let (member_id, _) = register(&h, "target").await;

    let res = h
        .server
        .get("/api/v1/admin/members/search")
        .add_query_param("type", "email")
        .add_query_param("word", "TARGET@")
        .authorization_bearer(&admin)
        .await;
    res.assert_status_ok();
    let found: Vec<Value> = res.json();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["username"], "target");

    h.server
        .get("/api/v1/admin/members/search")
        .add_query_param("type", "password")
        .add_query_param("word", "x")
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let res = h
        .server
        .patch(&format!("/api/v1/admin/members/{member_id}"))
        .authorization_bearer(&admin)
        .json(&json!({"major": "Mathematics"}))
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["major"], "Mathematics");

    h.server
        .patch(&format!("/api/v1/admin/members/{member_id}"))
        .authorization_bearer(&admin)
        .json(&json!({"username": "root"}))
        .await
        .assert_status(StatusCode::CONFLICT);

    h.server
        .delete("/api/v1/admin/members/abc")
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let res = h
        .server
        .delete(&format!("/api/v1/admin/members/{member_id}"))
        .authorization_bearer(&admin)
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["success"], true);

    h.server
        .delete(&format!("/api/v1/admin/members/{member_id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// ANNOUNCEMENTS
// =============================================================================

#[tokio::test]
async fn test_announcement_lifecycle() {
    let h = harness();
    let (_, admin) = register_admin(&h, "root").await;
    let (_, member) = register(&h, "reader").await;

    let body = json!({"title": "Welcome", "contents": "hello all", "summary": "hi"});
    h.server
        .post("/api/v1/announcements")
        .authorization_bearer(&member)
        .json(&body)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let res = h
        .server
        .post("/api/v1/announcements")
        .authorization_bearer(&admin)
        .json(&body)
        .await;
    res.assert_status(StatusCode::CREATED);
    let created: Value = res.json();
    let id = created["id"].as_u64().unwrap();
    assert_eq!(created["author"]["username"], "root");
    assert!(created["publishAt"].is_string());

    let first: Value = h.server.get(&format!("/api/v1/announcements/{id}")).await.json();
    let second: Value = h.server.get(&format!("/api/v1/announcements/{id}")).await.json();
    assert_eq!(first["views"], 1);
    assert_eq!(second["views"], 2);

    h.server
        .patch(&format!("/api/v1/announcements/{id}"))
        .authorization_bearer(&admin)
        .json(&json!({}))
        .await
        .assert_status_ok();

    h.server
        .delete(&format!("/api/v1/announcements/{id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    h.server
        .get(&format!("/api/v1/announcements/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scheduled_announcement_is_hidden() {
    let h = harness();
    let (_, admin) = register_admin(&h, "root").await;
    let res = h
        .server
        .post("/api/v1/announcements")
        .authorization_bearer(&admin)
        .json(&json!({
            "title": "Later",
            "contents": "soon",
            "summary": "soon",
            "publishAt": "2999-01-01T00:00:00Z"
        }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let id = res.json::<Value>()["id"].as_u64().unwrap();

    let list: Vec<Value> = h.server.get("/api/v1/announcements").await.json();
    assert!(list.is_empty());
    h.server
        .get(&format!("/api/v1/announcements/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// TEAMS
// =============================================================================

#[tokio::test]
async fn test_team_create_apply_cancel() {
    let h = harness();
    let (leader_id, leader) = register(&h, "leader").await;
    let (_, applicant) = register(&h, "applicant").await;

    let res = h
        .server
        .post("/api/v1/teams")
        .authorization_bearer(&leader)
        .json(&team_body(json!([
            {"roleName": "backend", "recruitCount": 2},
            {"roleName": "frontend", "recruitCount": 1}
        ])))
        .await;
    res.assert_status(StatusCode::CREATED);
    let team: Value = res.json();
    let team_id = team["id"].as_u64().unwrap();
    assert_eq!(team["status"], "OPEN");
    assert_eq!(team["leader"]["id"].as_u64().unwrap(), leader_id);
    assert_eq!(team["roles"].as_array().unwrap().len(), 2);
    assert_eq!(team["members"][0]["isLeader"], true);
    let role_id = team["roles"][0]["id"].as_u64().unwrap();

    let apply_url = format!("/api/v1/teams/{team_id}/apply");
    let res = h
        .server
        .post(&apply_url)
        .authorization_bearer(&applicant)
        .json(&json!({"roleId": role_id}))
        .await;
    res.assert_status(StatusCode::CREATED);
    assert_eq!(res.json::<Value>()["isLeader"], false);

    h.server
        .post(&apply_url)
        .authorization_bearer(&applicant)
        .json(&json!({"roleId": role_id}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    h.server
        .delete(&apply_url)
        .authorization_bearer(&leader)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let res = h.server.delete(&apply_url).authorization_bearer(&applicant).await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["success"], true);

    h.server
        .delete(&apply_url)
        .authorization_bearer(&applicant)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_team_requires_roles() {
    let h = harness();
    let (_, leader) = register(&h, "leader").await;
    h.server
        .post("/api/v1/teams")
        .authorization_bearer(&leader)
        .json(&team_body(json!([])))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_leader_modifies_team() {
    let h = harness();
    let (_, leader) = register(&h, "leader").await;
    let (_, other) = register(&h, "other").await;
    let team: Value = h
        .server
        .post("/api/v1/teams")
        .authorization_bearer(&leader)
        .json(&team_body(json!([{"roleName": "dev", "recruitCount": 1}])))
        .await
        .json();
    let team_id = team["id"].as_u64().unwrap();
    let role_id = team["roles"][0]["id"].as_u64().unwrap();
    let url = format!("/api/v1/teams/{team_id}");

    h.server
        .patch(&url)
        .authorization_bearer(&other)
        .json(&json!({"title": "hijacked"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    h.server
        .patch(&format!("{url}/status"))
        .authorization_bearer(&other)
        .json(&json!({"status": "CLOSED"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    h.server
        .delete(&url)
        .authorization_bearer(&other)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let res = h
        .server
        .patch(&url)
        .authorization_bearer(&leader)
        .json(&json!({
            "title": "Compiler club v2",
            "rolesToAdd": [{"roleName": "docs", "recruitCount": 1}]
        }))
        .await;
    res.assert_status_ok();
    let updated: Value = res.json();
    assert_eq!(updated["title"], "Compiler club v2");
    assert_eq!(updated["roles"].as_array().unwrap().len(), 2);

    h.server
        .patch(&url)
        .authorization_bearer(&leader)
        .json(&json!({"rolesToAdd": [{"roleName": "dev", "recruitCount": 1}]}))
        .await
        .assert_status(StatusCode::CONFLICT);

    let closed: Value = h
        .server
        .patch(&format!("{url}/status"))
        .authorization_bearer(&leader)
        .json(&json!({"status": "CLOSED"}))
        .await
        .json();
    assert_eq!(closed["status"], "CLOSED");

    h.server
        .post(&format!("{url}/apply"))
        .authorization_bearer(&other)
        .json(&json!({"roleId": role_id}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    h.server
        .delete(&url)
        .authorization_bearer(&leader)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    h.server.get(&url).await.assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// STUDY
// =============================================================================

/// Admin creates a study led by `leader_id`; returns the study id.
async fn create_study(h: &Harness, admin: &str, leader_id: u64) -> u64 {
    let res = h
        .server
        .post("/api/v1/study")
        .authorization_bearer(admin)
        .json(&json!({
            "study_name": "Algorithms",
            "start_year": 2025,
            "study_description": "weekly problem solving",
            "leader_id": leader_id
        }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let body: Value = res.json();
    assert_eq!(body["success"], true);
    body["id"].as_u64().unwrap()
}

#[tokio::test]
async fn test_study_list_and_detail() {
    let h = harness();
    let (_, admin) = register_admin(&h, "root").await;
    let (leader_id, leader) = register(&h, "leader").await;
    let study = create_study(&h, &admin, leader_id).await;

    let list: Vec<Value> = h.server.get("/api/v1/study").await.json();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["leader_name"], "leader name");
    assert_eq!(list[0]["members_count"], 1);

    let none: Vec<Value> = h
        .server
        .get("/api/v1/study")
        .add_query_param("year", "2019")
        .await
        .json();
    assert!(none.is_empty());

    h.server
        .get("/api/v1/study")
        .add_query_param("year", "soon")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    h.server
        .get(&format!("/api/v1/study/{study}"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    let detail: Value = h
        .server
        .get(&format!("/api/v1/study/{study}"))
        .authorization_bearer(&leader)
        .await
        .json();
    assert_eq!(detail["leader"]["user_id"].as_u64().unwrap(), leader_id);
    assert!(detail["members"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_study_create_is_admin_only() {
    let h = harness();
    let (leader_id, leader) = register(&h, "leader").await;
    h.server
        .post("/api/v1/study")
        .authorization_bearer(&leader)
        .json(&json!({
            "study_name": "Rust",
            "start_year": 2025,
            "study_description": "ownership",
            "leader_id": leader_id
        }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_study_membership_and_leader_change() {
    let h = harness();
    let (_, admin) = register_admin(&h, "root").await;
    let (leader_id, leader) = register(&h, "leader").await;
    let (member_id, member) = register(&h, "member").await;
    let (_, outsider) = register(&h, "outsider").await;
    let study = create_study(&h, &admin, leader_id).await;
    let members_url = format!("/api/v1/study/{study}/members");

    let res = h
        .server
        .get(&format!("/api/v1/study/{study}/available-members"))
        .add_query_param("search", "MEMBER")
        .authorization_bearer(&leader)
        .await;
    res.assert_status_ok();
    let available: Vec<Value> = res.json();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0]["user_id"].as_u64().unwrap(), member_id);

    h.server
        .post(&members_url)
        .authorization_bearer(&leader)
        .json(&json!({"user_id": member_id, "role_name": "Leader"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    h.server
        .post(&members_url)
        .authorization_bearer(&leader)
        .json(&json!({"user_id": member_id, "role_name": "member"}))
        .await
        .assert_status(StatusCode::CREATED);
    h.server
        .post(&members_url)
        .authorization_bearer(&leader)
        .json(&json!({"user_id": member_id, "role_name": "member"}))
        .await
        .assert_status(StatusCode::CONFLICT);

    h.server
        .get(&members_url)
        .authorization_bearer(&member)
        .await
        .assert_status_ok();
    h.server
        .get(&members_url)
        .authorization_bearer(&outsider)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    h.server
        .patch(&format!("/api/v1/study/{study}"))
        .authorization_bearer(&admin)
        .json(&json!({"user_id": member_id}))
        .await
        .assert_status_ok();
    let roles: Vec<Value> = h
        .server
        .get(&members_url)
        .authorization_bearer(&admin)
        .await
        .json();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0]["user_id"].as_u64().unwrap(), member_id);
    assert_eq!(roles[0]["role_name"], "Leader");

    h.server
        .delete(&format!("{members_url}/{leader_id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_study_progress_and_resources() {
    let h = harness();
    let (_, admin) = register_admin(&h, "root").await;
    let (leader_id, leader) = register(&h, "leader").await;
    let study = create_study(&h, &admin, leader_id).await;

    let res = h
        .server
        .post(&format!("/api/v1/study/{study}/progress"))
        .authorization_bearer(&leader)
        .json(&json!({"title": "Week 1", "content": "graphs"}))
        .await;
    res.assert_status(StatusCode::CREATED);
    let progress_id = res.json::<Value>()["id"].as_u64().unwrap();

    h.server
        .patch(&format!("/api/v1/study/{study}/progress/{progress_id}"))
        .authorization_bearer(&leader)
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    h.server
        .patch(&format!("/api/v1/study/{study}/progress/{progress_id}"))
        .authorization_bearer(&leader)
        .json(&json!({"content": "shortest paths"}))
        .await
        .assert_status_ok();

    let resources_url = format!("/api/v1/study/{study}/resources");
    let bad = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"MZ".to_vec()).file_name("tool.exe"),
    );
    h.server
        .post(&resources_url)
        .authorization_bearer(&leader)
        .multipart(bad)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"%PDF-1.7".to_vec())
            .file_name("notes.pdf")
            .mime_type("application/pdf"),
    );
    let res = h
        .server
        .post(&resources_url)
        .authorization_bearer(&leader)
        .multipart(form)
        .await;
    res.assert_status(StatusCode::CREATED);
    let resource: Value = res.json();
    assert_eq!(resource["format"], "PDF");
    assert_eq!(resource["name"], "notes.pdf");
    let stored = resource["dir_path"].as_str().unwrap().to_string();
    assert!(std::path::Path::new(&stored).exists());

    let detail: Value = h
        .server
        .get(&format!("/api/v1/study/{study}"))
        .authorization_bearer(&leader)
        .await
        .json();
    assert_eq!(detail["resources"].as_array().unwrap().len(), 1);
    assert_eq!(detail["progress"][0]["content"], "shortest paths");

    let res = h
        .server
        .delete(&format!("/api/v1/study/{study}"))
        .authorization_bearer(&admin)
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["success"], true);
    assert!(!std::path::Path::new(&stored).exists());
}
