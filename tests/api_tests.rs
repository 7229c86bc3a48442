//! Integration tests for the HTTP API: auth, invite-gated registration,
//! client/keyword CRUD, and favorites.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use minutarr::config::Config;
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> (Arc<minutarr::api::AppState>, Router) {
    let unique = uuid::Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("minutarr-api-test-{unique}.db"));
    let storage_root = std::env::temp_dir().join(format!("minutarr-api-storage-{unique}"));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.server.secure_cookies = false;
    config.storage.root = storage_root.to_string_lossy().to_string();

    let state = minutarr::api::create_app_state_from_config(config, None)
        .await
        .expect("failed to create app state");

    let router = minutarr::api::router(state.clone()).expect("failed to build router");
    (state, router)
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = if let Some(body) = body {
        builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

/// Logs in as the migration-seeded admin and returns a bearer token.
async fn admin_token(app: &Router) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"login": "admin", "password": "password"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_accepts_seeded_admin() {
    let (_, app) = spawn_app().await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"login": "admin", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = admin_token(&app).await;

    let (status, body) = request(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "admin");
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let (_, app) = spawn_app().await;

    let (status, _) = request(&app, "GET", "/api/clients", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, "GET", "/api/clients", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_consumes_a_single_use_code_exactly_once() {
    let (state, app) = spawn_app().await;
    let token = admin_token(&app).await;

    // Admin creates a single-use code valid for a week.
    let (status, body) = request(
        &app,
        "POST",
        "/api/codes",
        Some(&token),
        Some(serde_json::json!({"expires_in_days": 7, "max_uses": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let code_id = body["data"]["id"].as_i64().unwrap();
    let display_code = body["data"]["display_code"].as_str().unwrap().to_string();
    assert_eq!(display_code.len(), 14); // XXXX-XXXX-XXXX

    // Registration with the hyphenated display form succeeds.
    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": "clerk",
            "email": "clerk@example.gov",
            "password": "a-long-password",
            "invite_code": display_code,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_user_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["role"], "user");

    // The code now shows one use and a usage row linking the new user.
    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/codes/{code_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_uses"], 1);
    assert_eq!(body["data"]["status"], "exhausted");
    assert_eq!(body["data"]["usages"][0]["user_id"].as_i64().unwrap(), new_user_id);

    // A second registration gets the generic registrant-facing rejection.
    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": "clerk2",
            "email": "clerk2@example.gov",
            "password": "a-long-password",
            "invite_code": display_code,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Registration code is not valid");

    // No second user was created and no second use was burned.
    let user = state
        .store()
        .user_repo()
        .get_by_username("clerk2")
        .await
        .unwrap();
    assert!(user.is_none());

    let new_user = state.auth().get_user_info(i32::try_from(new_user_id).unwrap()).await;
    assert!(new_user.is_ok());
}

#[tokio::test]
async fn registered_user_can_login_but_not_reach_admin_routes() {
    let (_, app) = spawn_app().await;
    let token = admin_token(&app).await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/codes",
        Some(&token),
        Some(serde_json::json!({})),
    )
    .await;
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": "watcher",
            "email": "watcher@example.gov",
            "password": "watcher-password",
            "invite_code": code.to_lowercase(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"login": "watcher", "password": "watcher-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let user_token = body["data"]["token"].as_str().unwrap().to_string();

    // Ordinary users can read but not administer.
    let (status, _) = request(&app, "GET", "/api/clients", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app,
        "POST",
        "/api/clients",
        Some(&user_token),
        Some(serde_json::json!({"name": "Sneaky Creation"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, "GET", "/api/codes", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn multi_use_codes_allow_exactly_max_uses_registrations() {
    let (_, app) = spawn_app().await;
    let token = admin_token(&app).await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/codes",
        Some(&token),
        Some(serde_json::json!({"max_uses": 2})),
    )
    .await;
    let code = body["data"]["code"].as_str().unwrap().to_string();
    let code_id = body["data"]["id"].as_i64().unwrap();

    for n in 1..=2 {
        let (status, _) = request(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(serde_json::json!({
                "username": format!("member{n}"),
                "email": format!("member{n}@example.gov"),
                "password": "member-password",
                "invite_code": code,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "registration {n} should succeed");
    }

    // Third use is one too many.
    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": "member3",
            "email": "member3@example.gov",
            "password": "member-password",
            "invite_code": code,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = request(
        &app,
        "GET",
        &format!("/api/codes/{code_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"]["current_uses"], 2);
    assert_eq!(body["data"]["status"], "exhausted");
    assert_eq!(body["data"]["usages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn revoked_codes_reject_registration() {
    let (_, app) = spawn_app().await;
    let token = admin_token(&app).await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/codes",
        Some(&token),
        Some(serde_json::json!({"max_uses": 10})),
    )
    .await;
    let code_id = body["data"]["id"].as_i64().unwrap();
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/codes/{code_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Revoking again is still a success (idempotent).
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/codes/{code_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": "latecomer",
            "email": "late@example.gov",
            "password": "late-password",
            "invite_code": code,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Registration code is not valid");
}

#[tokio::test]
async fn client_crud_with_soft_delete() {
    let (_, app) = spawn_app().await;
    let token = admin_token(&app).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/clients",
        Some(&token),
        Some(serde_json::json!({
            "name": "Springfield City Council",
            "description": "Weekly council meetings",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let client_id = body["data"]["id"].as_i64().unwrap();

    // Duplicate names conflict.
    let (status, _) = request(
        &app,
        "POST",
        "/api/clients",
        Some(&token),
        Some(serde_json::json!({"name": "Springfield City Council"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Source management.
    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/clients/{client_id}/sources"),
        Some(&token),
        Some(serde_json::json!({"url": "https://springfield.gov/meetings", "label": "Meetings"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["url"], "https://springfield.gov/meetings");

    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/clients/{client_id}/sources"),
        Some(&token),
        Some(serde_json::json!({"url": "ftp://springfield.gov/meetings"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Soft delete excludes from the default listing but keeps the row.
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/clients/{client_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(&app, "GET", "/api/clients", Some(&token), None).await;
    let names: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert!(!names.contains(&"Springfield City Council"));

    let (_, body) = request(
        &app,
        "GET",
        "/api/clients?include_inactive=true",
        Some(&token),
        None,
    )
    .await;
    let names: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert!(names.contains(&"Springfield City Council"));

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/clients/{client_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);
}

#[tokio::test]
async fn keyword_crud_and_association() {
    let (_, app) = spawn_app().await;
    let token = admin_token(&app).await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/clients",
        Some(&token),
        Some(serde_json::json!({"name": "Planning Commission"})),
    )
    .await;
    let client_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = request(
        &app,
        "POST",
        "/api/keywords",
        Some(&token),
        Some(serde_json::json!({"term": "zoning variance", "category": "land-use"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let keyword_id = body["data"]["id"].as_i64().unwrap();

    // Duplicate terms conflict.
    let (status, _) = request(
        &app,
        "POST",
        "/api/keywords",
        Some(&token),
        Some(serde_json::json!({"term": "zoning variance"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Linking twice is idempotent.
    for _ in 0..2 {
        let (status, _) = request(
            &app,
            "POST",
            &format!("/api/clients/{client_id}/keywords/{keyword_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = request(
        &app,
        "GET",
        &format!("/api/clients/{client_id}/keywords"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["term"], "zoning variance");

    // Deactivated keywords drop out of the client's active set but stay
    // linked in the association table.
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/keywords/{keyword_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(
        &app,
        "GET",
        &format!("/api/clients/{client_id}/keywords"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn favorites_toggle_and_idempotent_add() {
    let (state, app) = spawn_app().await;
    let token = admin_token(&app).await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/clients",
        Some(&token),
        Some(serde_json::json!({"name": "Water District"})),
    )
    .await;
    let client_id = body["data"]["id"].as_i64().unwrap();

    // Toggle on, toggle off.
    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/favorites/{client_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["favorited"], true);

    let (_, body) = request(&app, "GET", "/api/favorites", Some(&token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = request(
        &app,
        "POST",
        &format!("/api/favorites/{client_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"]["favorited"], false);

    // Direct adds are idempotent: no duplicate row, no error.
    let clients = state.clients();
    let id = minutarr::domain::ClientId::new(i32::try_from(client_id).unwrap());
    clients.add_favorite(1, id).await.unwrap();
    clients.add_favorite(1, id).await.unwrap();

    let favorites = clients.favorites(1).await.unwrap();
    assert_eq!(favorites.len(), 1);
}

#[tokio::test]
async fn password_reset_flow_never_discloses_accounts() {
    let (_, app) = spawn_app().await;

    // Unknown address gets the same success shape as a known one.
    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/reset/request",
        None,
        Some(serde_json::json!({"email": "nobody@example.gov"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/reset/request",
        None,
        Some(serde_json::json!({"email": "admin@localhost"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // A made-up token is rejected.
    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/reset/confirm",
        None,
        Some(serde_json::json!({"token": "deadbeef", "new_password": "another-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
