use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use praxis::api::AppState;
use praxis::config::Config;
use std::sync::Arc;
use totp_rs::{Algorithm, Secret, TOTP};
use tower::ServiceExt;

/// Default API key seeded by migration (must match m20260301_initial.rs)
const DEFAULT_API_KEY: &str = "praxis_default_api_key_please_regenerate";

async fn spawn_app_with_state() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;

    let state = praxis::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let app = praxis::api::router(state.clone()).await;
    (app, state)
}

/// Compute the current code the way an authenticator app would.
fn totp_code(secret_b32: &str) -> String {
    let totp = TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        Secret::Encoded(secret_b32.to_string()).to_bytes().unwrap(),
        Some("Praxis".to_string()),
        "admin".to_string(),
    )
    .unwrap();
    totp.generate_current().unwrap()
}

/// A six-digit code guaranteed not to equal `valid`.
fn wrong_code(valid: &str) -> String {
    if valid == "000000" {
        "000001".to_string()
    } else {
        "000000".to_string()
    }
}

async fn mfa_request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Api-Key", DEFAULT_API_KEY)
        .header("User-Agent", "praxis-tests")
        .header("Content-Type", "application/json");

    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };

    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Run setup + confirm, returning (secret, formatted backup codes).
async fn enable_mfa(app: &Router) -> (String, Vec<String>) {
    let response = mfa_request(app, "POST", "/api/auth/mfa/setup", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let secret = json["data"]["secret"].as_str().unwrap().to_string();

    let response = mfa_request(
        app,
        "PUT",
        "/api/auth/mfa/setup",
        Some(serde_json::json!({ "code": totp_code(&secret) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let codes: Vec<String> = json["data"]["backup_codes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect();

    (secret, codes)
}

async fn admin_user_id(state: &Arc<AppState>) -> i32 {
    state
        .store()
        .get_user_by_username("admin")
        .await
        .unwrap()
        .unwrap()
        .id
}

async fn audit_actions(state: &Arc<AppState>, user_id: i32) -> Vec<(String, bool)> {
    state
        .store()
        .list_mfa_audit_for_user(user_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.action, e.success))
        .collect()
}

#[tokio::test]
async fn test_mfa_setup_lifecycle() {
    let (app, state) = spawn_app_with_state().await;
    let user_id = admin_user_id(&state).await;

    // Fresh account: nothing configured.
    let response = mfa_request(&app, "GET", "/api/auth/mfa/status", None).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_enabled"], false);
    assert_eq!(json["data"]["is_pending"], false);
    assert_eq!(json["data"]["backup_codes_remaining"], 0);

    // Initiate: secret + scannable QR, communicated exactly once.
    let response = mfa_request(&app, "POST", "/api/auth/mfa/setup", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let secret = json["data"]["secret"].as_str().unwrap().to_string();
    assert!(!secret.is_empty());
    assert!(
        json["data"]["qr_code_data_url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
    assert!(
        json["data"]["otpauth_url"]
            .as_str()
            .unwrap()
            .starts_with("otpauth://totp/")
    );

    let response = mfa_request(&app, "GET", "/api/auth/mfa/status", None).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_pending"], true);
    assert_eq!(json["data"]["is_enabled"], false);

    // Wrong first code: generic rejection, credential stays pending.
    let valid = totp_code(&secret);
    let response = mfa_request(
        &app,
        "PUT",
        "/api/auth/mfa/setup",
        Some(serde_json::json!({ "code": wrong_code(&valid) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(
        audit_actions(&state, user_id).await,
        vec![
            ("setup_initiated".to_string(), true),
            ("setup_completed".to_string(), false),
        ]
    );

    // Correct code: enabled, ten display-formatted backup codes.
    let response = mfa_request(
        &app,
        "PUT",
        "/api/auth/mfa/setup",
        Some(serde_json::json!({ "code": totp_code(&secret) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let codes = json["data"]["backup_codes"].as_array().unwrap();
    assert_eq!(codes.len(), 10);
    for code in codes {
        let code = code.as_str().unwrap();
        assert_eq!(code.len(), 9);
        assert_eq!(&code[4..5], "-");
        assert!(!code.contains('0') && !code.contains('O') && !code.contains('1'));
    }

    let response = mfa_request(&app, "GET", "/api/auth/mfa/status", None).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_enabled"], true);
    assert_eq!(json["data"]["is_pending"], false);
    assert_eq!(json["data"]["backup_codes_remaining"], 10);
    assert!(json["data"]["enabled_at"].is_string());

    // Re-initiating while enabled is a business-rule rejection.
    let response = mfa_request(&app, "POST", "/api/auth/mfa/setup", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_confirm_requires_initiation_and_code_format() {
    let (app, _state) = spawn_app_with_state().await;

    // Confirm before setup.
    let response = mfa_request(
        &app,
        "PUT",
        "/api/auth/mfa/setup",
        Some(serde_json::json!({ "code": "123456" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = mfa_request(&app, "POST", "/api/auth/mfa/setup", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Malformed codes are rejected before any verification.
    for bad in ["12345", "1234567", "12ab56", ""] {
        let response = mfa_request(
            &app,
            "PUT",
            "/api/auth/mfa/setup",
            Some(serde_json::json!({ "code": bad })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "code {bad:?}");
    }
}

#[tokio::test]
async fn test_disable_flow() {
    let (app, state) = spawn_app_with_state().await;
    let user_id = admin_user_id(&state).await;
    let (secret, _codes) = enable_mfa(&app).await;

    // Wrong code: still enabled, exactly one disable_failed entry.
    let valid = totp_code(&secret);
    let response = mfa_request(
        &app,
        "DELETE",
        "/api/auth/mfa",
        Some(serde_json::json!({ "code": wrong_code(&valid) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let actions = audit_actions(&state, user_id).await;
    assert_eq!(
        actions
            .iter()
            .filter(|(a, s)| a == "disable_failed" && !s)
            .count(),
        1
    );

    let credential = state.store().get_mfa_credential(user_id).await.unwrap();
    assert!(credential.is_some_and(|c| c.is_enabled));

    // Correct code: credential row destroyed, flags cleared.
    let response = mfa_request(
        &app,
        "DELETE",
        "/api/auth/mfa",
        Some(serde_json::json!({ "code": totp_code(&secret) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(
        state
            .store()
            .get_mfa_credential(user_id)
            .await
            .unwrap()
            .is_none()
    );

    let actions = audit_actions(&state, user_id).await;
    assert_eq!(
        actions
            .iter()
            .filter(|(a, s)| a == "mfa_disabled" && *s)
            .count(),
        1
    );

    let response = mfa_request(&app, "GET", "/api/auth/mfa/status", None).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_enabled"], false);

    // Disabling again: nothing configured.
    let response = mfa_request(
        &app,
        "DELETE",
        "/api/auth/mfa",
        Some(serde_json::json!({ "code": "123456" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_regenerate_replaces_hashes_atomically() {
    let (app, state) = spawn_app_with_state().await;
    let user_id = admin_user_id(&state).await;
    let (secret, _codes) = enable_mfa(&app).await;

    let before = state
        .store()
        .get_mfa_credential(user_id)
        .await
        .unwrap()
        .unwrap()
        .backup_codes;

    let response = mfa_request(
        &app,
        "POST",
        "/api/auth/mfa/backup-codes",
        Some(serde_json::json!({ "code": totp_code(&secret) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["backup_codes"].as_array().unwrap().len(), 10);

    let after = state
        .store()
        .get_mfa_credential(user_id)
        .await
        .unwrap()
        .unwrap()
        .backup_codes;

    assert_ne!(before, after, "old hash set must be replaced");

    let actions = audit_actions(&state, user_id).await;
    assert!(actions.contains(&("backup_regenerated".to_string(), true)));

    // Still ten remaining: regeneration replaces, never accumulates.
    let response = mfa_request(&app, "GET", "/api/auth/mfa/status", None).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["backup_codes_remaining"], 10);
}

async fn login(app: &Router, body: serde_json::Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_login_with_second_factor_and_backup_code() {
    let (app, state) = spawn_app_with_state().await;
    let user_id = admin_user_id(&state).await;
    let (secret, codes) = enable_mfa(&app).await;

    // Password alone is no longer enough.
    let response = login(
        &app,
        serde_json::json!({ "username": "admin", "password": "password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // TOTP code works.
    let response = login(
        &app,
        serde_json::json!({
            "username": "admin",
            "password": "password",
            "mfa_code": totp_code(&secret),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A backup code works once and is consumed.
    let backup = codes[0].clone();
    let response = login(
        &app,
        serde_json::json!({
            "username": "admin",
            "password": "password",
            "mfa_code": backup,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = mfa_request(&app, "GET", "/api/auth/mfa/status", None).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["backup_codes_remaining"], 9);

    // Replay of the same code fails.
    let response = login(
        &app,
        serde_json::json!({
            "username": "admin",
            "password": "password",
            "mfa_code": codes[0],
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let actions = audit_actions(&state, user_id).await;
    assert!(actions.contains(&("backup_code_used".to_string(), true)));
    assert!(
        actions
            .iter()
            .any(|(a, s)| a == "login_failed" && !s)
    );
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;
    config.security.mfa_max_failures = 2;

    let state = praxis::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let app = praxis::api::router(state.clone()).await;

    let user_id = admin_user_id(&state).await;
    let (secret, _codes) = enable_mfa(&app).await;

    let valid = totp_code(&secret);
    for _ in 0..2 {
        let response = mfa_request(
            &app,
            "DELETE",
            "/api/auth/mfa",
            Some(serde_json::json!({ "code": wrong_code(&valid) })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // Locked: even the correct code is rejected with the same generic
    // message, and the audit trail records the real reason.
    let response = mfa_request(
        &app,
        "DELETE",
        "/api/auth/mfa",
        Some(serde_json::json!({ "code": totp_code(&secret) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let entries = state.store().list_mfa_audit_for_user(user_id).await.unwrap();
    assert!(
        entries
            .iter()
            .any(|e| e.failure_reason.as_deref() == Some("locked_out"))
    );

    let credential = state
        .store()
        .get_mfa_credential(user_id)
        .await
        .unwrap()
        .unwrap();
    assert!(credential.is_enabled);
    assert!(credential.locked_until.is_some());
}
