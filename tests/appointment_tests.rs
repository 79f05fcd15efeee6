use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use praxis::config::Config;
use tower::ServiceExt;

/// Default API key seeded by migration (must match m20260301_initial.rs)
const DEFAULT_API_KEY: &str = "praxis_default_api_key_please_regenerate";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;

    let state = praxis::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    praxis::api::router(state).await
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn create_appointment(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/appointments")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "patient_name": "Jane Doe",
                        "clinician": "Dr. Okafor",
                        "scheduled_for": "2026-09-01T09:00:00+00:00",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "Scheduled");
    json["data"]["id"].as_str().unwrap().to_string()
}

async fn patch_status(
    app: &Router,
    id: &str,
    body: serde_json::Value,
) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/appointments/{id}/status"))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn add_reminder(app: &Router, id: &str) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/appointments/{id}/reminders"))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "remind_at": "2026-08-31T09:00:00+00:00",
                        "channel": "email",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
}

async fn reminder_statuses(app: &Router, id: &str) -> Vec<String> {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/appointments/{id}/reminders"))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_full_lifecycle_through_completion() {
    let app = spawn_app().await;
    let id = create_appointment(&app).await;

    for (target, previous) in [
        ("Confirmed", "Scheduled"),
        ("Checked-In", "Confirmed"),
        ("In Session", "Checked-In"),
        ("Completed", "In Session"),
    ] {
        let response = patch_status(&app, &id, serde_json::json!({ "status": target })).await;
        assert_eq!(response.status(), StatusCode::OK, "transition to {target}");

        let json = body_json(response).await;
        assert_eq!(json["data"]["previous_status"], previous);
        assert_eq!(json["data"]["new_status"], target);
        assert_eq!(json["data"]["appointment"]["status"], target);
    }

    // Completed is terminal: any non-cancel target is rejected with an
    // empty allowed set.
    let response = patch_status(&app, &id, serde_json::json!({ "status": "Confirmed" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["current_status"], "Completed");
    assert_eq!(json["attempted_status"], "Confirmed");
    assert_eq!(json["allowed_transitions"], serde_json::json!([]));
}

#[tokio::test]
async fn test_illegal_transition_reports_allowed_set() {
    let app = spawn_app().await;
    let id = create_appointment(&app).await;

    // Scheduled -> In Session skips Confirmed/Checked-In.
    let response = patch_status(&app, &id, serde_json::json!({ "status": "In Session" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["current_status"], "Scheduled");
    assert_eq!(json["attempted_status"], "In Session");
    assert_eq!(
        json["allowed_transitions"],
        serde_json::json!(["Confirmed", "Cancelled"])
    );
}

#[tokio::test]
async fn test_same_status_transition_is_rejected() {
    let app = spawn_app().await;
    let id = create_appointment(&app).await;

    let response = patch_status(&app, &id, serde_json::json!({ "status": "Scheduled" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["current_status"], "Scheduled");
    assert_eq!(json["attempted_status"], "Scheduled");
}

#[tokio::test]
async fn test_status_validation() {
    let app = spawn_app().await;
    let id = create_appointment(&app).await;

    // Unknown status
    let response = patch_status(&app, &id, serde_json::json!({ "status": "Teleported" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing status
    let response = patch_status(&app, &id, serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Empty status
    let response = patch_status(&app, &id, serde_json::json!({ "status": "  " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_appointment() {
    let app = spawn_app().await;

    let response = patch_status(
        &app,
        "6e8bc430-9c3a-11d9-9669-0800200c9a66",
        serde_json::json!({ "status": "Confirmed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Malformed id fails validation before the lookup.
    let response = patch_status(&app, "not-a-uuid", serde_json::json!({ "status": "Confirmed" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancellation_sweeps_only_this_appointments_reminders() {
    let app = spawn_app().await;

    let cancelled_id = create_appointment(&app).await;
    let untouched_id = create_appointment(&app).await;

    add_reminder(&app, &cancelled_id).await;
    add_reminder(&app, &cancelled_id).await;
    add_reminder(&app, &untouched_id).await;

    let response = patch_status(
        &app,
        &cancelled_id,
        serde_json::json!({ "status": "Cancelled", "cancel_reason": "patient request" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["previous_status"], "Scheduled");
    assert_eq!(json["data"]["new_status"], "Cancelled");
    assert_eq!(json["data"]["reminders_cancelled"], 2);
    assert_eq!(
        json["data"]["appointment"]["cancelled_reason"],
        "patient request"
    );
    assert!(json["data"]["appointment"]["cancelled_at"].is_string());

    assert_eq!(
        reminder_statuses(&app, &cancelled_id).await,
        vec!["cancelled", "cancelled"]
    );
    assert_eq!(reminder_statuses(&app, &untouched_id).await, vec!["pending"]);
}

#[tokio::test]
async fn test_cancellation_bypasses_table_and_defaults_reason() {
    let app = spawn_app().await;
    let id = create_appointment(&app).await;

    // Walk into a mid-flight state first.
    for target in ["Confirmed", "Checked-In", "In Session"] {
        let response = patch_status(&app, &id, serde_json::json!({ "status": target })).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // In Session only lists Completed, but cancellation is always legal.
    let response = patch_status(&app, &id, serde_json::json!({ "status": "Cancelled" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["appointment"]["cancelled_reason"], "provider");

    // Cancelling an already-cancelled appointment is still permitted.
    let response = patch_status(&app, &id, serde_json::json!({ "status": "Cancelled" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["previous_status"], "Cancelled");
    assert_eq!(json["data"]["new_status"], "Cancelled");
}

#[tokio::test]
async fn test_reminder_validation() {
    let app = spawn_app().await;
    let id = create_appointment(&app).await;

    // Unknown channel
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/appointments/{id}/reminders"))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "remind_at": "2026-08-31T09:00:00+00:00",
                        "channel": "carrier-pigeon",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Reminders cannot be scheduled on terminal appointments.
    let response = patch_status(&app, &id, serde_json::json!({ "status": "Cancelled" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/appointments/{id}/reminders"))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "remind_at": "2026-08-31T09:00:00+00:00",
                        "channel": "email",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patient_name_is_sanitized() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/appointments")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "patient_name": "Jane <script>alert(1)</script> Doe",
                        "scheduled_for": "2026-09-01T09:00:00+00:00",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let name = json["data"]["patient_name"].as_str().unwrap();
    assert!(!name.contains("<script>"));
    assert!(name.contains("Jane"));
}
