use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::current_user;
use super::validation::validate_appointment_id;
use super::{
    ApiError, ApiResponse, AppState, AppointmentDto, CreateAppointmentRequest,
    CreateReminderRequest, ReminderDto, TransitionStatusRequest, TransitionStatusResponse,
};
use crate::security::sanitize::sanitize_plain_text;
use crate::services::NewAppointment;

/// POST /appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<CreateAppointmentRequest>,
) -> Result<Json<ApiResponse<AppointmentDto>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    let patient_name = sanitize_plain_text(&payload.patient_name);
    if patient_name.is_empty() {
        return Err(ApiError::validation("Patient name is required"));
    }

    if chrono::DateTime::parse_from_rfc3339(&payload.scheduled_for).is_err() {
        return Err(ApiError::validation(
            "scheduled_for must be an RFC 3339 timestamp",
        ));
    }

    let clinician = payload
        .clinician
        .as_deref()
        .map(sanitize_plain_text)
        .filter(|c| !c.is_empty());

    let appointment = state
        .appointment_service()
        .create(NewAppointment {
            practice_id: user.practice_id,
            patient_name,
            clinician,
            scheduled_for: payload.scheduled_for,
        })
        .await?;

    Ok(Json(ApiResponse::success(appointment.into())))
}

/// GET /appointments
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<AppointmentDto>>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    let appointments = state
        .appointment_service()
        .list(&user.practice_id)
        .await?
        .into_iter()
        .map(AppointmentDto::from)
        .collect();

    Ok(Json(ApiResponse::success(appointments)))
}

/// GET /appointments/{id}
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AppointmentDto>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    let id = validate_appointment_id(&id)?;

    let appointment = state
        .appointment_service()
        .get(&id, &user.practice_id)
        .await?;

    Ok(Json(ApiResponse::success(appointment.into())))
}

/// PATCH /appointments/{id}/status
/// Apply a status transition; cancellation additionally sweeps pending
/// reminders.
pub async fn transition_status(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<TransitionStatusRequest>,
) -> Result<Json<ApiResponse<TransitionStatusResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    let id = validate_appointment_id(&id)?;

    let target = payload
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("status is required"))?;

    let cancel_reason = payload
        .cancel_reason
        .as_deref()
        .map(sanitize_plain_text)
        .filter(|r| !r.is_empty());

    let outcome = state
        .appointment_service()
        .transition_status(&id, &user.practice_id, target, cancel_reason.as_deref())
        .await?;

    tracing::info!(
        "Appointment {id}: {} -> {}",
        outcome.previous_status,
        outcome.new_status
    );

    Ok(Json(ApiResponse::success(TransitionStatusResponse {
        appointment: outcome.appointment.into(),
        previous_status: outcome.previous_status,
        new_status: outcome.new_status,
        reminders_cancelled: outcome.reminders_cancelled,
    })))
}

/// GET /appointments/{id}/reminders
pub async fn list_reminders(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ReminderDto>>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    let id = validate_appointment_id(&id)?;

    let reminders = state
        .appointment_service()
        .reminders(&id, &user.practice_id)
        .await?
        .into_iter()
        .map(ReminderDto::from)
        .collect();

    Ok(Json(ApiResponse::success(reminders)))
}

/// POST /appointments/{id}/reminders
pub async fn create_reminder(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<CreateReminderRequest>,
) -> Result<Json<ApiResponse<ReminderDto>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    let id = validate_appointment_id(&id)?;

    if chrono::DateTime::parse_from_rfc3339(&payload.remind_at).is_err() {
        return Err(ApiError::validation(
            "remind_at must be an RFC 3339 timestamp",
        ));
    }

    let reminder = state
        .appointment_service()
        .schedule_reminder(&id, &user.practice_id, &payload.remind_at, &payload.channel)
        .await?;

    Ok(Json(ApiResponse::success(reminder.into())))
}
