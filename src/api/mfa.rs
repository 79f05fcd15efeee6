//! Two-factor authentication endpoints.
//!
//! Every operation here requires an authenticated caller; the second
//! factor gates itself (enable/disable/regenerate all demand a valid
//! code) so a stolen session alone cannot silently weaken the account.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{audit_context, current_user};
use super::{
    ApiError, ApiResponse, AppState, MessageResponse, MfaBackupCodesResponse, MfaCodeRequest,
    MfaSetupResponse, MfaStatusResponse,
};

/// POST /auth/mfa/setup
/// Generate a fresh TOTP secret and provisioning QR code.
pub async fn setup_mfa(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<MfaSetupResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    let ctx = audit_context(&headers);

    let setup = state
        .mfa_service()
        .initiate_setup(user.id, &user.username, &ctx)
        .await?;

    Ok(Json(ApiResponse::success(MfaSetupResponse {
        qr_code_data_url: setup.qr_code_data_url,
        secret: setup.secret,
        otpauth_url: setup.otpauth_url,
        message: "Scan the QR code with your authenticator app, then confirm with a code"
            .to_string(),
    })))
}

/// PUT /auth/mfa/setup
/// Confirm setup with the first code; returns backup codes exactly once.
pub async fn confirm_mfa(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<MfaCodeRequest>,
) -> Result<Json<ApiResponse<MfaBackupCodesResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    let ctx = audit_context(&headers);

    let backup_codes = state
        .mfa_service()
        .confirm_setup(user.id, &payload.code, &ctx)
        .await?;

    Ok(Json(ApiResponse::success(MfaBackupCodesResponse {
        backup_codes,
        message: "Two-factor authentication enabled. Store these backup codes somewhere safe; \
                  they will not be shown again"
            .to_string(),
    })))
}

/// DELETE /auth/mfa
/// Disable MFA after verifying a current code.
pub async fn disable_mfa(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<MfaCodeRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    let ctx = audit_context(&headers);

    state
        .mfa_service()
        .disable(user.id, &payload.code, &ctx)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Two-factor authentication disabled".to_string(),
    })))
}

/// POST /auth/mfa/backup-codes
/// Rotate the backup-code set after verifying a current code.
pub async fn regenerate_backup_codes(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<MfaCodeRequest>,
) -> Result<Json<ApiResponse<MfaBackupCodesResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    let ctx = audit_context(&headers);

    let backup_codes = state
        .mfa_service()
        .regenerate_backup_codes(user.id, &payload.code, &ctx)
        .await?;

    Ok(Json(ApiResponse::success(MfaBackupCodesResponse {
        backup_codes,
        message: "Backup codes regenerated; the previous codes are no longer valid".to_string(),
    })))
}

/// GET /auth/mfa/status
/// Read-only projection; never returns the codes themselves.
pub async fn mfa_status(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<MfaStatusResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    let status = state.mfa_service().status(user.id).await?;

    Ok(Json(ApiResponse::success(MfaStatusResponse {
        is_enabled: status.is_enabled,
        is_pending: status.is_pending,
        enabled_at: status.enabled_at,
        backup_codes_remaining: status.backup_codes_remaining,
    })))
}
