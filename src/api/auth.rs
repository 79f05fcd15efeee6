use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::db::User;
use crate::services::mfa_service::AuditContext;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// TOTP or backup code; required once the user has MFA enabled.
    pub mfa_code: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub api_key: String,
}

#[derive(Serialize)]
pub struct UserInfoResponse {
    pub username: String,
    pub practice_id: String,
    pub mfa_enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct ApiKeyResponse {
    pub api_key: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that checks:
/// 1. Session cookie (from login)
/// 2. `X-Api-Key` header
/// 3. `Authorization: Bearer <api_key>` header
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    // Check session first (fastest path for web UI)
    if let Ok(Some(user)) = session.get::<String>("user").await {
        tracing::Span::current().record("user_id", &user);
        return Ok(next.run(request).await);
    }

    // Extract API key from headers
    let api_key = extract_api_key(&headers);

    if let Some(key) = api_key {
        // Verify API key against database
        if let Ok(Some(user)) = state.store().verify_api_key(&key).await {
            tracing::Span::current().record("user_id", &user.username);
            return Ok(next.run(request).await);
        }
    }

    let response = (StatusCode::UNAUTHORIZED, "Unauthorized");
    Ok(response.into_response())
}

/// Extract API key from headers
fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    // Check X-Api-Key header
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.to_string());
    }

    // Check Authorization: Bearer header
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

/// Resolve the authenticated user for handlers that need identity, not
/// just authorization: session first, then API key.
pub(crate) async fn current_user(
    state: &Arc<AppState>,
    session: &Session,
    headers: &HeaderMap,
) -> Result<User, ApiError> {
    if let Ok(Some(username)) = session.get::<String>("user").await {
        return state
            .store()
            .get_user_by_username(&username)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()));
    }

    if let Some(key) = extract_api_key(headers)
        && let Ok(Some(user)) = state.store().verify_api_key(&key).await
    {
        return Ok(user);
    }

    Err(ApiError::Unauthorized("Not authenticated".to_string()))
}

/// Client context (forwarded IP, user agent) recorded with audit rows.
pub(crate) fn audit_context(headers: &HeaderMap) -> AuditContext {
    let ip_address = headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let user_agent = headers
        .get("User-Agent")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    AuditContext {
        ip_address,
        user_agent,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with username, password, and (when enabled) a second
/// factor; returns API key on success.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    // Validate input
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    // Throttle by forwarded client IP, falling back to the username so
    // header-less clients still get a bucket.
    let ctx = audit_context(&headers);
    let throttle_key = ctx
        .ip_address
        .clone()
        .unwrap_or_else(|| payload.username.clone());

    let decision = state.rate_limiter().check(&format!("login:{throttle_key}"));
    if !decision.allowed {
        return Err(ApiError::RateLimited {
            retry_after_seconds: decision.reset_after.as_secs().max(1),
        });
    }

    let result = state
        .auth_service()
        .login(
            &payload.username,
            &payload.password,
            payload.mfa_code.as_deref(),
            &ctx,
        )
        .await?;

    // Create session
    if let Err(e) = session.insert("user", &result.username).await {
        return Err(ApiError::internal(format!("Failed to create session: {e}")));
    }

    Ok(Json(ApiResponse::success(LoginResponse {
        username: result.username,
        api_key: result.api_key,
    })))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/me
/// Get current user information (requires authentication)
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<UserInfoResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    let info = state.auth_service().get_user_info(&user.username).await?;

    Ok(Json(ApiResponse::success(UserInfoResponse {
        username: info.username,
        practice_id: info.practice_id,
        mfa_enabled: info.mfa_enabled,
        created_at: info.created_at,
        updated_at: info.updated_at,
    })))
}

/// PUT /auth/password
/// Change password (requires current password verification)
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    state
        .auth_service()
        .change_password(
            &user.username,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;

    tracing::info!("Password changed for user: {}", user.username);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}

/// GET /auth/api-key
/// Get the current API key
pub async fn get_api_key(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    let api_key = state.auth_service().get_api_key(&user.username).await?;

    Ok(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}

/// POST /auth/api-key/regenerate
/// Generate a new random API key
pub async fn regenerate_api_key(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    let new_api_key = state
        .auth_service()
        .regenerate_api_key(&user.username)
        .await?;

    tracing::info!("API key regenerated for user: {}", user.username);

    Ok(Json(ApiResponse::success(ApiKeyResponse {
        api_key: new_api_key,
    })))
}
