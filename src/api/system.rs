use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_page_params;
use super::{ApiError, ApiResponse, AppState, AuditEntryDto, AuditResponse, SystemStatus};

/// GET /system/status
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    let database_ok = state.store().ping().await.is_ok();

    Ok(Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        database_ok,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub user_id: Option<i32>,
    pub action: Option<String>,
}

/// GET /system/audit
/// Paged listing of the MFA audit trail.
pub async fn get_audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<AuditResponse>>, ApiError> {
    let (page, page_size) =
        validate_page_params(query.page.unwrap_or(1), query.page_size.unwrap_or(50))?;

    let (entries, total_pages) = state
        .store()
        .list_mfa_audit(page, page_size, query.user_id, query.action)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list audit entries: {e}")))?;

    Ok(Json(ApiResponse::success(AuditResponse {
        entries: entries.into_iter().map(AuditEntryDto::from).collect(),
        total_pages,
    })))
}
