use serde::{Deserialize, Serialize};

use crate::entities::{appointment_reminders, appointments, mfa_audit_log};
use crate::models::appointment::AppointmentStatus;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AppointmentDto {
    pub id: String,
    pub practice_id: String,
    pub patient_name: String,
    pub clinician: Option<String>,
    pub scheduled_for: String,
    pub status: String,
    pub cancelled_reason: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<appointments::Model> for AppointmentDto {
    fn from(model: appointments::Model) -> Self {
        Self {
            id: model.id,
            practice_id: model.practice_id,
            patient_name: model.patient_name,
            clinician: model.clinician,
            scheduled_for: model.scheduled_for,
            status: model.status,
            cancelled_reason: model.cancelled_reason,
            cancelled_at: model.cancelled_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReminderDto {
    pub id: i64,
    pub appointment_id: String,
    pub remind_at: String,
    pub channel: String,
    pub status: String,
    pub created_at: String,
}

impl From<appointment_reminders::Model> for ReminderDto {
    fn from(model: appointment_reminders::Model) -> Self {
        Self {
            id: model.id,
            appointment_id: model.appointment_id,
            remind_at: model.remind_at,
            channel: model.channel,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_name: String,
    pub clinician: Option<String>,
    pub scheduled_for: String,
}

#[derive(Debug, Deserialize)]
pub struct TransitionStatusRequest {
    pub status: Option<String>,
    pub cancel_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionStatusResponse {
    pub appointment: AppointmentDto,
    pub previous_status: AppointmentStatus,
    pub new_status: AppointmentStatus,
    /// Pending reminders moved to cancelled; null when the best-effort
    /// sweep failed after the transition committed.
    pub reminders_cancelled: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    pub remind_at: String,
    pub channel: String,
}

#[derive(Debug, Deserialize)]
pub struct MfaCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct MfaSetupResponse {
    pub qr_code_data_url: String,
    pub secret: String,
    pub otpauth_url: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MfaBackupCodesResponse {
    pub backup_codes: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MfaStatusResponse {
    pub is_enabled: bool,
    pub is_pending: bool,
    pub enabled_at: Option<String>,
    pub backup_codes_remaining: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuditEntryDto {
    pub id: i64,
    pub user_id: i32,
    pub action: String,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl From<mfa_audit_log::Model> for AuditEntryDto {
    fn from(model: mfa_audit_log::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            success: model.success,
            failure_reason: model.failure_reason,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub entries: Vec<AuditEntryDto>,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub database_ok: bool,
}
