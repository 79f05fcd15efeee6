//! Domain service for two-factor authentication.
//!
//! Covers the full TOTP credential lifecycle (initiate, confirm,
//! disable, backup-code rotation) plus the login-time code check, with
//! an append-only audit trail behind every sensitive operation.

use serde::Serialize;
use thiserror::Error;

/// Errors specific to MFA operations.
///
/// Whatever the internal cause of a failed verification (wrong code,
/// expired step, lockout), the API layer collapses it to the same
/// generic invalid-code message; the distinction lives only in the
/// audit trail.
#[derive(Debug, Error)]
pub enum MfaError {
    #[error("Two-factor authentication is already enabled")]
    AlreadyEnabled,

    #[error("Two-factor setup has not been initiated")]
    NotInitialized,

    #[error("Two-factor authentication is not configured")]
    NotConfigured,

    #[error("Two-factor authentication is not enabled")]
    NotEnabled,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for MfaError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for MfaError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Client context recorded with every audit entry.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Output of setup initiation. The raw secret is communicated outward
/// exactly once, here.
#[derive(Debug, Clone, Serialize)]
pub struct MfaSetup {
    pub secret: String,
    pub otpauth_url: String,
    pub qr_code_data_url: String,
}

/// Read-only projection of a user's MFA state. Never includes codes.
#[derive(Debug, Clone, Serialize)]
pub struct MfaStatus {
    pub is_enabled: bool,
    pub is_pending: bool,
    pub enabled_at: Option<String>,
    pub backup_codes_remaining: usize,
}

/// Domain service trait for MFA.
#[async_trait::async_trait]
pub trait MfaService: Send + Sync {
    /// Generates a fresh secret and pending credential.
    ///
    /// # Errors
    ///
    /// Returns [`MfaError::AlreadyEnabled`] when a confirmed credential
    /// exists.
    async fn initiate_setup(
        &self,
        user_id: i32,
        username: &str,
        ctx: &AuditContext,
    ) -> Result<MfaSetup, MfaError>;

    /// Verifies the first code and activates the credential. Returns
    /// the plaintext backup codes, formatted for display, exactly once.
    async fn confirm_setup(
        &self,
        user_id: i32,
        code: &str,
        ctx: &AuditContext,
    ) -> Result<Vec<String>, MfaError>;

    /// Verifies a code and destroys the credential entirely.
    async fn disable(
        &self,
        user_id: i32,
        code: &str,
        ctx: &AuditContext,
    ) -> Result<(), MfaError>;

    /// Verifies a code and replaces the backup-code set atomically;
    /// old codes are invalid immediately.
    async fn regenerate_backup_codes(
        &self,
        user_id: i32,
        code: &str,
        ctx: &AuditContext,
    ) -> Result<Vec<String>, MfaError>;

    async fn status(&self, user_id: i32) -> Result<MfaStatus, MfaError>;

    /// Login-time check: accepts a current TOTP code or a single-use
    /// backup code (which is consumed on success).
    async fn verify_login_code(
        &self,
        user_id: i32,
        code: &str,
        ctx: &AuditContext,
    ) -> Result<bool, MfaError>;
}
