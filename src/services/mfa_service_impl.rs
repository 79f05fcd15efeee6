//! `SeaORM` implementation of the `MfaService` trait, backed by
//! `totp-rs` for RFC 6238 code generation and verification.

use async_trait::async_trait;
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::info;

use crate::db::Store;
use crate::entities::user_mfa;
use crate::models::mfa::{
    format_backup_code, generate_backup_codes, hash_backup_code, normalize_backup_code,
    verify_backup_code,
};
use crate::services::mfa_service::{AuditContext, MfaError, MfaService, MfaSetup, MfaStatus};

/// RFC 6238 defaults: 6 decimal digits, 30-second step, one step of
/// clock-skew tolerance on either side. Authenticator apps implement
/// the same contract, so these values must not drift.
const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;

pub struct SeaOrmMfaService {
    store: Store,
    issuer: String,
    max_failures: i32,
    lockout_seconds: i64,
}

/// Internal verdict of a guarded code check. The user-facing error is
/// the same generic invalid-code message either way; the reason goes to
/// the audit trail only.
enum CodeCheck {
    Valid,
    Invalid(&'static str),
}

impl SeaOrmMfaService {
    #[must_use]
    pub const fn new(
        store: Store,
        issuer: String,
        max_failures: i32,
        lockout_seconds: i64,
    ) -> Self {
        Self {
            store,
            issuer,
            max_failures,
            lockout_seconds,
        }
    }

    fn build_totp(&self, secret_b32: &str, account: &str) -> Result<TOTP, MfaError> {
        let secret_bytes = Secret::Encoded(secret_b32.to_string())
            .to_bytes()
            .map_err(|e| MfaError::Internal(format!("Invalid TOTP secret: {e:?}")))?;

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret_bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| MfaError::Internal(format!("Failed to build TOTP: {e:?}")))
    }

    fn is_locked(credential: &user_mfa::Model) -> bool {
        credential
            .locked_until
            .as_deref()
            .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
            .is_some_and(|until| until > chrono::Utc::now())
    }

    fn stored_hashes(credential: &user_mfa::Model) -> Vec<String> {
        serde_json::from_str(&credential.backup_codes).unwrap_or_default()
    }

    async fn register_failure(&self, credential: &user_mfa::Model) -> Result<(), MfaError> {
        let attempts = credential.failed_attempts + 1;

        let locked_until = if attempts >= self.max_failures {
            let until = chrono::Utc::now() + chrono::Duration::seconds(self.lockout_seconds);
            Some(until.to_rfc3339())
        } else {
            credential.locked_until.clone()
        };

        self.store
            .record_mfa_failure(credential.user_id, attempts, locked_until)
            .await?;

        Ok(())
    }

    /// Verify a TOTP code against a credential, enforcing format,
    /// lockout, and the failure counter.
    async fn check_totp(
        &self,
        credential: &user_mfa::Model,
        code: &str,
    ) -> Result<CodeCheck, MfaError> {
        let Some(normalized) = normalize_totp_code(code) else {
            return Err(MfaError::Validation(
                "Verification code must be 6 digits".to_string(),
            ));
        };

        if Self::is_locked(credential) {
            return Ok(CodeCheck::Invalid("locked_out"));
        }

        let totp = self.build_totp(&credential.secret, "account")?;
        let valid = totp
            .check_current(&normalized)
            .map_err(|e| MfaError::Internal(format!("System clock error: {e}")))?;

        if valid {
            if credential.failed_attempts > 0 || credential.locked_until.is_some() {
                self.store.reset_mfa_failures(credential.user_id).await?;
            }
            Ok(CodeCheck::Valid)
        } else {
            self.register_failure(credential).await?;
            Ok(CodeCheck::Invalid("invalid_totp_code"))
        }
    }

    async fn audit(
        &self,
        user_id: i32,
        action: &str,
        success: bool,
        failure_reason: Option<&str>,
        ctx: &AuditContext,
    ) -> Result<(), MfaError> {
        self.store
            .record_mfa_audit(
                user_id,
                action,
                success,
                failure_reason.map(str::to_string),
                ctx.ip_address.clone(),
                ctx.user_agent.clone(),
            )
            .await?;

        Ok(())
    }

    /// Generate a fresh backup-code set, returning (formatted plaintext
    /// codes, JSON hash set for storage).
    fn fresh_backup_codes() -> Result<(Vec<String>, String), MfaError> {
        let codes = generate_backup_codes();
        let hashes: Vec<String> = codes.iter().map(|c| hash_backup_code(c)).collect();

        let json = serde_json::to_string(&hashes)
            .map_err(|e| MfaError::Internal(format!("Failed to encode backup codes: {e}")))?;

        let formatted = codes.iter().map(|c| format_backup_code(c)).collect();
        Ok((formatted, json))
    }
}

#[async_trait]
impl MfaService for SeaOrmMfaService {
    async fn initiate_setup(
        &self,
        user_id: i32,
        username: &str,
        ctx: &AuditContext,
    ) -> Result<MfaSetup, MfaError> {
        if let Some(credential) = self.store.get_mfa_credential(user_id).await?
            && credential.is_enabled
        {
            return Err(MfaError::AlreadyEnabled);
        }

        let secret = Secret::generate_secret();
        let Secret::Encoded(secret_b32) = secret.to_encoded() else {
            return Err(MfaError::Internal(
                "Secret encoding produced unexpected variant".to_string(),
            ));
        };

        let totp = self.build_totp(&secret_b32, username)?;
        let otpauth_url = totp.get_url();
        let qr_png_base64 = totp
            .get_qr_base64()
            .map_err(|e| MfaError::Internal(format!("Failed to render QR code: {e}")))?;

        self.store.upsert_pending_mfa(user_id, &secret_b32).await?;
        self.store.set_user_mfa_flags(user_id, false, true).await?;
        self.audit(user_id, "setup_initiated", true, None, ctx)
            .await?;

        info!("MFA setup initiated for user {user_id}");

        Ok(MfaSetup {
            secret: secret_b32,
            otpauth_url,
            qr_code_data_url: format!("data:image/png;base64,{qr_png_base64}"),
        })
    }

    async fn confirm_setup(
        &self,
        user_id: i32,
        code: &str,
        ctx: &AuditContext,
    ) -> Result<Vec<String>, MfaError> {
        let credential = self
            .store
            .get_mfa_credential(user_id)
            .await?
            .ok_or(MfaError::NotInitialized)?;

        if credential.is_enabled {
            return Err(MfaError::AlreadyEnabled);
        }

        match self.check_totp(&credential, code).await? {
            CodeCheck::Invalid(reason) => {
                self.audit(user_id, "setup_completed", false, Some(reason), ctx)
                    .await?;
                Err(MfaError::InvalidCode)
            }
            CodeCheck::Valid => {
                let (formatted, hashes_json) = Self::fresh_backup_codes()?;

                self.store.enable_mfa(user_id, &hashes_json).await?;
                self.store.set_user_mfa_flags(user_id, true, false).await?;
                self.audit(user_id, "setup_completed", true, None, ctx)
                    .await?;

                info!("MFA enabled for user {user_id}");

                Ok(formatted)
            }
        }
    }

    async fn disable(
        &self,
        user_id: i32,
        code: &str,
        ctx: &AuditContext,
    ) -> Result<(), MfaError> {
        let credential = self
            .store
            .get_mfa_credential(user_id)
            .await?
            .ok_or(MfaError::NotConfigured)?;

        if !credential.is_enabled {
            return Err(MfaError::NotEnabled);
        }

        match self.check_totp(&credential, code).await? {
            CodeCheck::Invalid(reason) => {
                self.audit(user_id, "disable_failed", false, Some(reason), ctx)
                    .await?;
                Err(MfaError::InvalidCode)
            }
            CodeCheck::Valid => {
                self.store.delete_mfa_credential(user_id).await?;
                self.store.set_user_mfa_flags(user_id, false, false).await?;
                self.audit(user_id, "mfa_disabled", true, None, ctx).await?;

                info!("MFA disabled for user {user_id}");

                Ok(())
            }
        }
    }

    async fn regenerate_backup_codes(
        &self,
        user_id: i32,
        code: &str,
        ctx: &AuditContext,
    ) -> Result<Vec<String>, MfaError> {
        let credential = self
            .store
            .get_mfa_credential(user_id)
            .await?
            .ok_or(MfaError::NotConfigured)?;

        if !credential.is_enabled {
            return Err(MfaError::NotEnabled);
        }

        match self.check_totp(&credential, code).await? {
            CodeCheck::Invalid(reason) => {
                self.audit(user_id, "backup_regenerated", false, Some(reason), ctx)
                    .await?;
                Err(MfaError::InvalidCode)
            }
            CodeCheck::Valid => {
                let (formatted, hashes_json) = Self::fresh_backup_codes()?;

                // Atomic replacement: the previous codes stop working
                // the moment this commits, with no grace overlap.
                self.store
                    .replace_mfa_backup_codes(user_id, &hashes_json)
                    .await?;
                self.audit(user_id, "backup_regenerated", true, None, ctx)
                    .await?;

                Ok(formatted)
            }
        }
    }

    async fn status(&self, user_id: i32) -> Result<MfaStatus, MfaError> {
        let credential = self.store.get_mfa_credential(user_id).await?;

        Ok(match credential {
            Some(c) => MfaStatus {
                is_enabled: c.is_enabled,
                is_pending: !c.is_enabled,
                enabled_at: c.enabled_at.clone(),
                backup_codes_remaining: Self::stored_hashes(&c).len(),
            },
            None => MfaStatus {
                is_enabled: false,
                is_pending: false,
                enabled_at: None,
                backup_codes_remaining: 0,
            },
        })
    }

    async fn verify_login_code(
        &self,
        user_id: i32,
        code: &str,
        ctx: &AuditContext,
    ) -> Result<bool, MfaError> {
        let credential = self
            .store
            .get_mfa_credential(user_id)
            .await?
            .ok_or(MfaError::NotConfigured)?;

        if !credential.is_enabled {
            return Err(MfaError::NotEnabled);
        }

        if Self::is_locked(&credential) {
            self.audit(user_id, "login_failed", false, Some("locked_out"), ctx)
                .await?;
            return Ok(false);
        }

        // A six-digit code is a TOTP attempt; anything longer is
        // treated as a backup code.
        if let Some(totp_code) = normalize_totp_code(code) {
            let totp = self.build_totp(&credential.secret, "account")?;
            let valid = totp
                .check_current(&totp_code)
                .map_err(|e| MfaError::Internal(format!("System clock error: {e}")))?;

            if valid {
                if credential.failed_attempts > 0 || credential.locked_until.is_some() {
                    self.store.reset_mfa_failures(user_id).await?;
                }
                return Ok(true);
            }

            self.register_failure(&credential).await?;
            self.audit(
                user_id,
                "login_failed",
                false,
                Some("invalid_totp_code"),
                ctx,
            )
            .await?;
            return Ok(false);
        }

        let stored = Self::stored_hashes(&credential);
        let check = verify_backup_code(&stored, &normalize_backup_code(code));

        if check.valid {
            let json = serde_json::to_string(&check.remaining)
                .map_err(|e| MfaError::Internal(format!("Failed to encode backup codes: {e}")))?;

            // Single-use: persist the shrunk set before reporting success.
            self.store.replace_mfa_backup_codes(user_id, &json).await?;
            if credential.failed_attempts > 0 || credential.locked_until.is_some() {
                self.store.reset_mfa_failures(user_id).await?;
            }
            self.audit(user_id, "backup_code_used", true, None, ctx)
                .await?;

            Ok(true)
        } else {
            self.register_failure(&credential).await?;
            self.audit(
                user_id,
                "login_failed",
                false,
                Some("invalid_backup_code"),
                ctx,
            )
            .await?;

            Ok(false)
        }
    }
}

/// Strip whitespace and require exactly six ASCII digits.
fn normalize_totp_code(code: &str) -> Option<String> {
    let stripped: String = code.chars().filter(|c| !c.is_whitespace()).collect();

    (stripped.len() == TOTP_DIGITS && stripped.chars().all(|c| c.is_ascii_digit()))
        .then_some(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_totp() -> TOTP {
        let secret = Secret::generate_secret();
        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret.to_bytes().unwrap(),
            Some("Praxis".to_string()),
            "tester".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_totp_code() {
        assert_eq!(normalize_totp_code("123456").as_deref(), Some("123456"));
        assert_eq!(normalize_totp_code(" 123 456 ").as_deref(), Some("123456"));
        assert_eq!(normalize_totp_code("12345"), None);
        assert_eq!(normalize_totp_code("1234567"), None);
        assert_eq!(normalize_totp_code("12345a"), None);
        assert_eq!(normalize_totp_code(""), None);
    }

    #[test]
    fn test_totp_round_trip_within_skew_window() {
        let totp = test_totp();
        let t: u64 = 1_000_000_000;

        let code = totp.generate(t);

        // Valid at generation time and one step either side.
        assert!(totp.check(&code, t));
        assert!(totp.check(&code, t - TOTP_STEP));
        assert!(totp.check(&code, t + TOTP_STEP));

        // Two full steps away falls outside the skew window.
        assert!(!totp.check(&code, t + 3 * TOTP_STEP));
        assert!(!totp.check(&code, t - 3 * TOTP_STEP));
    }

    #[test]
    fn test_totp_boundary_is_step_aligned_not_wall_clock() {
        let totp = test_totp();

        // t sits at the end of its 30s step: [999_999_990, 1_000_000_020).
        let t: u64 = 1_000_000_019;
        let code = totp.generate(t);

        // 2 seconds later is the adjacent step; still within skew.
        assert!(totp.check(&code, t + 2));

        // 62 seconds later is two steps away; rejected even though the
        // wall-clock delta is barely over a minute.
        assert!(!totp.check(&code, t + 62));
    }

    #[test]
    fn test_provisioning_url_carries_issuer() {
        let totp = test_totp();
        let url = totp.get_url();

        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("Praxis"));
        assert!(url.contains("tester"));
    }
}
