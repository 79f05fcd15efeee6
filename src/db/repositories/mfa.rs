use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::{prelude::*, user_mfa};

pub struct MfaRepository {
    conn: DatabaseConnection,
}

impl MfaRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, user_id: i32) -> Result<Option<user_mfa::Model>> {
        let credential = UserMfa::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query MFA credential")?;

        Ok(credential)
    }

    /// Create (or recreate) a pending credential with a freshly
    /// generated secret. Re-initiating setup discards any earlier
    /// pending secret.
    pub async fn upsert_pending(&self, user_id: i32, secret: &str) -> Result<()> {
        UserMfa::delete_by_id(user_id)
            .exec(&self.conn)
            .await
            .context("Failed to clear previous MFA credential")?;

        let now = chrono::Utc::now().to_rfc3339();

        let active = user_mfa::ActiveModel {
            user_id: Set(user_id),
            secret: Set(secret.to_string()),
            is_enabled: Set(false),
            enabled_at: Set(None),
            backup_codes: Set("[]".to_string()),
            failed_attempts: Set(0),
            locked_until: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        UserMfa::insert(active)
            .exec(&self.conn)
            .await
            .context("Failed to insert pending MFA credential")?;

        Ok(())
    }

    /// Activate a pending credential: store the backup-code hash set,
    /// mark enabled, and reset failure tracking.
    pub async fn enable(&self, user_id: i32, backup_codes_json: &str) -> Result<()> {
        let credential = self
            .require(user_id)
            .await
            .context("Failed to load MFA credential for enable")?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: user_mfa::ActiveModel = credential.into();
        active.is_enabled = Set(true);
        active.enabled_at = Set(Some(now.clone()));
        active.backup_codes = Set(backup_codes_json.to_string());
        active.failed_attempts = Set(0);
        active.locked_until = Set(None);
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Replace the stored backup-code hash set wholesale. Old codes are
    /// invalid the moment this commits.
    pub async fn replace_backup_codes(&self, user_id: i32, backup_codes_json: &str) -> Result<()> {
        let credential = self
            .require(user_id)
            .await
            .context("Failed to load MFA credential for backup-code replacement")?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: user_mfa::ActiveModel = credential.into();
        active.backup_codes = Set(backup_codes_json.to_string());
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn record_failure(
        &self,
        user_id: i32,
        failed_attempts: i32,
        locked_until: Option<String>,
    ) -> Result<()> {
        let credential = self
            .require(user_id)
            .await
            .context("Failed to load MFA credential for failure tracking")?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: user_mfa::ActiveModel = credential.into();
        active.failed_attempts = Set(failed_attempts);
        active.locked_until = Set(locked_until);
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn reset_failures(&self, user_id: i32) -> Result<()> {
        let credential = self
            .require(user_id)
            .await
            .context("Failed to load MFA credential for failure reset")?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: user_mfa::ActiveModel = credential.into();
        active.failed_attempts = Set(0);
        active.locked_until = Set(None);
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Destroy the credential entirely (MFA disable).
    pub async fn delete(&self, user_id: i32) -> Result<()> {
        UserMfa::delete_by_id(user_id)
            .exec(&self.conn)
            .await
            .context("Failed to delete MFA credential")?;

        Ok(())
    }

    async fn require(&self, user_id: i32) -> Result<user_mfa::Model> {
        UserMfa::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query MFA credential")?
            .ok_or_else(|| anyhow::anyhow!("No MFA credential for user {user_id}"))
    }
}
