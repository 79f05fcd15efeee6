use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{appointment_reminders, appointments, mfa_audit_log, user_mfa};

pub mod migrator;
pub mod repositories;

pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("memory") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn appointment_repo(&self) -> repositories::appointment::AppointmentRepository {
        repositories::appointment::AppointmentRepository::new(self.conn.clone())
    }

    fn mfa_repo(&self) -> repositories::mfa::MfaRepository {
        repositories::mfa::MfaRepository::new(self.conn.clone())
    }

    fn audit_repo(&self) -> repositories::audit::AuditRepository {
        repositories::audit::AuditRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ========== Appointment Repository Methods ==========

    pub async fn get_appointment(
        &self,
        id: &str,
        practice_id: &str,
    ) -> Result<Option<appointments::Model>> {
        self.appointment_repo().get(id, practice_id).await
    }

    pub async fn list_appointments(&self, practice_id: &str) -> Result<Vec<appointments::Model>> {
        self.appointment_repo().list_for_practice(practice_id).await
    }

    pub async fn insert_appointment(
        &self,
        model: appointments::ActiveModel,
    ) -> Result<appointments::Model> {
        self.appointment_repo().insert(model).await
    }

    pub async fn update_appointment_status_if(
        &self,
        id: &str,
        practice_id: &str,
        expected_status: &str,
        new_status: &str,
        now: &str,
    ) -> Result<u64> {
        self.appointment_repo()
            .update_status_if(id, practice_id, expected_status, new_status, now)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn cancel_appointment_if(
        &self,
        id: &str,
        practice_id: &str,
        expected_status: &str,
        new_status: &str,
        reason: &str,
        now: &str,
    ) -> Result<u64> {
        self.appointment_repo()
            .cancel_if(id, practice_id, expected_status, new_status, reason, now)
            .await
    }

    pub async fn cancel_pending_reminders(&self, appointment_id: &str) -> Result<u64> {
        self.appointment_repo()
            .cancel_pending_reminders(appointment_id)
            .await
    }

    pub async fn reminders_for_appointment(
        &self,
        appointment_id: &str,
    ) -> Result<Vec<appointment_reminders::Model>> {
        self.appointment_repo().reminders_for(appointment_id).await
    }

    pub async fn add_reminder(
        &self,
        appointment_id: &str,
        remind_at: &str,
        channel: &str,
    ) -> Result<appointment_reminders::Model> {
        self.appointment_repo()
            .add_reminder(appointment_id, remind_at, channel)
            .await
    }

    // ========== MFA Repository Methods ==========

    pub async fn get_mfa_credential(&self, user_id: i32) -> Result<Option<user_mfa::Model>> {
        self.mfa_repo().get(user_id).await
    }

    pub async fn upsert_pending_mfa(&self, user_id: i32, secret: &str) -> Result<()> {
        self.mfa_repo().upsert_pending(user_id, secret).await
    }

    pub async fn enable_mfa(&self, user_id: i32, backup_codes_json: &str) -> Result<()> {
        self.mfa_repo().enable(user_id, backup_codes_json).await
    }

    pub async fn replace_mfa_backup_codes(
        &self,
        user_id: i32,
        backup_codes_json: &str,
    ) -> Result<()> {
        self.mfa_repo()
            .replace_backup_codes(user_id, backup_codes_json)
            .await
    }

    pub async fn record_mfa_failure(
        &self,
        user_id: i32,
        failed_attempts: i32,
        locked_until: Option<String>,
    ) -> Result<()> {
        self.mfa_repo()
            .record_failure(user_id, failed_attempts, locked_until)
            .await
    }

    pub async fn reset_mfa_failures(&self, user_id: i32) -> Result<()> {
        self.mfa_repo().reset_failures(user_id).await
    }

    pub async fn delete_mfa_credential(&self, user_id: i32) -> Result<()> {
        self.mfa_repo().delete(user_id).await
    }

    // ========== Audit Repository Methods ==========

    pub async fn record_mfa_audit(
        &self,
        user_id: i32,
        action: &str,
        success: bool,
        failure_reason: Option<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<()> {
        self.audit_repo()
            .record(user_id, action, success, failure_reason, ip_address, user_agent)
            .await
    }

    pub async fn list_mfa_audit(
        &self,
        page: u64,
        page_size: u64,
        user_filter: Option<i32>,
        action_filter: Option<String>,
    ) -> Result<(Vec<mfa_audit_log::Model>, u64)> {
        self.audit_repo()
            .list(page, page_size, user_filter, action_filter)
            .await
    }

    pub async fn list_mfa_audit_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<mfa_audit_log::Model>> {
        self.audit_repo().list_for_user(user_id).await
    }

    pub async fn prune_mfa_audit(&self, older_than_days: i64) -> Result<u64> {
        self.audit_repo().prune(older_than_days).await
    }

    // ========== User Repository Methods ==========

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn update_user_password(&self, username: &str, new_password: &str) -> Result<()> {
        self.user_repo()
            .update_password(username, new_password)
            .await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    pub async fn get_user_api_key(&self, username: &str) -> Result<Option<String>> {
        self.user_repo().get_api_key(username).await
    }

    pub async fn regenerate_user_api_key(&self, username: &str) -> Result<String> {
        self.user_repo().regenerate_api_key(username).await
    }

    pub async fn set_user_mfa_flags(
        &self,
        user_id: i32,
        enabled: bool,
        pending: bool,
    ) -> Result<()> {
        self.user_repo()
            .set_mfa_flags(user_id, enabled, pending)
            .await
    }
}
