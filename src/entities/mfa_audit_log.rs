use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only trail of MFA-sensitive operations. Rows are never
/// mutated; old rows are pruned by the maintenance scheduler.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "mfa_audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: i32,

    /// Action tag: setup_initiated, setup_completed, disable_failed,
    /// mfa_disabled, backup_regenerated, login_failed, backup_code_used.
    pub action: String,

    pub success: bool,

    pub failure_reason: Option<String>,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
