use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{mfa_audit_log, prelude::*};

pub struct AuditRepository {
    conn: DatabaseConnection,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Append one audit row. The trail is append-only; nothing in this
    /// repository mutates existing rows.
    pub async fn record(
        &self,
        user_id: i32,
        action: &str,
        success: bool,
        failure_reason: Option<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<()> {
        let active = mfa_audit_log::ActiveModel {
            user_id: Set(user_id),
            action: Set(action.to_string()),
            success: Set(success),
            failure_reason: Set(failure_reason),
            ip_address: Set(ip_address),
            user_agent: Set(user_agent),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        MfaAuditLog::insert(active).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        user_filter: Option<i32>,
        action_filter: Option<String>,
    ) -> Result<(Vec<mfa_audit_log::Model>, u64)> {
        let mut query = MfaAuditLog::find().order_by_desc(mfa_audit_log::Column::CreatedAt);

        if let Some(user_id) = user_filter {
            query = query.filter(mfa_audit_log::Column::UserId.eq(user_id));
        }

        if let Some(action) = action_filter {
            query = query.filter(mfa_audit_log::Column::Action.eq(action));
        }

        let paginator = query.paginate(&self.conn, page_size);
        let total_pages = paginator.num_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total_pages))
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<mfa_audit_log::Model>> {
        let items = MfaAuditLog::find()
            .filter(mfa_audit_log::Column::UserId.eq(user_id))
            .order_by_asc(mfa_audit_log::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(items)
    }

    pub async fn prune(&self, older_than_days: i64) -> Result<u64> {
        let result = MfaAuditLog::delete_many()
            .filter(
                sea_orm::Condition::all().add(
                    sea_orm::sea_query::Expr::col(mfa_audit_log::Column::CreatedAt).lt(
                        sea_orm::sea_query::Func::cust("datetime")
                            .arg(sea_orm::sea_query::Expr::val("now"))
                            .arg(sea_orm::sea_query::Expr::val(format!(
                                "-{older_than_days} days"
                            ))),
                    ),
                ),
            )
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
