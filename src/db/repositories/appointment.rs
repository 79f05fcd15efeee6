use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{appointment_reminders, appointments, prelude::*};
use crate::models::appointment::ReminderStatus;

pub struct AppointmentRepository {
    conn: DatabaseConnection,
}

impl AppointmentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Fetch an appointment scoped by practice. Lookups are never done
    /// by id alone.
    pub async fn get(
        &self,
        id: &str,
        practice_id: &str,
    ) -> Result<Option<appointments::Model>> {
        let appointment = Appointments::find()
            .filter(appointments::Column::Id.eq(id))
            .filter(appointments::Column::PracticeId.eq(practice_id))
            .one(&self.conn)
            .await
            .context("Failed to query appointment")?;

        Ok(appointment)
    }

    pub async fn list_for_practice(&self, practice_id: &str) -> Result<Vec<appointments::Model>> {
        let appointments = Appointments::find()
            .filter(appointments::Column::PracticeId.eq(practice_id))
            .order_by_asc(appointments::Column::ScheduledFor)
            .all(&self.conn)
            .await
            .context("Failed to list appointments")?;

        Ok(appointments)
    }

    pub async fn insert(
        &self,
        model: appointments::ActiveModel,
    ) -> Result<appointments::Model> {
        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert appointment")?;

        Ok(inserted)
    }

    /// Conditional status update: only applies when the row still holds
    /// `expected_status`. Returns the number of rows affected; zero
    /// means a concurrent writer got there first.
    pub async fn update_status_if(
        &self,
        id: &str,
        practice_id: &str,
        expected_status: &str,
        new_status: &str,
        now: &str,
    ) -> Result<u64> {
        let result = Appointments::update_many()
            .col_expr(appointments::Column::Status, Expr::value(new_status))
            .col_expr(appointments::Column::UpdatedAt, Expr::value(now))
            .filter(appointments::Column::Id.eq(id))
            .filter(appointments::Column::PracticeId.eq(practice_id))
            .filter(appointments::Column::Status.eq(expected_status))
            .exec(&self.conn)
            .await
            .context("Failed to update appointment status")?;

        Ok(result.rows_affected)
    }

    /// Conditional cancellation: same compare-and-set as
    /// `update_status_if`, additionally recording the reason and time.
    pub async fn cancel_if(
        &self,
        id: &str,
        practice_id: &str,
        expected_status: &str,
        new_status: &str,
        reason: &str,
        now: &str,
    ) -> Result<u64> {
        let result = Appointments::update_many()
            .col_expr(appointments::Column::Status, Expr::value(new_status))
            .col_expr(appointments::Column::CancelledReason, Expr::value(reason))
            .col_expr(appointments::Column::CancelledAt, Expr::value(now))
            .col_expr(appointments::Column::UpdatedAt, Expr::value(now))
            .filter(appointments::Column::Id.eq(id))
            .filter(appointments::Column::PracticeId.eq(practice_id))
            .filter(appointments::Column::Status.eq(expected_status))
            .exec(&self.conn)
            .await
            .context("Failed to cancel appointment")?;

        Ok(result.rows_affected)
    }

    /// Move every pending reminder of this appointment (and only this
    /// appointment) to cancelled. Returns how many rows changed.
    pub async fn cancel_pending_reminders(&self, appointment_id: &str) -> Result<u64> {
        let result = AppointmentReminders::update_many()
            .col_expr(
                appointment_reminders::Column::Status,
                Expr::value(ReminderStatus::Cancelled.as_str()),
            )
            .filter(appointment_reminders::Column::AppointmentId.eq(appointment_id))
            .filter(appointment_reminders::Column::Status.eq(ReminderStatus::Pending.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to cancel pending reminders")?;

        Ok(result.rows_affected)
    }

    pub async fn reminders_for(
        &self,
        appointment_id: &str,
    ) -> Result<Vec<appointment_reminders::Model>> {
        let reminders = AppointmentReminders::find()
            .filter(appointment_reminders::Column::AppointmentId.eq(appointment_id))
            .order_by_asc(appointment_reminders::Column::RemindAt)
            .all(&self.conn)
            .await
            .context("Failed to list reminders")?;

        Ok(reminders)
    }

    pub async fn add_reminder(
        &self,
        appointment_id: &str,
        remind_at: &str,
        channel: &str,
    ) -> Result<appointment_reminders::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = appointment_reminders::ActiveModel {
            appointment_id: Set(appointment_id.to_string()),
            remind_at: Set(remind_at.to_string()),
            channel: Set(channel.to_string()),
            status: Set(ReminderStatus::Pending.as_str().to_string()),
            created_at: Set(now),
            ..Default::default()
        };

        let inserted = active
            .insert(&self.conn)
            .await
            .context("Failed to insert reminder")?;

        Ok(inserted)
    }
}
