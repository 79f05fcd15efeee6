//! `SeaORM` implementation of the `AppointmentService` trait.

use async_trait::async_trait;
use sea_orm::Set;
use tracing::warn;

use crate::db::Store;
use crate::entities::{appointment_reminders, appointments};
use crate::models::appointment::AppointmentStatus;
use crate::services::appointment_service::{
    AppointmentError, AppointmentService, NewAppointment, TransitionOutcome,
};

pub struct SeaOrmAppointmentService {
    store: Store,
}

impl SeaOrmAppointmentService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Parse a persisted status string; a row holding something outside
    /// the enumeration is a storage-integrity problem, not user error.
    fn parse_stored_status(
        appointment: &appointments::Model,
    ) -> Result<AppointmentStatus, AppointmentError> {
        appointment.status.parse().map_err(|_| {
            AppointmentError::Database(format!(
                "Appointment {} has invalid stored status '{}'",
                appointment.id, appointment.status
            ))
        })
    }
}

#[async_trait]
impl AppointmentService for SeaOrmAppointmentService {
    async fn create(
        &self,
        new: NewAppointment,
    ) -> Result<appointments::Model, AppointmentError> {
        if new.patient_name.trim().is_empty() {
            return Err(AppointmentError::Validation(
                "Patient name is required".to_string(),
            ));
        }
        if new.scheduled_for.trim().is_empty() {
            return Err(AppointmentError::Validation(
                "Scheduled time is required".to_string(),
            ));
        }

        let now = chrono::Utc::now().to_rfc3339();

        let active = appointments::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            practice_id: Set(new.practice_id),
            patient_name: Set(new.patient_name),
            clinician: Set(new.clinician),
            scheduled_for: Set(new.scheduled_for),
            status: Set(AppointmentStatus::Scheduled.as_str().to_string()),
            cancelled_reason: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        Ok(self.store.insert_appointment(active).await?)
    }

    async fn get(
        &self,
        id: &str,
        practice_id: &str,
    ) -> Result<appointments::Model, AppointmentError> {
        self.store
            .get_appointment(id, practice_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    async fn list(
        &self,
        practice_id: &str,
    ) -> Result<Vec<appointments::Model>, AppointmentError> {
        Ok(self.store.list_appointments(practice_id).await?)
    }

    async fn transition_status(
        &self,
        id: &str,
        practice_id: &str,
        target_status: &str,
        cancel_reason: Option<&str>,
    ) -> Result<TransitionOutcome, AppointmentError> {
        let target: AppointmentStatus = target_status
            .parse()
            .map_err(|_| AppointmentError::UnknownStatus(target_status.to_string()))?;

        let mut appointment = self
            .store
            .get_appointment(id, practice_id)
            .await
            .inspect_err(|e| tracing::error!("Failed to load appointment {id}: {e}"))?
            .ok_or(AppointmentError::NotFound)?;

        let current = Self::parse_stored_status(&appointment)?;

        // Cancellation bypasses the allow-list; everything else must be
        // listed for the current state. A same-status "transition" falls
        // through to the table like any other target.
        if target != AppointmentStatus::Cancelled
            && !current.allowed_transitions().contains(&target)
        {
            return Err(AppointmentError::InvalidTransition {
                current,
                attempted: target,
                allowed: current.allowed_transitions().to_vec(),
            });
        }

        let now = chrono::Utc::now().to_rfc3339();

        // Compare-and-set against the status we validated: if another
        // writer changed the row since the read above, zero rows match
        // and the caller retries against fresh state.
        let rows_affected = if target == AppointmentStatus::Cancelled {
            let reason = cancel_reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or("provider");

            appointment.cancelled_reason = Some(reason.to_string());
            appointment.cancelled_at = Some(now.clone());

            self.store
                .cancel_appointment_if(
                    id,
                    practice_id,
                    current.as_str(),
                    target.as_str(),
                    reason,
                    &now,
                )
                .await
                .inspect_err(|e| tracing::error!("Failed to cancel appointment {id}: {e}"))?
        } else {
            self.store
                .update_appointment_status_if(
                    id,
                    practice_id,
                    current.as_str(),
                    target.as_str(),
                    &now,
                )
                .await
                .inspect_err(|e| tracing::error!("Failed to update appointment {id}: {e}"))?
        };

        if rows_affected == 0 {
            return Err(AppointmentError::ConcurrentModification);
        }

        appointment.status = target.as_str().to_string();
        appointment.updated_at = now;

        // Best-effort side effect: the transition is already committed,
        // so a failed reminder sweep is reported, not rolled back.
        let reminders_cancelled = if target == AppointmentStatus::Cancelled {
            match self.store.cancel_pending_reminders(id).await {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!("Failed to cancel pending reminders for appointment {id}: {e}");
                    None
                }
            }
        } else {
            Some(0)
        };

        Ok(TransitionOutcome {
            appointment,
            previous_status: current,
            new_status: target,
            reminders_cancelled,
        })
    }

    async fn reminders(
        &self,
        id: &str,
        practice_id: &str,
    ) -> Result<Vec<appointment_reminders::Model>, AppointmentError> {
        // Scope check before touching the reminders table.
        self.get(id, practice_id).await?;

        Ok(self.store.reminders_for_appointment(id).await?)
    }

    async fn schedule_reminder(
        &self,
        id: &str,
        practice_id: &str,
        remind_at: &str,
        channel: &str,
    ) -> Result<appointment_reminders::Model, AppointmentError> {
        let appointment = self.get(id, practice_id).await?;

        let current = Self::parse_stored_status(&appointment)?;
        if current.is_terminal() {
            return Err(AppointmentError::Validation(format!(
                "Cannot schedule a reminder for a {current} appointment"
            )));
        }

        if !matches!(channel, "email" | "sms") {
            return Err(AppointmentError::Validation(format!(
                "Unknown reminder channel: {channel}"
            )));
        }

        Ok(self.store.add_reminder(id, remind_at, channel).await?)
    }
}
