//! Domain service for the appointment lifecycle.
//!
//! Owns the status transition rules: which states may follow which,
//! the cancellation bypass, and the reminder sweep that accompanies a
//! cancellation.

use serde::Serialize;
use thiserror::Error;

use crate::entities::{appointment_reminders, appointments};
use crate::models::appointment::AppointmentStatus;

/// Errors specific to appointment operations.
#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Unknown appointment status: {0}")]
    UnknownStatus(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Cannot transition from {current} to {attempted}")]
    InvalidTransition {
        current: AppointmentStatus,
        attempted: AppointmentStatus,
        allowed: Vec<AppointmentStatus>,
    },

    #[error("Appointment was modified concurrently; retry the request")]
    ConcurrentModification,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for AppointmentError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Input for creating an appointment.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub practice_id: String,
    pub patient_name: String,
    pub clinician: Option<String>,
    pub scheduled_for: String,
}

/// Result of a successful status transition. Callers use the
/// previous/new pair for UI and notification purposes.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub appointment: appointments::Model,
    pub previous_status: AppointmentStatus,
    pub new_status: AppointmentStatus,
    /// Number of pending reminders moved to cancelled, or `None` when
    /// the (best-effort) sweep failed after the transition committed.
    pub reminders_cancelled: Option<u64>,
}

/// Domain service trait for appointments.
#[async_trait::async_trait]
pub trait AppointmentService: Send + Sync {
    /// Creates an appointment in the `Scheduled` state.
    async fn create(
        &self,
        new: NewAppointment,
    ) -> Result<appointments::Model, AppointmentError>;

    async fn get(
        &self,
        id: &str,
        practice_id: &str,
    ) -> Result<appointments::Model, AppointmentError>;

    async fn list(&self, practice_id: &str)
    -> Result<Vec<appointments::Model>, AppointmentError>;

    /// Applies a status transition.
    ///
    /// Cancellation is legal from any state; every other target must be
    /// listed in the transition table for the current state. The write
    /// is a compare-and-set against the status observed during
    /// validation.
    ///
    /// # Errors
    ///
    /// [`AppointmentError::InvalidTransition`] carries the current
    /// status, the attempted status, and the allowed set so callers can
    /// render a helpful message.
    async fn transition_status(
        &self,
        id: &str,
        practice_id: &str,
        target_status: &str,
        cancel_reason: Option<&str>,
    ) -> Result<TransitionOutcome, AppointmentError>;

    async fn reminders(
        &self,
        id: &str,
        practice_id: &str,
    ) -> Result<Vec<appointment_reminders::Model>, AppointmentError>;

    /// Schedules a pending reminder for an appointment.
    async fn schedule_reminder(
        &self,
        id: &str,
        practice_id: &str,
        remind_at: &str,
        channel: &str,
    ) -> Result<appointment_reminders::Model, AppointmentError>;
}
