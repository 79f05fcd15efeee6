pub mod prelude;

pub mod appointment_reminders;
pub mod appointments;
pub mod mfa_audit_log;
pub mod user_mfa;
pub mod users;
