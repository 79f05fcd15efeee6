pub use super::appointment_reminders::Entity as AppointmentReminders;
pub use super::appointments::Entity as Appointments;
pub use super::mfa_audit_log::Entity as MfaAuditLog;
pub use super::user_mfa::Entity as UserMfa;
pub use super::users::Entity as Users;
