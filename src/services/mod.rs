pub mod appointment_service;
pub mod appointment_service_impl;
pub use appointment_service::{
    AppointmentError, AppointmentService, NewAppointment, TransitionOutcome,
};
pub use appointment_service_impl::SeaOrmAppointmentService;

pub mod mfa_service;
pub mod mfa_service_impl;
pub use mfa_service::{AuditContext, MfaError, MfaService, MfaSetup, MfaStatus};
pub use mfa_service_impl::SeaOrmMfaService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;

pub mod scheduler;
pub use scheduler::Scheduler;
