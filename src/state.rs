use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::security::RateLimiter;
use crate::services::{
    AppointmentService, AuthService, MfaService, SeaOrmAppointmentService, SeaOrmAuthService,
    SeaOrmMfaService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub rate_limiter: Arc<RateLimiter>,

    pub appointment_service: Arc<dyn AppointmentService>,

    pub mfa_service: Arc<dyn MfaService>,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let rate_limiter = Arc::new(RateLimiter::new(
            config.security.auth_throttle.max_attempts,
            config.security.auth_throttle.window_seconds,
        ));

        let mfa_service = Arc::new(SeaOrmMfaService::new(
            store.clone(),
            config.security.totp_issuer.clone(),
            config.security.mfa_max_failures,
            config.security.mfa_lockout_seconds,
        )) as Arc<dyn MfaService + Send + Sync + 'static>;

        let auth_service = Arc::new(SeaOrmAuthService::new(store.clone(), mfa_service.clone()))
            as Arc<dyn AuthService + Send + Sync + 'static>;

        let appointment_service = Arc::new(SeaOrmAppointmentService::new(store.clone()))
            as Arc<dyn AppointmentService + Send + Sync + 'static>;

        let config_arc = Arc::new(RwLock::new(config));

        Ok(Self {
            config: config_arc,
            store,
            rate_limiter,
            appointment_service,
            mfa_service,
            auth_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
