use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/praxis.db".to_string(),
            log_level: "info".to_string(),
            suppress_connection_errors: false,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production safety. Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Session idle timeout in minutes.
    pub session_timeout_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 7760,
            cors_allowed_origins: vec![
                "http://localhost:7760".to_string(),
                "http://127.0.0.1:7760".to_string(),
            ],
            secure_cookies: true,
            session_timeout_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    /// Lower values reduce memory usage but decrease GPU resistance.
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Issuer label embedded in TOTP provisioning URIs; what the
    /// authenticator app shows next to the account.
    pub totp_issuer: String,

    /// Failed MFA verifications tolerated before the credential locks.
    pub mfa_max_failures: i32,

    /// Lockout duration once `mfa_max_failures` is reached.
    pub mfa_lockout_seconds: i64,

    /// Login/password endpoint throttling policy.
    pub auth_throttle: AuthThrottleConfig,

    #[serde(default)]
    pub csrf: CsrfConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            totp_issuer: "Praxis".to_string(),
            mfa_max_failures: 5,
            mfa_lockout_seconds: 5 * 60,
            auth_throttle: AuthThrottleConfig::default(),
            csrf: CsrfConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthThrottleConfig {
    /// Max requests per key in the window before rejection.
    pub max_attempts: u32,

    /// Fixed window for counting requests.
    pub window_seconds: u64,
}

impl Default for AuthThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window_seconds: 5 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Paths (prefix match) exempt from the double-submit check, e.g.
    /// identity-provider callbacks that cannot carry our header.
    pub exempt_path_prefixes: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            exempt_path_prefixes: vec![
                "/api/auth/login".to_string(),
                "/api/auth/logout".to_string(),
                "/api/auth/callback".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Optional cron expression; takes precedence over the interval.
    pub cron_expression: Option<String>,

    /// Interval between maintenance sweeps (rate-limit windows).
    pub sweep_interval_minutes: u32,

    /// Audit rows older than this are pruned.
    pub audit_retention_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron_expression: None,
            sweep_interval_minutes: 15,
            audit_retention_days: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "praxis".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        for path in Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(&path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        if let Ok(custom) = std::env::var("PRAXIS_CONFIG") {
            paths.push(PathBuf::from(custom));
        }

        paths.push(PathBuf::from("config.toml"));
        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.security.totp_issuer.is_empty() {
            anyhow::bail!("TOTP issuer cannot be empty");
        }

        if self.security.totp_issuer.contains(':') {
            anyhow::bail!("TOTP issuer must not contain ':' (reserved in otpauth URIs)");
        }

        if self.scheduler.enabled
            && self.scheduler.sweep_interval_minutes == 0
            && self.scheduler.cron_expression.is_none()
        {
            anyhow::bail!("Scheduler interval must be > 0 or cron expression must be set");
        }

        if self.security.auth_throttle.max_attempts == 0
            || self.security.auth_throttle.window_seconds == 0
        {
            anyhow::bail!("Auth throttle window and attempt count must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_colon_in_issuer() {
        let mut config = Config::default();
        config.security.totp_issuer = "Praxis: Clinic".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [general]
            database_path = "sqlite::memory:"

            [security]
            totp_issuer = "Example Health"
            "#,
        )
        .unwrap();

        assert_eq!(config.general.database_path, "sqlite::memory:");
        assert_eq!(config.security.totp_issuer, "Example Health");
        assert_eq!(config.server.port, 7760);
        assert_eq!(config.security.auth_throttle.max_attempts, 10);
    }
}
