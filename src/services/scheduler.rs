//! Background maintenance: sweeps expired rate-limit windows and prunes
//! old audit rows on a configurable cadence.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::state::SharedState;

pub struct Scheduler {
    state: Arc<SharedState>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(state: Arc<SharedState>, config: SchedulerConfig) -> Self {
        Self {
            state,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        let retention_days = self.config.audit_retention_days;

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let state = Arc::clone(&state);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                if let Err(e) = run_maintenance(&state, retention_days).await {
                    error!("Scheduled maintenance failed: {}", e);
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_mins = self.config.sweep_interval_minutes;
        let retention_days = self.config.audit_retention_days;

        info!("Scheduler running every {} minutes", interval_mins);

        let mut sweep_interval = interval(Duration::from_secs(u64::from(interval_mins) * 60));
        // First tick fires immediately; skip it so startup stays quiet.
        sweep_interval.tick().await;

        loop {
            sweep_interval.tick().await;

            if !*self.running.read().await {
                break;
            }

            if let Err(e) = run_maintenance(&self.state, retention_days).await {
                error!("Scheduled maintenance failed: {}", e);
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn run_once(&self) -> Result<()> {
        info!("Running manual maintenance...");
        run_maintenance(&self.state, self.config.audit_retention_days).await
    }
}

async fn run_maintenance(state: &Arc<SharedState>, retention_days: i64) -> Result<()> {
    let swept = state.rate_limiter.sweep();
    if swept > 0 {
        debug!("Swept {} expired rate-limit windows", swept);
    }

    let pruned = state.store.prune_mfa_audit(retention_days).await?;
    if pruned > 0 {
        info!("Pruned {} audit rows older than {} days", pruned, retention_days);
    }

    Ok(())
}
