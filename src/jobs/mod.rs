use crate::metrics;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::staged_upload_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Discard abandoned staged uploads (interval from configuration)
    async fn staged_upload_sweep_job(scheduler: Arc<Self>) {
        let staging = &scheduler.context.config.staging;
        let mut interval = interval(staging.sweep_interval);

        loop {
            interval.tick().await;
            let started = Instant::now();

            match tasks::sweep_abandoned_uploads(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job(
                        "staged_upload_sweep",
                        "success",
                        started.elapsed().as_secs_f64(),
                    );
                    if count > 0 {
                        info!("Discarded {} abandoned uploads", count);
                    }
                }
                Err(e) => {
                    metrics::record_background_job(
                        "staged_upload_sweep",
                        "failure",
                        started.elapsed().as_secs_f64(),
                    );
                    error!("Failed to sweep abandoned uploads: {}", e);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;
            let started = Instant::now();

            let status = match tasks::health_check(&scheduler.context).await {
                Ok(_) => "success",
                Err(e) => {
                    error!("Health check failed: {}", e);
                    "failure"
                }
            };
            metrics::record_background_job("health_check", status, started.elapsed().as_secs_f64());
        }
    }
}
