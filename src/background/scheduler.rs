use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::services::AutopaymentEngine;

/// Runs autopayment ticks on a cron schedule inside the server process.
///
/// Each firing spawns its tick and returns, so a slow tick can overlap the
/// next one.
pub struct BackgroundScheduler {
    scheduler: JobScheduler,
}

impl BackgroundScheduler {
    pub async fn new(engine: AutopaymentEngine, cron: &str) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new().await?;

        scheduler
            .add(Job::new_async(cron, move |_uuid, _l| {
                let engine = engine.clone();
                Box::pin(async move {
                    tokio::spawn(async move {
                        if let Err(e) = engine.run_tick(Utc::now()).await {
                            error!("Autopayment tick failed: {}", e);
                        }
                    });
                })
            })?)
            .await?;

        scheduler.start().await?;
        info!("Background scheduler started (autopayments: {})", cron);

        Ok(Self { scheduler })
    }

    pub async fn shutdown(&self) {
        let mut scheduler = self.scheduler.clone();
        if let Err(e) = scheduler.shutdown().await {
            error!("Background scheduler shutdown failed: {}", e);
            return;
        }
        info!("Background scheduler stopped");
    }
}
