use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::use_cases::retention::RetentionUseCases;

/// Runs the chat retention sweep on a fixed period. The first pass fires
/// immediately on startup.
pub async fn run_retention_sweep_loop(retention: Arc<RetentionUseCases>, every_secs: u64) {
    let mut ticker = interval(Duration::from_secs(every_secs.max(1)));

    info!(
        "Retention sweeper started (sweeping every {}s)",
        every_secs
    );

    loop {
        ticker.tick().await;

        match retention.sweep(Utc::now()).await {
            Ok(report) if report.users_failed > 0 => {
                warn!(
                    users_failed = report.users_failed,
                    users_scanned = report.users_scanned,
                    "Retention sweep finished with failures"
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = ?e, "Retention sweep failed");
            }
        }
    }
}
