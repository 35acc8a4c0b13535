use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info};

use crate::use_cases::subscription::SubscriptionApplier;

pub async fn run_plan_expiry_loop(applier: Arc<SubscriptionApplier>, every_secs: u64) {
    let mut ticker = interval(Duration::from_secs(every_secs.max(1)));

    info!(
        "Plan expiry worker started (checking every {}s)",
        every_secs
    );

    loop {
        ticker.tick().await;

        match applier.expire_plans(Utc::now()).await {
            Ok(0) => {}
            Ok(cleared) => {
                info!(cleared, "Expired plans cleared");
            }
            Err(e) => {
                error!(error = ?e, "Failed to fetch expired plans");
            }
        }
    }
}
