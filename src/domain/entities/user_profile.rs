use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::plan::DEFAULT_CHAT_RETENTION_DAYS;

/// Billing-relevant slice of a user's profile. Timestamps go over the wire
/// as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub plan: Option<String>,
    pub plan_name: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub plan_purchased_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub plan_updated_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub plan_expiry: Option<DateTime<Utc>>,
    pub token_limit: i64,
    pub tokens_used: i64,
    pub chat_retention_days: Option<i32>,
    pub voice_minutes_remaining: i32,
    pub appointments_used: i32,
    pub had_subscription_before: bool,
    #[serde(skip)]
    pub lease_until: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Retention window in days, falling back to the free-tier default when
    /// unset or non-positive.
    pub fn effective_retention_days(&self) -> i32 {
        self.chat_retention_days
            .filter(|days| *days > 0)
            .unwrap_or(DEFAULT_CHAT_RETENTION_DAYS)
    }

    pub fn is_leased(&self, now: DateTime<Utc>) -> bool {
        self.lease_until.is_some_and(|until| until > now)
    }
}
