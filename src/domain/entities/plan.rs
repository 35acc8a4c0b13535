use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::user_profile::UserProfile;

/// Every plan runs for the same fixed period.
pub const PLAN_DURATION_DAYS: i64 = 30;

/// Retention for users without a paid plan.
pub const DEFAULT_CHAT_RETENTION_DAYS: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanAllowance {
    pub chat_retention_days: i32,
    pub voice_minutes: i32,
    pub token_limit: i64,
}

impl PlanAllowance {
    pub const FREE: PlanAllowance = PlanAllowance {
        chat_retention_days: DEFAULT_CHAT_RETENTION_DAYS,
        voice_minutes: 0,
        token_limit: 0,
    };

    pub fn for_plan(plan_id: &str) -> Self {
        match plan_id {
            "basic" => PlanAllowance {
                chat_retention_days: 60,
                voice_minutes: 0,
                token_limit: 230_000,
            },
            "premium" => PlanAllowance {
                chat_retention_days: 90,
                voice_minutes: 5,
                token_limit: 230_000,
            },
            _ => Self::FREE,
        }
    }
}

/// Field values written to a profile when a plan is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanUpdate {
    pub plan: String,
    pub plan_name: String,
    pub plan_purchased_at: DateTime<Utc>,
    pub plan_updated_at: DateTime<Utc>,
    pub plan_expiry: DateTime<Utc>,
    pub token_limit: i64,
    pub chat_retention_days: i32,
    pub voice_minutes_remaining: i32,
}

/// Computes the profile update for buying `plan_id` at `now`.
///
/// Renewing the current plan before it lapses extends from the existing
/// expiry. Anything else (a plan change, or renewing a lapsed plan) starts a
/// fresh period from `now`.
pub fn compute_plan_update(
    existing: &UserProfile,
    plan_id: &str,
    plan_name: &str,
    now: DateTime<Utc>,
) -> PlanUpdate {
    let duration = Duration::days(PLAN_DURATION_DAYS);
    let is_renewal = existing.plan.as_deref() == Some(plan_id);

    let plan_expiry = match existing.plan_expiry {
        Some(current) if is_renewal && current > now => current + duration,
        _ => now + duration,
    };

    let plan_purchased_at = if is_renewal {
        existing.plan_purchased_at.unwrap_or(now)
    } else {
        now
    };

    let allowance = PlanAllowance::for_plan(plan_id);

    PlanUpdate {
        plan: plan_id.to_string(),
        plan_name: plan_name.to_string(),
        plan_purchased_at,
        plan_updated_at: now,
        plan_expiry,
        token_limit: allowance.token_limit,
        chat_retention_days: allowance.chat_retention_days,
        voice_minutes_remaining: allowance.voice_minutes,
    }
}
