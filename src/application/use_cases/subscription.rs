use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        plan::{PlanUpdate, compute_plan_update},
        user_profile::UserProfile,
    },
};

#[async_trait]
pub trait UserProfileRepo: Send + Sync {
    async fn get(&self, user_id: &str) -> AppResult<Option<UserProfile>>;

    async fn list_all(&self) -> AppResult<Vec<UserProfile>>;

    /// Takes the plan lease when it is free or stale. Returns whether this
    /// caller now holds it; `false` also covers an unknown user.
    async fn try_acquire_lease(
        &self,
        user_id: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    async fn release_lease(&self, user_id: &str) -> AppResult<()>;

    async fn is_session_applied(&self, session_id: &str) -> AppResult<bool>;

    /// Records `session_id` as applied, writes the plan fields, resets usage
    /// counters and releases the lease, all in one transaction. Returns
    /// `None` and writes nothing if the session was already applied.
    async fn write_plan(
        &self,
        user_id: &str,
        update: &PlanUpdate,
        session_id: &str,
    ) -> AppResult<Option<UserProfile>>;

    async fn list_expired_plans(&self, now: DateTime<Utc>) -> AppResult<Vec<UserProfile>>;

    /// Drops an expired plan back to the free tier. Skipped (returns `false`)
    /// while a lease is held or if the plan was renewed in the meantime.
    async fn clear_expired_plan(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<bool>;

    /// Subtracts `minutes`, floored at zero. `None` when the user is unknown.
    async fn deduct_voice_minutes(&self, user_id: &str, minutes: i32) -> AppResult<Option<i32>>;
}

/// Applies purchased plans to user profiles and retires lapsed ones.
///
/// Both paths serialize on the persisted lease on the profile row, so an
/// expiry pass never clobbers a plan that is being applied.
#[derive(Clone)]
pub struct SubscriptionApplier {
    users: Arc<dyn UserProfileRepo>,
    lease_ttl: Duration,
}

impl SubscriptionApplier {
    pub fn new(users: Arc<dyn UserProfileRepo>, lease_ttl: Duration) -> Self {
        Self { users, lease_ttl }
    }

    /// Applies `plan_id` for the payment `session_id`.
    ///
    /// Applying the same session twice is a no-op that returns the current
    /// profile, so a failed provisioning step can simply be retried.
    #[instrument(skip(self))]
    pub async fn apply(
        &self,
        user_id: &str,
        plan_id: &str,
        plan_name: &str,
        session_id: &str,
    ) -> AppResult<UserProfile> {
        let existing = self.load(user_id).await?;
        if self.users.is_session_applied(session_id).await? {
            debug!("Session already applied, skipping");
            return Ok(existing);
        }

        let now = Utc::now();
        if !self
            .users
            .try_acquire_lease(user_id, now + self.lease_ttl, now)
            .await?
        {
            warn!("Plan lease is held by another writer");
            return Err(AppError::SubscriptionLocked);
        }

        match self.apply_leased(user_id, plan_id, plan_name, session_id, now).await {
            Ok(profile) => Ok(profile),
            Err(err) => {
                if let Err(release_err) = self.users.release_lease(user_id).await {
                    error!(error = ?release_err, "Failed to release plan lease");
                }
                Err(err)
            }
        }
    }

    async fn apply_leased(
        &self,
        user_id: &str,
        plan_id: &str,
        plan_name: &str,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<UserProfile> {
        // Re-read under the lease; the first read only gated on existence.
        let existing = self.load(user_id).await?;
        let update = compute_plan_update(&existing, plan_id, plan_name, now);

        let Some(profile) = self.users.write_plan(user_id, &update, session_id).await? else {
            debug!("Session applied concurrently, skipping");
            self.users.release_lease(user_id).await?;
            return self.load(user_id).await;
        };

        info!(
            plan = %update.plan,
            plan_expiry = %update.plan_expiry,
            renewal = existing.plan.as_deref() == Some(plan_id),
            "Plan applied"
        );
        Ok(profile)
    }

    /// Clears every lapsed plan whose lease is free. Per-user failures are
    /// logged and skipped. Returns how many plans were cleared.
    #[instrument(skip(self))]
    pub async fn expire_plans(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let candidates = self.users.list_expired_plans(now).await?;
        let mut cleared = 0;

        for user in candidates {
            if user.is_leased(now) {
                debug!(user_id = %user.user_id, "Plan lease held, expiry deferred");
                continue;
            }
            match self.users.clear_expired_plan(&user.user_id, now).await {
                Ok(true) => {
                    info!(user_id = %user.user_id, plan = ?user.plan, "Expired plan cleared");
                    cleared += 1;
                }
                Ok(false) => {
                    debug!(user_id = %user.user_id, "Plan changed or leased, expiry skipped");
                }
                Err(e) => {
                    error!(user_id = %user.user_id, error = ?e, "Failed to clear expired plan");
                }
            }
        }

        Ok(cleared)
    }

    async fn load(&self, user_id: &str) -> AppResult<UserProfile> {
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }
}
