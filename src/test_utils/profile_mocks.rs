//! In-memory user profile store. Mirrors the conditional updates of the
//! Postgres adapter so lease and expiry rules can be exercised without a
//! database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::subscription::UserProfileRepo,
    domain::entities::{
        plan::{DEFAULT_CHAT_RETENTION_DAYS, PlanUpdate},
        user_profile::UserProfile,
    },
};

#[derive(Default)]
pub struct InMemoryUserProfileRepo {
    pub users: Mutex<HashMap<String, UserProfile>>,
    applied_sessions: Mutex<HashSet<String>>,
    claimed_before_write: Mutex<HashSet<String>>,
    plan_writes: Mutex<usize>,
    fail_plan_writes: Mutex<bool>,
}

fn apply_plan_update(profile: &mut UserProfile, update: &PlanUpdate) {
    profile.plan = Some(update.plan.clone());
    profile.plan_name = Some(update.plan_name.clone());
    profile.plan_purchased_at = Some(update.plan_purchased_at);
    profile.plan_updated_at = Some(update.plan_updated_at);
    profile.plan_expiry = Some(update.plan_expiry);
    profile.token_limit = update.token_limit;
    profile.tokens_used = 0;
    profile.had_subscription_before = true;
    profile.chat_retention_days = Some(update.chat_retention_days);
    profile.voice_minutes_remaining = update.voice_minutes_remaining;
    profile.appointments_used = 0;
    profile.lease_until = None;
}

fn has_expired_plan(profile: &UserProfile, now: DateTime<Utc>) -> bool {
    profile.plan.is_some() && profile.plan_expiry.is_some_and(|expiry| expiry <= now)
}

impl InMemoryUserProfileRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserProfile>) -> Self {
        let map: HashMap<String, UserProfile> =
            users.into_iter().map(|u| (u.user_id.clone(), u)).collect();
        Self {
            users: Mutex::new(map),
            ..Self::default()
        }
    }

    pub fn user(&self, user_id: &str) -> Option<UserProfile> {
        self.users.lock().unwrap().get(user_id).cloned()
    }

    /// Number of successful `write_plan` calls.
    pub fn plan_writes(&self) -> usize {
        *self.plan_writes.lock().unwrap()
    }

    /// Another writer claims `session_id` between the applied check and the
    /// next `write_plan`.
    pub fn claim_session_on_next_write(&self, session_id: &str) {
        self.claimed_before_write
            .lock()
            .unwrap()
            .insert(session_id.to_string());
    }

    /// Makes `write_plan` fail with a database error until switched off.
    pub fn fail_plan_writes(&self, fail: bool) {
        *self.fail_plan_writes.lock().unwrap() = fail;
    }
}

#[async_trait]
impl UserProfileRepo for InMemoryUserProfileRepo {
    async fn get(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        Ok(self.user(user_id))
    }

    async fn list_all(&self) -> AppResult<Vec<UserProfile>> {
        let mut users: Vec<UserProfile> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(users)
    }

    async fn try_acquire_lease(
        &self,
        user_id: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(user_id) {
            Some(user) if !user.is_leased(now) => {
                user.lease_until = Some(until);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_lease(&self, user_id: &str) -> AppResult<()> {
        if let Some(user) = self.users.lock().unwrap().get_mut(user_id) {
            user.lease_until = None;
        }
        Ok(())
    }

    async fn is_session_applied(&self, session_id: &str) -> AppResult<bool> {
        Ok(self.applied_sessions.lock().unwrap().contains(session_id))
    }

    async fn write_plan(
        &self,
        user_id: &str,
        update: &PlanUpdate,
        session_id: &str,
    ) -> AppResult<Option<UserProfile>> {
        if *self.fail_plan_writes.lock().unwrap() {
            return Err(AppError::Database("plan write failed".into()));
        }

        let mut users = self.users.lock().unwrap();
        let mut applied = self.applied_sessions.lock().unwrap();
        if self.claimed_before_write.lock().unwrap().remove(session_id) {
            applied.insert(session_id.to_string());
        }
        if applied.contains(session_id) {
            return Ok(None);
        }

        let user = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;
        apply_plan_update(user, update);
        applied.insert(session_id.to_string());
        *self.plan_writes.lock().unwrap() += 1;
        Ok(Some(user.clone()))
    }

    async fn list_expired_plans(&self, now: DateTime<Utc>) -> AppResult<Vec<UserProfile>> {
        let mut expired: Vec<UserProfile> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| has_expired_plan(u, now))
            .cloned()
            .collect();
        expired.sort_by_key(|u| u.plan_expiry);
        Ok(expired)
    }

    async fn clear_expired_plan(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(user_id) {
            Some(user) if has_expired_plan(user, now) && !user.is_leased(now) => {
                user.plan = None;
                user.plan_name = None;
                user.token_limit = 0;
                user.voice_minutes_remaining = 0;
                user.chat_retention_days = Some(DEFAULT_CHAT_RETENTION_DAYS);
                user.plan_updated_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deduct_voice_minutes(&self, user_id: &str, minutes: i32) -> AppResult<Option<i32>> {
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(user_id).map(|user| {
            user.voice_minutes_remaining = (user.voice_minutes_remaining - minutes).max(0);
            user.voice_minutes_remaining
        }))
    }
}
