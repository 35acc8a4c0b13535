use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::UserProfileRepo,
    domain::entities::{
        plan::{DEFAULT_CHAT_RETENTION_DAYS, PlanUpdate},
        user_profile::UserProfile,
    },
};

const SELECT_COLS: &str = r#"
    user_id, plan, plan_name, plan_purchased_at, plan_updated_at, plan_expiry,
    token_limit, tokens_used, chat_retention_days, voice_minutes_remaining,
    appointments_used, had_subscription_before, lease_until
"#;

fn row_to_profile(row: sqlx::postgres::PgRow) -> UserProfile {
    UserProfile {
        user_id: row.get("user_id"),
        plan: row.get("plan"),
        plan_name: row.get("plan_name"),
        plan_purchased_at: row.get("plan_purchased_at"),
        plan_updated_at: row.get("plan_updated_at"),
        plan_expiry: row.get("plan_expiry"),
        token_limit: row.get("token_limit"),
        tokens_used: row.get("tokens_used"),
        chat_retention_days: row.get("chat_retention_days"),
        voice_minutes_remaining: row.get("voice_minutes_remaining"),
        appointments_used: row.get("appointments_used"),
        had_subscription_before: row.get("had_subscription_before"),
        lease_until: row.get("lease_until"),
    }
}

#[async_trait]
impl UserProfileRepo for PostgresPersistence {
    async fn get(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM user_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_profile))
    }

    async fn list_all(&self) -> AppResult<Vec<UserProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM user_profiles ORDER BY user_id"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    async fn try_acquire_lease(
        &self,
        user_id: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles SET lease_until = $2
            WHERE user_id = $1 AND (lease_until IS NULL OR lease_until <= $3)
            "#,
        )
        .bind(user_id)
        .bind(until)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_lease(&self, user_id: &str) -> AppResult<()> {
        sqlx::query("UPDATE user_profiles SET lease_until = NULL WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn is_session_applied(&self, session_id: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 AS applied FROM applied_plan_sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;

        Ok(row.is_some())
    }

    async fn write_plan(
        &self,
        user_id: &str,
        update: &PlanUpdate,
        session_id: &str,
    ) -> AppResult<Option<UserProfile>> {
        let mut tx = self.pool().begin().await.map_err(AppError::from)?;

        let claimed = sqlx::query(
            r#"
            INSERT INTO applied_plan_sessions (session_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE user_profiles SET
                plan = $2,
                plan_name = $3,
                plan_purchased_at = $4,
                plan_updated_at = $5,
                plan_expiry = $6,
                token_limit = $7,
                tokens_used = 0,
                had_subscription_before = TRUE,
                chat_retention_days = $8,
                voice_minutes_remaining = $9,
                appointments_used = 0,
                lease_until = NULL
            WHERE user_id = $1
            RETURNING {SELECT_COLS}
            "#
        ))
        .bind(user_id)
        .bind(&update.plan)
        .bind(&update.plan_name)
        .bind(update.plan_purchased_at)
        .bind(update.plan_updated_at)
        .bind(update.plan_expiry)
        .bind(update.token_limit)
        .bind(update.chat_retention_days)
        .bind(update.voice_minutes_remaining)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;

        // Dropping `tx` rolls the session claim back.
        let Some(row) = row else {
            return Err(AppError::UserNotFound(user_id.to_string()));
        };

        tx.commit().await.map_err(AppError::from)?;
        Ok(Some(row_to_profile(row)))
    }

    async fn list_expired_plans(&self, now: DateTime<Utc>) -> AppResult<Vec<UserProfile>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLS} FROM user_profiles
            WHERE plan IS NOT NULL AND plan_expiry <= $1
            ORDER BY plan_expiry
            "#
        ))
        .bind(now)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    async fn clear_expired_plan(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles SET
                plan = NULL,
                plan_name = NULL,
                token_limit = 0,
                voice_minutes_remaining = 0,
                chat_retention_days = $3,
                plan_updated_at = $2
            WHERE user_id = $1
              AND plan IS NOT NULL
              AND plan_expiry <= $2
              AND (lease_until IS NULL OR lease_until <= $2)
            "#,
        )
        .bind(user_id)
        .bind(now)
        .bind(DEFAULT_CHAT_RETENTION_DAYS)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn deduct_voice_minutes(&self, user_id: &str, minutes: i32) -> AppResult<Option<i32>> {
        let row = sqlx::query(
            r#"
            UPDATE user_profiles
            SET voice_minutes_remaining = GREATEST(voice_minutes_remaining - $2, 0)
            WHERE user_id = $1
            RETURNING voice_minutes_remaining
            "#,
        )
        .bind(user_id)
        .bind(minutes)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(|r| r.get("voice_minutes_remaining")))
    }
}
