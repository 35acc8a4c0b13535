use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::subscription::UserProfileRepo,
};

#[derive(Clone)]
pub struct VoiceMinutesUseCases {
    users: Arc<dyn UserProfileRepo>,
}

impl VoiceMinutesUseCases {
    pub fn new(users: Arc<dyn UserProfileRepo>) -> Self {
        Self { users }
    }

    /// Deducts `minutes` from the user's balance, never going below zero.
    /// Returns the remaining balance.
    #[instrument(skip(self))]
    pub async fn deduct(&self, user_id: &str, minutes: i32) -> AppResult<i32> {
        if minutes <= 0 {
            return Err(AppError::InvalidInput(
                "minutes must be a positive integer".into(),
            ));
        }

        let remaining = self
            .users
            .deduct_voice_minutes(user_id, minutes)
            .await?
            .ok_or(AppError::NotFound)?;

        info!(remaining, "Voice minutes deducted");
        Ok(remaining)
    }
}
