use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::use_cases::subscription::UserProfileRepo,
    domain::entities::{
        chat::{ChatMessage, ChatSession, prune_messages, retention_cutoff_ms},
        user_profile::UserProfile,
    },
};

#[async_trait]
pub trait ChatSessionRepo: Send + Sync {
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<ChatSession>>;

    /// Replaces the whole message array of one session.
    async fn replace_messages(&self, session_id: Uuid, messages: &[ChatMessage]) -> AppResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub users_scanned: usize,
    pub users_failed: usize,
    pub sessions_pruned: usize,
    pub messages_removed: usize,
}

#[derive(Debug, Default)]
struct UserSweep {
    sessions_pruned: usize,
    messages_removed: usize,
}

#[derive(Clone)]
pub struct RetentionUseCases {
    users: Arc<dyn UserProfileRepo>,
    chats: Arc<dyn ChatSessionRepo>,
}

impl RetentionUseCases {
    pub fn new(users: Arc<dyn UserProfileRepo>, chats: Arc<dyn ChatSessionRepo>) -> Self {
        Self { users, chats }
    }

    /// Prunes chat history past each user's retention window.
    ///
    /// Each user is swept on its own: a failure is logged and counted, and
    /// the pass moves on to the next user.
    #[instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let users = self.users.list_all().await?;
        let mut report = SweepReport::default();

        for user in &users {
            report.users_scanned += 1;
            match self.sweep_user(user, now).await {
                Ok(swept) => {
                    report.sessions_pruned += swept.sessions_pruned;
                    report.messages_removed += swept.messages_removed;
                }
                Err(e) => {
                    report.users_failed += 1;
                    error!(user_id = %user.user_id, error = ?e, "Retention sweep failed for user");
                }
            }
        }

        info!(
            users_scanned = report.users_scanned,
            users_failed = report.users_failed,
            sessions_pruned = report.sessions_pruned,
            messages_removed = report.messages_removed,
            "Retention sweep finished"
        );
        Ok(report)
    }

    async fn sweep_user(&self, user: &UserProfile, now: DateTime<Utc>) -> AppResult<UserSweep> {
        let cutoff = retention_cutoff_ms(now, user.effective_retention_days());
        let mut swept = UserSweep::default();

        for session in self.chats.list_for_user(&user.user_id).await? {
            let Some(kept) = prune_messages(&session.messages, cutoff) else {
                continue;
            };
            self.chats.replace_messages(session.id, &kept).await?;

            let removed = session.messages.len() - kept.len();
            debug!(user_id = %user.user_id, session_id = %session.id, removed, "Pruned chat session");
            swept.sessions_pruned += 1;
            swept.messages_removed += removed;
        }

        Ok(swept)
    }
}
