use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::retention::ChatSessionRepo,
    domain::entities::chat::{ChatMessage, ChatSession},
};

/// In-memory chat store. Sessions keep insertion order.
#[derive(Default)]
pub struct InMemoryChatSessionRepo {
    pub sessions: Mutex<Vec<ChatSession>>,
    writes: Mutex<usize>,
    failing_users: Mutex<HashSet<String>>,
}

impl InMemoryChatSessionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: Vec<ChatSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions),
            ..Self::default()
        }
    }

    pub fn session(&self, id: Uuid) -> Option<ChatSession> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// Number of `replace_messages` calls that went through.
    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    /// Every read or write touching this user's sessions fails.
    pub fn fail_for_user(&self, user_id: &str) {
        self.failing_users
            .lock()
            .unwrap()
            .insert(user_id.to_string());
    }

    fn check_user(&self, user_id: &str) -> AppResult<()> {
        if self.failing_users.lock().unwrap().contains(user_id) {
            return Err(AppError::Database(format!(
                "chat sessions unavailable for {user_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatSessionRepo for InMemoryChatSessionRepo {
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<ChatSession>> {
        self.check_user(user_id)?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn replace_messages(&self, session_id: Uuid, messages: &[ChatMessage]) -> AppResult<()> {
        let owner = self
            .session(session_id)
            .map(|s| s.user_id)
            .ok_or(AppError::NotFound)?;
        self.check_user(&owner)?;

        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.iter_mut().find(|s| s.id == session_id) {
            session.messages = messages.to_vec();
        }
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}
