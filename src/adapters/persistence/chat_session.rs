use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::retention::ChatSessionRepo,
    domain::entities::chat::{ChatMessage, ChatSession},
};

/// Unlike most JSON columns, a malformed message array is an error: the
/// sweeper rewrites the array, so guessing a default would drop history.
fn parse_messages(session_id: Uuid, json: serde_json::Value) -> AppResult<Vec<ChatMessage>> {
    if json.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(json).map_err(|e| {
        tracing::warn!(session_id = %session_id, error = %e, "Unreadable chat messages");
        AppError::Internal(format!("Chat session {session_id} has malformed messages"))
    })
}

#[async_trait]
impl ChatSessionRepo for PostgresPersistence {
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<ChatSession>> {
        let rows = sqlx::query(
            "SELECT id, user_id, messages FROM chat_sessions WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        rows.into_iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                Ok(ChatSession {
                    id,
                    user_id: row.get("user_id"),
                    messages: parse_messages(id, row.get("messages"))?,
                })
            })
            .collect()
    }

    async fn replace_messages(&self, session_id: Uuid, messages: &[ChatMessage]) -> AppResult<()> {
        sqlx::query("UPDATE chat_sessions SET messages = $2, updated_at = NOW() WHERE id = $1")
            .bind(session_id)
            .bind(sqlx::types::Json(messages))
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
