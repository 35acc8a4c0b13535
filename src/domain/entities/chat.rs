use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// A stored chat message. Only the timestamp matters to retention; role,
/// content, attachments and anything else ride along in `extra` and are
/// written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Epoch milliseconds. Messages without one are never pruned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub messages: Vec<ChatMessage>,
}

/// Oldest timestamp (epoch ms) that survives a sweep.
pub fn retention_cutoff_ms(now: DateTime<Utc>, retention_days: i32) -> i64 {
    now.timestamp_millis() - i64::from(retention_days) * MILLIS_PER_DAY
}

/// Drops messages older than `cutoff_ms`. Returns `None` when nothing was
/// dropped so callers can skip the write.
pub fn prune_messages(messages: &[ChatMessage], cutoff_ms: i64) -> Option<Vec<ChatMessage>> {
    let kept: Vec<ChatMessage> = messages
        .iter()
        .filter(|m| m.timestamp.is_none_or(|ts| ts >= cutoff_ms))
        .cloned()
        .collect();

    if kept.len() == messages.len() {
        None
    } else {
        Some(kept)
    }
}
