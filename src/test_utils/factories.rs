//! Test data factories.
//!
//! Each factory returns a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    application::use_cases::payment::PaymentRecord,
    domain::entities::{
        chat::{ChatMessage, ChatSession},
        payment_status::PaymentStatus,
        user_profile::UserProfile,
    },
};

/// A free-tier user with no plan history.
pub fn create_test_user(user_id: &str, overrides: impl FnOnce(&mut UserProfile)) -> UserProfile {
    let mut user = UserProfile {
        user_id: user_id.to_string(),
        plan: None,
        plan_name: None,
        plan_purchased_at: None,
        plan_updated_at: None,
        plan_expiry: None,
        token_limit: 0,
        tokens_used: 0,
        chat_retention_days: Some(10),
        voice_minutes_remaining: 0,
        appointments_used: 0,
        had_subscription_before: false,
        lease_until: None,
    };
    overrides(&mut user);
    user
}

/// A pending payment for the basic plan.
pub fn create_test_payment_record(
    session_id: &str,
    user_id: &str,
    overrides: impl FnOnce(&mut PaymentRecord),
) -> PaymentRecord {
    let mut record = PaymentRecord {
        session_id: session_id.to_string(),
        user_id: user_id.to_string(),
        plan_id: "basic".to_string(),
        plan_name: "Basic".to_string(),
        amount: 49_900,
        status: PaymentStatus::Pending,
        gateway_state: None,
        transaction_id: None,
        payment_mode: None,
        paid_amount: None,
        provisioned_at: None,
        created_at: test_datetime(),
        updated_at: test_datetime(),
    };
    overrides(&mut record);
    record
}

pub fn create_test_message(timestamp_ms: i64) -> ChatMessage {
    let mut extra = serde_json::Map::new();
    extra.insert("role".to_string(), "user".into());
    extra.insert(
        "content".to_string(),
        format!("message at {timestamp_ms}").into(),
    );
    ChatMessage {
        timestamp: Some(timestamp_ms),
        extra,
    }
}

pub fn create_test_chat_session(user_id: &str, messages: Vec<ChatMessage>) -> ChatSession {
    ChatSession {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        messages,
    }
}

fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}
