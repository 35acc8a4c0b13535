pub mod chat;
pub mod gateway_state;
pub mod payment_status;
pub mod plan;
pub mod user_profile;
