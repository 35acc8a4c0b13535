use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{app_error::AppResult, domain::entities::gateway_state::GatewayState};

// ============================================================================
// Port Types
// ============================================================================

/// Short-lived bearer token issued by the gateway's OAuth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Caller-generated session id, used as the gateway's merchant order id.
    pub session_id: String,
    pub amount_minor: i64,
    pub description: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatus {
    pub state: GatewayState,
    pub transaction_id: Option<String>,
    pub payment_mode: Option<String>,
    pub paid_amount: Option<i64>,
}

// ============================================================================
// Payment Gateway Port
// ============================================================================

/// Hosted-checkout payment gateway. Every call is a single attempt.
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    /// Client-credentials grant. Fails with `GatewayAuth` on a non-success status.
    async fn get_access_token(&self) -> AppResult<AccessToken>;

    /// Returns the gateway-hosted checkout URL the user is sent to.
    async fn initiate_checkout(
        &self,
        token: &AccessToken,
        request: &CheckoutRequest,
    ) -> AppResult<String>;

    async fn get_order_status(
        &self,
        token: &AccessToken,
        session_id: &str,
    ) -> AppResult<OrderStatus>;
}
