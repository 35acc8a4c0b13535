use serde::{Serialize, Serializer};

use crate::domain::entities::payment_status::PaymentStatus;

/// Order state as reported by the payment gateway.
///
/// Unrecognized states are kept verbatim in `Other` so new upstream values
/// flow through without code changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayState {
    Pending,
    Completed,
    Failed,
    Expired,
    Other(String),
}

impl GatewayState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PENDING" => GatewayState::Pending,
            "COMPLETED" => GatewayState::Completed,
            "FAILED" => GatewayState::Failed,
            "EXPIRED" => GatewayState::Expired,
            other => GatewayState::Other(other.to_string()),
        }
    }

    /// The gateway's own spelling of this state.
    pub fn as_raw(&self) -> &str {
        match self {
            GatewayState::Pending => "PENDING",
            GatewayState::Completed => "COMPLETED",
            GatewayState::Failed => "FAILED",
            GatewayState::Expired => "EXPIRED",
            GatewayState::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_raw())
    }
}

impl Serialize for GatewayState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_raw())
    }
}

/// Payment status reported back to the polling client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Pending,
    Completed,
    Failed,
    /// Unknown gateway state, reported as its lowercase form.
    Other(String),
}

impl PaymentOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentOutcome::Pending => "pending",
            PaymentOutcome::Completed => "completed",
            PaymentOutcome::Failed => "failed",
            PaymentOutcome::Other(raw) => raw,
        }
    }

    pub fn other(raw: &str) -> Self {
        PaymentOutcome::Other(raw.to_lowercase())
    }
}

impl From<PaymentStatus> for PaymentOutcome {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => PaymentOutcome::Pending,
            PaymentStatus::Completed => PaymentOutcome::Completed,
            PaymentStatus::Failed => PaymentOutcome::Failed,
        }
    }
}

impl std::fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
