use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Payment session already exists")]
    DuplicateSession,

    #[error("Subscription update already in progress for this user")]
    SubscriptionLocked,

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Payment gateway authentication failed: {0}")]
    GatewayAuth(String),

    /// Upstream payload is passed through verbatim for diagnostics.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Invalid payment gateway response: {0}")]
    InvalidGatewayResponse(String),

    #[error("Payment gateway did not return a redirect URL")]
    MissingRedirect,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidCredentials,
    InvalidInput,
    NotFound,
    DuplicateSession,
    SubscriptionLocked,
    UserNotFound,
    GatewayAuthError,
    GatewayError,
    InvalidGatewayResponse,
    MissingRedirect,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DuplicateSession => "DUPLICATE_SESSION",
            ErrorCode::SubscriptionLocked => "SUBSCRIPTION_LOCKED",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::GatewayAuthError => "GATEWAY_AUTH_ERROR",
            ErrorCode::GatewayError => "GATEWAY_ERROR",
            ErrorCode::InvalidGatewayResponse => "INVALID_GATEWAY_RESPONSE",
            ErrorCode::MissingRedirect => "MISSING_REDIRECT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
