use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, ErrorCode::InvalidCredentials)
            }
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidInput),
            AppError::NotFound => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::DuplicateSession => (StatusCode::CONFLICT, ErrorCode::DuplicateSession),
            AppError::SubscriptionLocked => (StatusCode::CONFLICT, ErrorCode::SubscriptionLocked),
            // The record exists but its user does not: a data problem, not a bad request.
            AppError::UserNotFound(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::UserNotFound),
            AppError::GatewayAuth(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::GatewayAuthError)
            }
            AppError::Gateway(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::GatewayError),
            AppError::InvalidGatewayResponse(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InvalidGatewayResponse,
            ),
            AppError::MissingRedirect => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::MissingRedirect)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        let (status, code) = self.status_and_code();
        error_resp(status, code, self.to_string())
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: String) -> Response {
    let body = serde_json::json!({
        "success": false,
        "error": message,
        "code": code.as_str(),
    });
    (status, Json(body)).into_response()
}
