use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    use_cases::payment::{InitiatePaymentInput, InitiatedPayment, ReconcileOutcome},
};

/// Browser clients send the price either as a number or as a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Price {
    Number(f64),
    Text(String),
}

impl Price {
    fn to_f64(&self) -> AppResult<f64> {
        match self {
            Price::Number(n) => Ok(*n),
            Price::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| AppError::InvalidInput("price must be a number".into())),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiatePaymentPayload {
    user_id: Option<String>,
    plan_id: Option<String>,
    plan_name: Option<String>,
    price: Option<Price>,
}

impl InitiatePaymentPayload {
    fn into_input(self) -> AppResult<InitiatePaymentInput> {
        let missing = |field: &str| AppError::InvalidInput(format!("{field} is required"));
        Ok(InitiatePaymentInput {
            user_id: self.user_id.ok_or_else(|| missing("userId"))?,
            plan_id: self.plan_id.ok_or_else(|| missing("planId"))?,
            plan_name: self.plan_name.ok_or_else(|| missing("planName"))?,
            price: self.price.ok_or_else(|| missing("price"))?.to_f64()?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitiatePaymentResponse {
    success: bool,
    #[serde(flatten)]
    payment: InitiatedPayment,
}

#[derive(Deserialize)]
struct VerifyQuery {
    session_id: Option<String>,
}

#[derive(Serialize)]
struct VerifyResponse {
    success: bool,
    #[serde(flatten)]
    outcome: ReconcileOutcome,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/initiatePayment", post(initiate_payment))
        .route("/verifyPaymentStatus", get(verify_payment_status))
}

async fn initiate_payment(
    State(app_state): State<AppState>,
    payload: Result<Json<InitiatePaymentPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let payment = app_state
        .payment_use_cases
        .initiate(payload.into_input()?)
        .await?;

    Ok(Json(InitiatePaymentResponse {
        success: true,
        payment,
    }))
}

async fn verify_payment_status(
    State(app_state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<impl IntoResponse> {
    let session_id = query
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("session_id is required".into()))?;

    let outcome = app_state.payment_use_cases.reconcile(&session_id).await?;

    Ok(Json(VerifyResponse {
        success: true,
        outcome,
    }))
}
