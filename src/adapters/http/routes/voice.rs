use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

#[derive(Deserialize)]
struct DeductQuery {
    token: Option<String>,
    minutes: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeductResponse {
    success: bool,
    remaining_minutes: i32,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/deductVoiceMinutes", get(deduct_voice_minutes))
}

async fn deduct_voice_minutes(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DeductQuery>,
) -> AppResult<impl IntoResponse> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&headers))
        .ok_or(AppError::InvalidCredentials)?;
    let user_id = jwt::user_id_from_token(&token, &app_state.config.identity_token_secret)?;

    let minutes = parse_minutes(query.minutes.as_deref())?;

    let remaining_minutes = app_state
        .voice_minutes_use_cases
        .deduct(&user_id, minutes)
        .await?;

    Ok(Json(DeductResponse {
        success: true,
        remaining_minutes,
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_minutes(raw: Option<&str>) -> AppResult<i32> {
    let invalid = || AppError::InvalidInput("minutes must be a positive integer".into());
    let minutes: i32 = raw.ok_or_else(invalid)?.trim().parse().map_err(|_| invalid())?;
    if minutes <= 0 {
        return Err(invalid());
    }
    Ok(minutes)
}
