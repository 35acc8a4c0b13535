use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::app_error::{AppError, AppResult};
use secrecy::ExposeSecret;

/// Identity token claims. `sub` carries the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn verify(token: &str, secret: &secrecy::SecretString) -> AppResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Identity token rejected");
        AppError::InvalidCredentials
    })
}

/// Verifies the token and returns the user id it was issued for.
pub fn user_id_from_token(token: &str, secret: &secrecy::SecretString) -> AppResult<String> {
    let claims = verify(token, secret)?;
    if claims.sub.trim().is_empty() {
        return Err(AppError::InvalidCredentials);
    }
    Ok(claims.sub)
}

#[cfg(test)]
pub(crate) fn issue_for_tests(user_id: &str, secret: &secrecy::SecretString, ttl_secs: i64) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .unwrap()
}
