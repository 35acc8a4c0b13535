use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

/// Credentials and endpoints for the hosted-checkout gateway.
pub struct PhonePeConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub client_version: String,
    /// Base of the OAuth endpoint (`{auth_url}/v1/oauth/token`).
    pub auth_url: Url,
    /// Base of the checkout API (`{api_url}/checkout/v2/...`).
    pub api_url: Url,
}

pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    pub phonepe: PhonePeConfig,
    /// Where the gateway sends the user after checkout; `session_id` is appended.
    pub payment_redirect_url: Url,
    /// HS256 secret for identity tokens presented to `/deductVoiceMinutes`.
    pub identity_token_secret: SecretString,
    pub retention_sweep_interval_secs: u64,
    pub plan_expiry_check_interval_secs: u64,
    pub subscription_lease_secs: i64,
    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url: String = get_env("DATABASE_URL");
        let db_max_connections: u32 = get_env_default("DB_MAX_CONNECTIONS", 5);
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let phonepe = PhonePeConfig {
            client_id: get_env("PHONEPE_CLIENT_ID"),
            client_secret: SecretString::new(get_env::<String>("PHONEPE_CLIENT_SECRET").into()),
            client_version: get_env_default("PHONEPE_CLIENT_VERSION", String::from("1")),
            auth_url: get_env("PHONEPE_AUTH_URL"),
            api_url: get_env("PHONEPE_API_URL"),
        };

        let payment_redirect_url: Url = get_env("PAYMENT_REDIRECT_URL");
        let identity_token_secret =
            SecretString::new(get_env::<String>("IDENTITY_TOKEN_SECRET").into());

        let retention_sweep_interval_secs: u64 =
            get_env_default("RETENTION_SWEEP_INTERVAL_SECS", 86_400);
        let plan_expiry_check_interval_secs: u64 =
            get_env_default("PLAN_EXPIRY_CHECK_INTERVAL_SECS", 3_600);
        let subscription_lease_secs: i64 = get_env_default("SUBSCRIPTION_LEASE_SECS", 60);
        let log_json = get_env_default("LOG_FORMAT", String::from("pretty")) == "json";

        Self {
            database_url,
            db_max_connections,
            bind_addr,
            cors_origin,
            phonepe,
            payment_redirect_url,
            identity_token_secret,
            retention_sweep_interval_secs,
            plan_expiry_check_interval_secs,
            subscription_lease_secs,
            log_json,
        }
    }
}
