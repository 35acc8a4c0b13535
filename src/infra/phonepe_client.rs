use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        AccessToken, CheckoutRequest, OrderStatus, PaymentGatewayPort,
    },
    domain::entities::gateway_state::GatewayState,
    infra::config::PhonePeConfig,
};

/// PhonePe standard checkout (v2) client.
pub struct PhonePeClient {
    client: Client,
    client_id: String,
    client_secret: SecretString,
    client_version: String,
    auth_url: Url,
    api_url: Url,
}

impl PhonePeClient {
    pub fn new(client: Client, config: &PhonePeConfig) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: SecretString::new(config.client_secret.expose_secret().into()),
            client_version: config.client_version.clone(),
            auth_url: config.auth_url.clone(),
            api_url: config.api_url.clone(),
        }
    }

    /// Appends `segments` to `base`, percent-encoding each one.
    fn endpoint(base: &Url, segments: &[&str]) -> AppResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::Internal(format!("PhonePe base URL cannot carry a path: {base}"))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn auth_header(token: &AccessToken) -> String {
        format!("O-Bearer {}", token.as_str())
    }

    /// Reads the body, logging and returning it verbatim on a non-success status.
    async fn read_success_body(response: reqwest::Response) -> Result<String, (u16, String)> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| (status.as_u16(), format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "PhonePe API error");
            return Err((status.as_u16(), body));
        }
        Ok(body)
    }

    fn parse_body<T: DeserializeOwned>(body: &str) -> AppResult<T> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse PhonePe response");
            AppError::InvalidGatewayResponse(format!("Failed to parse PhonePe response: {e}"))
        })
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayRequest<'a> {
    merchant_order_id: &'a str,
    amount: i64,
    payment_flow: PaymentFlow<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentFlow<'a> {
    #[serde(rename = "type")]
    flow_type: &'static str,
    message: &'a str,
    merchant_urls: MerchantUrls<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MerchantUrls<'a> {
    redirect_url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayResponse {
    redirect_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderStatusResponse {
    state: Option<String>,
    amount: Option<i64>,
    #[serde(default)]
    payment_details: Vec<PaymentDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentDetail {
    payment_mode: Option<String>,
    transaction_id: Option<String>,
    amount: Option<i64>,
    state: Option<String>,
}

impl OrderStatusResponse {
    fn into_order_status(self) -> AppResult<OrderStatus> {
        let raw_state = self.state.filter(|s| !s.is_empty()).ok_or_else(|| {
            AppError::InvalidGatewayResponse("order status response has no state".into())
        })?;

        // Prefer the successful attempt; otherwise the latest one.
        let completed = self
            .payment_details
            .iter()
            .position(|d| d.state.as_deref() == Some("COMPLETED"));
        let detail = match completed {
            Some(idx) => self.payment_details.into_iter().nth(idx),
            None => self.payment_details.into_iter().last(),
        };

        let (payment_mode, transaction_id, detail_amount) = match detail {
            Some(d) => (d.payment_mode, d.transaction_id, d.amount),
            None => (None, None, None),
        };

        Ok(OrderStatus {
            state: GatewayState::parse(&raw_state),
            transaction_id,
            payment_mode,
            paid_amount: detail_amount.or(self.amount),
        })
    }
}

// ============================================================================
// Port implementation
// ============================================================================

#[async_trait]
impl PaymentGatewayPort for PhonePeClient {
    async fn get_access_token(&self) -> AppResult<AccessToken> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_version", self.client_version.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .client
            .post(Self::endpoint(&self.auth_url, &["v1", "oauth", "token"])?)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::GatewayAuth(format!("PhonePe token request failed: {e}")))?;

        let body = Self::read_success_body(response)
            .await
            .map_err(|(status, body)| AppError::GatewayAuth(format!("{status}: {body}")))?;

        let token: TokenResponse = Self::parse_body(&body)?;
        token
            .access_token
            .filter(|t| !t.is_empty())
            .map(AccessToken::new)
            .ok_or_else(|| AppError::GatewayAuth("token response has no access_token".into()))
    }

    async fn initiate_checkout(
        &self,
        token: &AccessToken,
        request: &CheckoutRequest,
    ) -> AppResult<String> {
        let payload = PayRequest {
            merchant_order_id: &request.session_id,
            amount: request.amount_minor,
            payment_flow: PaymentFlow {
                flow_type: "PG_CHECKOUT",
                message: &request.description,
                merchant_urls: MerchantUrls {
                    redirect_url: &request.redirect_url,
                },
            },
        };

        let response = self
            .client
            .post(Self::endpoint(&self.api_url, &["checkout", "v2", "pay"])?)
            .header("Authorization", Self::auth_header(token))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("PhonePe pay request failed: {e}")))?;

        let body = Self::read_success_body(response)
            .await
            .map_err(|(_, body)| AppError::Gateway(body))?;

        let pay: PayResponse = Self::parse_body(&body)?;
        pay.redirect_url
            .filter(|u| !u.is_empty())
            .ok_or(AppError::MissingRedirect)
    }

    async fn get_order_status(
        &self,
        token: &AccessToken,
        session_id: &str,
    ) -> AppResult<OrderStatus> {
        let url = Self::endpoint(
            &self.api_url,
            &["checkout", "v2", "order", session_id, "status"],
        )?;
        let response = self
            .client
            .get(url)
            .header("Authorization", Self::auth_header(token))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("PhonePe status request failed: {e}")))?;

        let body = Self::read_success_body(response)
            .await
            .map_err(|(_, body)| AppError::Gateway(body))?;

        Self::parse_body::<OrderStatusResponse>(&body)?.into_order_status()
    }
}
