use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::{CheckoutRequest, OrderStatus, PaymentGatewayPort},
        use_cases::subscription::{SubscriptionApplier, UserProfileRepo},
    },
    domain::entities::{
        gateway_state::{GatewayState, PaymentOutcome},
        payment_status::PaymentStatus,
        user_profile::UserProfile,
    },
};

// ============================================================================
// Payment Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub session_id: String,
    pub user_id: String,
    pub plan_id: String,
    pub plan_name: String,
    /// Minor currency units.
    pub amount: i64,
    pub status: PaymentStatus,
    pub gateway_state: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_mode: Option<String>,
    pub paid_amount: Option<i64>,
    /// Set once the plan for a completed payment has been applied.
    pub provisioned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn needs_provisioning(&self) -> bool {
        self.status == PaymentStatus::Completed && self.provisioned_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub session_id: String,
    pub user_id: String,
    pub plan_id: String,
    pub plan_name: String,
    pub amount: i64,
}

/// Gateway fields stamped on a record when it completes.
#[derive(Debug, Clone, Default)]
pub struct CompletedPayment {
    pub gateway_state: String,
    pub transaction_id: Option<String>,
    pub payment_mode: Option<String>,
    pub paid_amount: Option<i64>,
}

impl From<&OrderStatus> for CompletedPayment {
    fn from(order: &OrderStatus) -> Self {
        Self {
            gateway_state: order.state.as_raw().to_string(),
            transaction_id: order.transaction_id.clone(),
            payment_mode: order.payment_mode.clone(),
            paid_amount: order.paid_amount,
        }
    }
}

/// One record per checkout session. Status only moves out of `pending`,
/// and only once.
#[async_trait]
pub trait PaymentRecordRepo: Send + Sync {
    /// Inserts a pending record. Fails with `DuplicateSession` if the
    /// session id is taken.
    async fn create(&self, record: &NewPaymentRecord) -> AppResult<PaymentRecord>;

    async fn get(&self, session_id: &str) -> AppResult<Option<PaymentRecord>>;

    /// `pending -> completed`. Returns whether this call made the transition.
    async fn mark_completed(&self, session_id: &str, payment: &CompletedPayment)
    -> AppResult<bool>;

    /// `pending -> failed`. Returns whether this call made the transition.
    async fn mark_failed(&self, session_id: &str, gateway_state: Option<&str>) -> AppResult<bool>;

    async fn mark_provisioned(&self, session_id: &str) -> AppResult<()>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Debug, Clone)]
pub struct InitiatePaymentInput {
    pub user_id: String,
    pub plan_id: String,
    pub plan_name: String,
    /// Major currency units.
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedPayment {
    pub session_id: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub gateway_state: GatewayState,
    pub payment_status: PaymentOutcome,
    pub user: UserProfile,
}

#[derive(Clone)]
pub struct PaymentUseCases {
    records: Arc<dyn PaymentRecordRepo>,
    users: Arc<dyn UserProfileRepo>,
    gateway: Arc<dyn PaymentGatewayPort>,
    applier: Arc<SubscriptionApplier>,
    redirect_base: Url,
}

impl PaymentUseCases {
    pub fn new(
        records: Arc<dyn PaymentRecordRepo>,
        users: Arc<dyn UserProfileRepo>,
        gateway: Arc<dyn PaymentGatewayPort>,
        applier: Arc<SubscriptionApplier>,
        redirect_base: Url,
    ) -> Self {
        Self {
            records,
            users,
            gateway,
            applier,
            redirect_base,
        }
    }

    /// Opens a pending payment and asks the gateway for a hosted checkout.
    #[instrument(skip(self), fields(user_id = %input.user_id, plan_id = %input.plan_id))]
    pub async fn initiate(&self, input: InitiatePaymentInput) -> AppResult<InitiatedPayment> {
        let amount = validate_initiate(&input)?;
        let session_id = Uuid::new_v4().to_string();

        let token = self.gateway.get_access_token().await?;

        self.records
            .create(&NewPaymentRecord {
                session_id: session_id.clone(),
                user_id: input.user_id.clone(),
                plan_id: input.plan_id.clone(),
                plan_name: input.plan_name.clone(),
                amount,
            })
            .await?;

        let request = CheckoutRequest {
            session_id: session_id.clone(),
            amount_minor: amount,
            description: format!("Payment for {}", input.plan_name),
            redirect_url: self.redirect_url_for(&session_id),
        };

        match self.gateway.initiate_checkout(&token, &request).await {
            Ok(redirect_url) => {
                info!(session_id = %session_id, amount, "Checkout initiated");
                Ok(InitiatedPayment {
                    session_id,
                    redirect_url,
                })
            }
            Err(err) => {
                if let Err(mark_err) = self.records.mark_failed(&session_id, None).await {
                    error!(session_id = %session_id, error = ?mark_err, "Failed to close refused checkout");
                }
                Err(err)
            }
        }
    }

    /// Polls the gateway for `session_id` and settles the payment record.
    ///
    /// A completed payment applies its plan exactly once; reported statuses
    /// never move backwards from a terminal value.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, session_id: &str) -> AppResult<ReconcileOutcome> {
        let session_id = validate_session_id(session_id)?;

        let token = self.gateway.get_access_token().await?;
        let order = self.gateway.get_order_status(&token, session_id).await?;

        let record = self
            .records
            .get(session_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let payment_status = match &order.state {
            GatewayState::Completed => self.settle_completed(&record, &order).await?,
            GatewayState::Failed | GatewayState::Expired => {
                self.settle_failed(&record, &order).await?
            }
            GatewayState::Pending => stored_or(&record, PaymentOutcome::Pending),
            GatewayState::Other(raw) => {
                warn!(gateway_state = %raw, "Unrecognized gateway state");
                stored_or(&record, PaymentOutcome::other(raw))
            }
        };

        let user = self
            .users
            .get(&record.user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(record.user_id.clone()))?;

        Ok(ReconcileOutcome {
            gateway_state: order.state,
            payment_status,
            user,
        })
    }

    async fn settle_completed(
        &self,
        record: &PaymentRecord,
        order: &OrderStatus,
    ) -> AppResult<PaymentOutcome> {
        match record.status {
            PaymentStatus::Pending => {
                let won = self
                    .records
                    .mark_completed(&record.session_id, &CompletedPayment::from(order))
                    .await?;
                if won {
                    info!(session_id = %record.session_id, "Payment completed");
                    self.provision_or_defer(record).await?;
                    return Ok(PaymentOutcome::Completed);
                }
                // A concurrent poll settled it first; report what it stored.
                self.current_status(&record.session_id).await
            }
            PaymentStatus::Completed => {
                if record.needs_provisioning() {
                    warn!(session_id = %record.session_id, "Retrying plan provisioning");
                    self.provision_or_defer(record).await?;
                }
                Ok(PaymentOutcome::Completed)
            }
            PaymentStatus::Failed => {
                warn!(
                    session_id = %record.session_id,
                    "Gateway reports completion for a payment already marked failed"
                );
                Ok(PaymentOutcome::Failed)
            }
        }
    }

    async fn settle_failed(
        &self,
        record: &PaymentRecord,
        order: &OrderStatus,
    ) -> AppResult<PaymentOutcome> {
        if record.status.is_terminal() {
            debug!(
                session_id = %record.session_id,
                status = %record.status,
                "Payment already settled"
            );
            return Ok(record.status.into());
        }
        let won = self
            .records
            .mark_failed(&record.session_id, Some(order.state.as_raw()))
            .await?;
        if won {
            info!(session_id = %record.session_id, gateway_state = %order.state, "Payment failed");
            return Ok(PaymentOutcome::Failed);
        }
        self.current_status(&record.session_id).await
    }

    /// Provisions now, or leaves the record unprovisioned for the next poll
    /// while another writer holds the plan lease.
    async fn provision_or_defer(&self, record: &PaymentRecord) -> AppResult<()> {
        match self.provision(record).await {
            Err(AppError::SubscriptionLocked) => {
                warn!(session_id = %record.session_id, "Plan lease busy, provisioning deferred");
                Ok(())
            }
            other => other,
        }
    }

    async fn provision(&self, record: &PaymentRecord) -> AppResult<()> {
        self.applier
            .apply(
                &record.user_id,
                &record.plan_id,
                &record.plan_name,
                &record.session_id,
            )
            .await?;
        self.records.mark_provisioned(&record.session_id).await
    }

    async fn current_status(&self, session_id: &str) -> AppResult<PaymentOutcome> {
        let record = self
            .records
            .get(session_id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(record.status.into())
    }

    fn redirect_url_for(&self, session_id: &str) -> String {
        let mut url = self.redirect_base.clone();
        url.query_pairs_mut().append_pair("session_id", session_id);
        url.to_string()
    }
}

/// A terminal record keeps reporting its stored status.
fn stored_or(record: &PaymentRecord, fallback: PaymentOutcome) -> PaymentOutcome {
    if record.status.is_terminal() {
        record.status.into()
    } else {
        fallback
    }
}

/// Gateway order ids are at most 63 characters of `[A-Za-z0-9_-]`.
fn validate_session_id(raw: &str) -> AppResult<&str> {
    let session_id = raw.trim();
    if session_id.is_empty() {
        return Err(AppError::InvalidInput("session_id is required".into()));
    }
    let well_formed = session_id.len() <= 63
        && session_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !well_formed {
        return Err(AppError::InvalidInput("session_id is malformed".into()));
    }
    Ok(session_id)
}

/// Returns the amount in minor units.
fn validate_initiate(input: &InitiatePaymentInput) -> AppResult<i64> {
    for (field, value) in [
        ("userId", &input.user_id),
        ("planId", &input.plan_id),
        ("planName", &input.plan_name),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::InvalidInput(format!("{field} is required")));
        }
    }
    if !input.price.is_finite() || input.price <= 0.0 {
        return Err(AppError::InvalidInput("price must be a positive number".into()));
    }
    Ok(to_minor_units(input.price))
}

fn to_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}
