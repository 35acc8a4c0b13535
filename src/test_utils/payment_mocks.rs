//! In-memory payment records and a scripted stand-in for the hosted-checkout
//! gateway.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::{AccessToken, CheckoutRequest, OrderStatus, PaymentGatewayPort},
        use_cases::payment::{CompletedPayment, NewPaymentRecord, PaymentRecord, PaymentRecordRepo},
    },
    domain::entities::{gateway_state::GatewayState, payment_status::PaymentStatus},
};

// ============================================================================
// InMemoryPaymentRecordRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPaymentRecordRepo {
    pub records: Mutex<HashMap<String, PaymentRecord>>,
    provisioning_failures: Mutex<HashSet<String>>,
}

impl InMemoryPaymentRecordRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<PaymentRecord>) -> Self {
        let map: HashMap<String, PaymentRecord> = records
            .into_iter()
            .map(|r| (r.session_id.clone(), r))
            .collect();
        Self {
            records: Mutex::new(map),
            ..Self::default()
        }
    }

    /// The next `mark_provisioned` for `session_id` fails with a database error.
    pub fn fail_provisioning_once(&self, session_id: &str) {
        self.provisioning_failures
            .lock()
            .unwrap()
            .insert(session_id.to_string());
    }

    pub fn record(&self, session_id: &str) -> Option<PaymentRecord> {
        self.records.lock().unwrap().get(session_id).cloned()
    }
}

#[async_trait]
impl PaymentRecordRepo for InMemoryPaymentRecordRepo {
    async fn create(&self, record: &NewPaymentRecord) -> AppResult<PaymentRecord> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.session_id) {
            return Err(AppError::DuplicateSession);
        }

        let now = Utc::now();
        let created = PaymentRecord {
            session_id: record.session_id.clone(),
            user_id: record.user_id.clone(),
            plan_id: record.plan_id.clone(),
            plan_name: record.plan_name.clone(),
            amount: record.amount,
            status: PaymentStatus::Pending,
            gateway_state: None,
            transaction_id: None,
            payment_mode: None,
            paid_amount: None,
            provisioned_at: None,
            created_at: now,
            updated_at: now,
        };
        records.insert(created.session_id.clone(), created.clone());
        Ok(created)
    }

    async fn get(&self, session_id: &str) -> AppResult<Option<PaymentRecord>> {
        Ok(self.record(session_id))
    }

    async fn mark_completed(
        &self,
        session_id: &str,
        payment: &CompletedPayment,
    ) -> AppResult<bool> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(session_id) {
            Some(record) if record.status == PaymentStatus::Pending => {
                record.status = PaymentStatus::Completed;
                record.gateway_state = Some(payment.gateway_state.clone());
                record.transaction_id = payment.transaction_id.clone();
                record.payment_mode = payment.payment_mode.clone();
                record.paid_amount = payment.paid_amount;
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, session_id: &str, gateway_state: Option<&str>) -> AppResult<bool> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(session_id) {
            Some(record) if record.status == PaymentStatus::Pending => {
                record.status = PaymentStatus::Failed;
                if let Some(state) = gateway_state {
                    record.gateway_state = Some(state.to_string());
                }
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_provisioned(&self, session_id: &str) -> AppResult<()> {
        if self.provisioning_failures.lock().unwrap().remove(session_id) {
            return Err(AppError::Database("connection reset".into()));
        }
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(session_id).ok_or(AppError::NotFound)?;
        record.provisioned_at = Some(Utc::now());
        Ok(())
    }
}

// ============================================================================
// ScriptedPaymentGateway
// ============================================================================

const CHECKOUT_URL: &str = "https://gateway.test/checkout/pay";

/// Gateway double whose answers are set by the test. Starts out healthy with
/// every order `PENDING`.
pub struct ScriptedPaymentGateway {
    state: Mutex<Option<String>>,
    auth_fails: Mutex<bool>,
    checkout_failure: Mutex<Option<String>>,
    last_checkout: Mutex<Option<CheckoutRequest>>,
    status_calls: Mutex<usize>,
}

impl Default for ScriptedPaymentGateway {
    fn default() -> Self {
        Self {
            state: Mutex::new(Some("PENDING".to_string())),
            auth_fails: Mutex::new(false),
            checkout_failure: Mutex::new(None),
            last_checkout: Mutex::new(None),
            status_calls: Mutex::new(0),
        }
    }
}

impl ScriptedPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw state reported for every order from now on.
    pub fn set_state(&self, state: &str) {
        *self.state.lock().unwrap() = Some(state.to_string());
    }

    /// Makes status responses come back without a state.
    pub fn clear_state(&self) {
        *self.state.lock().unwrap() = None;
    }

    pub fn fail_auth(&self) {
        *self.auth_fails.lock().unwrap() = true;
    }

    /// Refuses checkouts with `payload` as the upstream error body.
    pub fn fail_checkout(&self, payload: &str) {
        *self.checkout_failure.lock().unwrap() = Some(payload.to_string());
    }

    pub fn last_checkout(&self) -> Option<CheckoutRequest> {
        self.last_checkout.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }

    pub fn checkout_url(&self) -> String {
        CHECKOUT_URL.to_string()
    }
}

#[async_trait]
impl PaymentGatewayPort for ScriptedPaymentGateway {
    async fn get_access_token(&self) -> AppResult<AccessToken> {
        if *self.auth_fails.lock().unwrap() {
            return Err(AppError::GatewayAuth("401: invalid client".into()));
        }
        Ok(AccessToken::new("test-access-token"))
    }

    async fn initiate_checkout(
        &self,
        _token: &AccessToken,
        request: &CheckoutRequest,
    ) -> AppResult<String> {
        *self.last_checkout.lock().unwrap() = Some(request.clone());

        if let Some(payload) = self.checkout_failure.lock().unwrap().clone() {
            return Err(AppError::Gateway(payload));
        }
        Ok(self.checkout_url())
    }

    async fn get_order_status(
        &self,
        _token: &AccessToken,
        session_id: &str,
    ) -> AppResult<OrderStatus> {
        *self.status_calls.lock().unwrap() += 1;
        let raw = self.state.lock().unwrap().clone().ok_or_else(|| {
            AppError::InvalidGatewayResponse("order status response has no state".into())
        })?;

        Ok(OrderStatus {
            state: GatewayState::parse(&raw),
            transaction_id: Some(format!("T-{session_id}")),
            payment_mode: Some("UPI_INTENT".to_string()),
            paid_amount: None,
        })
    }
}
