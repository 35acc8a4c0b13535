use std::sync::Arc;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        payment::PaymentUseCases, retention::RetentionUseCases, subscription::SubscriptionApplier,
        voice_minutes::VoiceMinutesUseCases,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub payment_use_cases: Arc<PaymentUseCases>,
    pub voice_minutes_use_cases: Arc<VoiceMinutesUseCases>,
    pub subscription_applier: Arc<SubscriptionApplier>,
    pub retention_use_cases: Arc<RetentionUseCases>,
}
