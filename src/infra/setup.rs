use crate::{
    adapters::http::app_state::AppState,
    infra::{
        config::AppConfig, http_client::build_client, phonepe_client::PhonePeClient,
        postgres_persistence,
    },
    use_cases::{
        payment::{PaymentRecordRepo, PaymentUseCases},
        retention::{ChatSessionRepo, RetentionUseCases},
        subscription::{SubscriptionApplier, UserProfileRepo},
        voice_minutes::VoiceMinutesUseCases,
    },
};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let postgres_arc =
        Arc::new(postgres_persistence(&config.database_url, config.db_max_connections).await?);

    let user_repo_arc = postgres_arc.clone() as Arc<dyn UserProfileRepo>;
    let record_repo_arc = postgres_arc.clone() as Arc<dyn PaymentRecordRepo>;
    let chat_repo_arc = postgres_arc.clone() as Arc<dyn ChatSessionRepo>;

    let gateway = Arc::new(PhonePeClient::new(build_client()?, &config.phonepe));

    let subscription_applier = Arc::new(SubscriptionApplier::new(
        user_repo_arc.clone(),
        chrono::Duration::seconds(config.subscription_lease_secs),
    ));

    let payment_use_cases = PaymentUseCases::new(
        record_repo_arc,
        user_repo_arc.clone(),
        gateway,
        subscription_applier.clone(),
        config.payment_redirect_url.clone(),
    );

    let voice_minutes_use_cases = VoiceMinutesUseCases::new(user_repo_arc.clone());
    let retention_use_cases = RetentionUseCases::new(user_repo_arc, chat_repo_arc);

    Ok(AppState {
        config: Arc::new(config),
        payment_use_cases: Arc::new(payment_use_cases),
        voice_minutes_use_cases: Arc::new(voice_minutes_use_cases),
        subscription_applier,
        retention_use_cases: Arc::new(retention_use_cases),
    })
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "consult_billing=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_level(true).pretty())
            .try_init()
            .ok();
    }
}
