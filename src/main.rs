use dotenvy::dotenv;
use tracing::info;

use consult_billing::infra::{
    app::create_app,
    config::AppConfig,
    plan_expiry_worker::run_plan_expiry_loop,
    retention_sweeper::run_retention_sweep_loop,
    setup::{init_app_state, init_tracing},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env();
    init_tracing(config.log_json);

    let app_state = init_app_state(config).await?;

    let bind_addr = app_state.config.bind_addr;

    let retention = app_state.retention_use_cases.clone();
    let sweep_every = app_state.config.retention_sweep_interval_secs;
    tokio::spawn(async move {
        run_retention_sweep_loop(retention, sweep_every).await;
    });

    let applier = app_state.subscription_applier.clone();
    let expiry_every = app_state.config.plan_expiry_check_interval_secs;
    tokio::spawn(async move {
        run_plan_expiry_loop(applier, expiry_every).await;
    });

    let app = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
