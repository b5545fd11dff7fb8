use anyhow::Result;
use axum::Router;
use hvac_energy_advisor::{api, config::Config, controller, telemetry};
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cfg = Config::load()?;
    init_tracing(&cfg.logging);

    let app_state = controller::AppState::new(cfg.clone())?;
    if !app_state.advisor.is_ready() {
        warn!(
            dir = %cfg.models.dir.display(),
            "model artifacts incomplete; the dashboard will report what is missing"
        );
    }

    #[allow(unused_mut)]
    let mut app: Router = api::router(app_state, &cfg);

    #[cfg(feature = "metrics")]
    {
        app = api::with_metrics(app);
    }

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!(
            "Server binding to 0.0.0.0 - the dashboard will be reachable from the network \
            and has no authentication."
        );
    }

    info!(%addr, "starting HVAC energy advisor");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
