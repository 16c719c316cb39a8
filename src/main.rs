use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vehicle_sandbox::config::SandboxConfig;
use vehicle_sandbox::net::start_websocket_server;
use vehicle_sandbox::profile::TuningTable;
use vehicle_sandbox::sandbox::Sandbox;
use vehicle_sandbox::state::SharedState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = SandboxConfig::from_env()?;
    init_tracing(&config.log_level);

    info!("🚀 Starting vehicle sandbox");

    let table = match &config.tuning_file {
        Some(path) => {
            info!(path = %path.display(), "loading tuning table");
            TuningTable::load(path)?
        }
        None => TuningTable::builtin(),
    };
    info!(brands = ?table.brands().collect::<Vec<_>>(), "tuning table ready");

    let mut sandbox = Sandbox::new(&config, &table)?;
    let state = Arc::new(Mutex::new(SharedState::new()));

    // Start WebSocket server
    let server_state = Arc::clone(&state);
    let addr = config.addr;
    tokio::spawn(async move {
        if let Err(err) = start_websocket_server(addr, server_state).await {
            error!(%err, "websocket server stopped");
        }
    });

    // Fixed timestep
    let mut ticker = interval(Duration::from_secs_f64(1.0 / f64::from(config.tick_rate)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }

        let mut shared = state.lock().await;
        let held = shared.held_signals();
        sandbox.tick(held);

        // Advance tick + broadcast snapshot
        shared.tick += 1;
        let snapshot = sandbox.snapshot(shared.tick);
        shared.broadcast_snapshot(&snapshot);
    }

    info!("Sandbox shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
