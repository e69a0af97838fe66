use actix_web::web;
use anyhow::Result;

use infodex_core::config::EngineConfig;
use infodex_server::{bind, telemetry, AppState};

const CONFIG_FILE: &str = "engine.json";

#[actix_web::main]
async fn main() -> Result<()> {
    let loaded = EngineConfig::load(CONFIG_FILE);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => EngineConfig::default(),
    };

    let guard = telemetry::init_telemetry(&config.log_dir)?;
    if let Err(e) = &loaded {
        tracing::warn!("Failed to load {}, using defaults: {}", CONFIG_FILE, e);
    }

    tracing::info!("infodex engine starting");
    tracing::info!("  Cluster name: {}", config.cluster_name);
    tracing::info!("  Port: {}", config.port);
    tracing::info!("  Workers: {}", config.workers);
    tracing::info!("  Log directory: {}", config.log_dir);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let workers = config.workers;
    let state = web::Data::new(AppState::new(config));
    let (server, local) = bind(state, &bind_addr, workers)?;

    tracing::info!("Engine listening on {}, press Ctrl+C to stop", local);
    server.await?;

    telemetry::shutdown_telemetry();
    drop(guard);

    Ok(())
}
