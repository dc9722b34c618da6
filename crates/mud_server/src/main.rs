//! Ember MUD - Headless Host

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mud_server::{GameLoop, ServerConfig};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Ember MUD engine host");

    let config = match std::env::args().nth(1) {
        Some(path) => match ServerConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{e}");
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    let game = match GameLoop::from_config(config) {
        Ok(game) => game,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };
    let engine = game.run(shutdown).await;
    tracing::info!(pulses = engine.pulse_count(), state_hash = engine.state_hash(), "Host stopped");
}
