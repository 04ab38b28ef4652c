//! Duality Player - composition root binary.
//!
//! Restores the last active character (or switches to the id given as the
//! first argument) and prints its record as JSON.

use std::sync::Arc;

use duality_player::application::services::SheetSession;
use duality_player::config::SheetConfig;
use duality_player::infrastructure::platform::create_platform;
use duality_player::infrastructure::TracingStatusPort;

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use duality_domain::EntityId;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duality_player=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Duality Player");

    let config = SheetConfig::from_env();
    let platform = create_platform(config.storage_path.as_deref());
    let mut session = SheetSession::new(
        platform.storage_adapter(),
        platform.time_adapter(),
        &config,
        Arc::new(TracingStatusPort),
    );

    let record = match std::env::args().nth(1) {
        Some(raw) => {
            let id = EntityId::new(&raw).with_context(|| format!("invalid character id {:?}", raw))?;
            Some(session.switch_to(&id))
        }
        None => session.restore(),
    };

    match record {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => {
            let known = session.known_characters();
            tracing::info!(count = known.len(), "No active character");
            for id in known {
                println!("{}", id);
            }
        }
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    tracing::info!("Starting Duality Player");

    let platform = create_platform();
    let mut session = SheetSession::new(
        platform.storage_adapter(),
        platform.time_adapter(),
        &SheetConfig::default(),
        Arc::new(TracingStatusPort),
    );
    if let Some(record) = session.restore() {
        tracing::info!(entity = %record.id, name = %record.name, "Restored character");
    }
}
