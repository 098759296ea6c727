//! Pollhub entry point.
//!
//! Loads configuration, installs logging, opens the database, applies
//! pending migrations and wires the poll engine.

use std::sync::Arc;

use pollhub_common::{config::LoggingConfig, Config};
use pollhub_core::Engine;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging);

    info!("Starting pollhub...");

    let db = pollhub_db::init(&config.database).await?;
    let applied = pollhub_db::migrate(&db).await?;
    info!(applied, "Schema up to date");

    let engine = Engine::with_db_recorder(Arc::new(db), &config.engine);
    let recent = engine.latest_activity(1).await?;
    info!(
        strict_question_lock = config.engine.strict_question_lock,
        last_activity = ?recent.first().map(|a| a.created_at.to_rfc3339()),
        "Poll engine ready"
    );

    Ok(())
}
