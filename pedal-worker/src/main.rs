use anyhow::Context;
use pedal_store::app_config::Config;
use pedal_store::EventProducer;
use pedal_worker::{bootstrap, worker};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pedal_worker=debug,pedal_core=debug,pedal_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting pedal worker with {:?} storage", config.storage.backend);

    let store = bootstrap::build_store(&config)
        .await
        .context("Failed to initialize storage")?;
    let router = bootstrap::build_router(&config, store);

    let producer = EventProducer::new(&config.kafka.brokers)
        .context("Failed to create Kafka producer")?;

    worker::start_rental_worker(&config.kafka, router, producer)
        .await
        .context("Rental worker stopped")?;

    Ok(())
}
