pub mod bootstrap;
pub mod worker;

use pedal_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
