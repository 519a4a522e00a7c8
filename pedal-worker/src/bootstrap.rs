use pedal_core::{Bike, BikeCode, RentalStateMachine, RentalStore, RequestRouter};
use pedal_store::app_config::{Config, StorageBackend};
use pedal_store::{DbClient, InMemoryRentalStore, PgRentalStore};
use std::sync::Arc;
use tracing::{info, warn};

use crate::WorkerError;

/// Connect the configured backend. Postgres runs migrations first when enabled;
/// the memory backend is seeded with locked bikes.
pub async fn build_store(config: &Config) -> Result<Arc<dyn RentalStore>, WorkerError> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database, config.rental.storage_timeout()).await?;
            if config.database.run_migrations {
                db.migrate().await?;
            }
            info!("Connected to PostgreSQL");
            Ok(Arc::new(PgRentalStore::new(db.pool.clone())))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, state is lost on restart");
            let store = InMemoryRentalStore::new();
            for code in &config.storage.seed_bikes {
                store.provision_bike(Bike::new(BikeCode(*code), 0))?;
            }
            Ok(Arc::new(store))
        }
    }
}

pub fn build_router(config: &Config, store: Arc<dyn RentalStore>) -> RequestRouter {
    let machine = RentalStateMachine::new(store)
        .with_storage_timeout(config.rental.storage_timeout());
    RequestRouter::new(Arc::new(machine))
}
