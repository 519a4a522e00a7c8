pub mod app_config;
pub mod database;
pub mod events;
pub mod memory_repo;
pub mod rental_repo;

pub use database::DbClient;
pub use events::EventProducer;
pub use memory_repo::InMemoryRentalStore;
pub use rental_repo::PgRentalStore;
