use async_trait::async_trait;

use crate::accountant::LedgerEntry;
use crate::bike::{Bike, BikeCode};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Bike {0} already exists")]
    Duplicate(BikeCode),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreError::Backend(err.into())
    }
}

/// Entry point to the persisted bike and ledger state.
#[async_trait]
pub trait RentalStore: Send + Sync {
    /// Open a transaction scope. Writes become visible only on `commit`.
    async fn begin(&self) -> Result<Box<dyn RentalTx>, StoreError>;

    /// Every ledger entry owned by `identity`, in insertion order.
    async fn list_travel_records(&self, identity: &str) -> Result<Vec<LedgerEntry>, StoreError>;
}

/// A single transaction against the store.
///
/// `fetch_bike_for_update` takes an exclusive lock on the bike row that is held
/// until the transaction commits, rolls back or is dropped. Dropping an
/// uncommitted transaction discards its writes.
#[async_trait]
pub trait RentalTx: Send {
    async fn fetch_bike_for_update(&mut self, code: BikeCode) -> Result<Option<Bike>, StoreError>;

    async fn write_bike_state(&mut self, bike: &Bike) -> Result<(), StoreError>;

    async fn append_travel_record(
        &mut self,
        identity: &str,
        entry: &LedgerEntry,
    ) -> Result<(), StoreError>;

    /// Storage clock, epoch seconds.
    async fn now(&mut self) -> Result<i64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
