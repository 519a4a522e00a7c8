use async_trait::async_trait;
use pedal_core::repository::{RentalStore, RentalTx, StoreError};
use pedal_core::{Bike, BikeCode, Clock, LedgerEntry, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use tracing::info;

type BikeCell = Arc<RowLock<Bike>>;

struct Tables {
    // Map lock only guards lookups; transitions hold the per-bike RowLock.
    bikes: Mutex<HashMap<BikeCode, BikeCell>>,
    ledger: Mutex<HashMap<String, Vec<LedgerEntry>>>,
    clock: Arc<dyn Clock>,
}

fn poisoned(what: &str) -> StoreError {
    StoreError::backend(format!("{} lock poisoned", what))
}

/// Process-local store with the same transaction semantics as PostgreSQL:
/// one row lock per bike, writes staged until commit.
#[derive(Clone)]
pub struct InMemoryRentalStore {
    tables: Arc<Tables>,
}

impl InMemoryRentalStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Tables {
                bikes: Mutex::new(HashMap::new()),
                ledger: Mutex::new(HashMap::new()),
                clock,
            }),
        }
    }

    /// Register a bike out-of-band. Codes are unique.
    pub fn provision_bike(&self, bike: Bike) -> Result<(), StoreError> {
        let mut bikes = self.tables.bikes.lock().map_err(|_| poisoned("bike table"))?;
        if bikes.contains_key(&bike.code) {
            return Err(StoreError::Duplicate(bike.code));
        }
        info!(bike = %bike.code, "provisioned bike");
        bikes.insert(bike.code, Arc::new(RowLock::new(bike)));
        Ok(())
    }

    /// Committed state of a bike. Waits for any in-flight transition on it.
    pub async fn get_bike(&self, code: BikeCode) -> Result<Option<Bike>, StoreError> {
        let Some(cell) = self.cell(code)? else {
            return Ok(None);
        };
        let bike = cell.lock().await.clone();
        Ok(Some(bike))
    }

    fn cell(&self, code: BikeCode) -> Result<Option<BikeCell>, StoreError> {
        let bikes = self.tables.bikes.lock().map_err(|_| poisoned("bike table"))?;
        Ok(bikes.get(&code).cloned())
    }
}

impl Default for InMemoryRentalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RentalStore for InMemoryRentalStore {
    async fn begin(&self) -> Result<Box<dyn RentalTx>, StoreError> {
        Ok(Box::new(InMemoryTx {
            store: self.clone(),
            row: None,
            staged_bike: None,
            staged_ledger: Vec::new(),
        }))
    }

    async fn list_travel_records(&self, identity: &str) -> Result<Vec<LedgerEntry>, StoreError> {
        let ledger = self.tables.ledger.lock().map_err(|_| poisoned("ledger"))?;
        Ok(ledger.get(identity).cloned().unwrap_or_default())
    }
}

struct InMemoryTx {
    store: InMemoryRentalStore,
    row: Option<OwnedMutexGuard<Bike>>,
    staged_bike: Option<Bike>,
    staged_ledger: Vec<(String, LedgerEntry)>,
}

#[async_trait]
impl RentalTx for InMemoryTx {
    async fn fetch_bike_for_update(&mut self, code: BikeCode) -> Result<Option<Bike>, StoreError> {
        if let Some(row) = &self.row {
            if row.code == code {
                return Ok(Some(self.staged_bike.clone().unwrap_or_else(|| (**row).clone())));
            }
            return Err(StoreError::backend(format!(
                "transaction already holds bike {}, cannot lock {}",
                row.code, code
            )));
        }

        let Some(cell) = self.store.cell(code)? else {
            return Ok(None);
        };
        let row = cell.lock_owned().await;
        let bike = (*row).clone();
        self.row = Some(row);
        Ok(Some(bike))
    }

    async fn write_bike_state(&mut self, bike: &Bike) -> Result<(), StoreError> {
        match &self.row {
            Some(row) if row.code == bike.code => {
                self.staged_bike = Some(bike.clone());
                Ok(())
            }
            _ => Err(StoreError::backend(format!(
                "bike {} was not locked by this transaction",
                bike.code
            ))),
        }
    }

    async fn append_travel_record(
        &mut self,
        identity: &str,
        entry: &LedgerEntry,
    ) -> Result<(), StoreError> {
        self.staged_ledger.push((identity.to_string(), *entry));
        Ok(())
    }

    async fn now(&mut self) -> Result<i64, StoreError> {
        Ok(self.store.tables.clock.now())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTx {
            store,
            row,
            staged_bike,
            staged_ledger,
        } = *self;

        // Both writes land while the row lock and the ledger lock are held, so
        // no reader can observe one without the other.
        let mut ledger = store.tables.ledger.lock().map_err(|_| poisoned("ledger"))?;
        if let (Some(mut row), Some(bike)) = (row, staged_bike) {
            *row = bike;
        }
        for (identity, entry) in staged_ledger {
            ledger.entry(identity).or_default().push(entry);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
