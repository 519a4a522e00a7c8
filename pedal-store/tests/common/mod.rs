#![allow(dead_code)]

use async_trait::async_trait;
use pedal_core::repository::{RentalStore, RentalTx, StoreError};
use pedal_core::{Bike, BikeCode, Clock, LedgerEntry, RentalStateMachine};
use pedal_store::InMemoryRentalStore;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const RIDER_M: &str = "13800000001";
pub const RIDER_N: &str = "13800000002";
pub const STORAGE_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn at(now: i64) -> Arc<Self> {
        Arc::new(Self { now: AtomicI64::new(now) })
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Switches for injecting storage failures into an in-memory store.
#[derive(Default)]
pub struct Faults {
    pub fail_write: AtomicBool,
    pub fail_append: AtomicBool,
    pub fail_commit: AtomicBool,
    pub stall_write: AtomicBool,
    pub slow_commit: AtomicBool,
    pub fail_list: AtomicBool,
}

impl Faults {
    pub fn clear(&self) {
        for flag in [
            &self.fail_write,
            &self.fail_append,
            &self.fail_commit,
            &self.stall_write,
            &self.slow_commit,
            &self.fail_list,
        ] {
            flag.store(false, Ordering::SeqCst);
        }
    }
}

pub struct FaultyStore {
    pub inner: InMemoryRentalStore,
    pub faults: Arc<Faults>,
}

#[async_trait]
impl RentalStore for FaultyStore {
    async fn begin(&self) -> Result<Box<dyn RentalTx>, StoreError> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FaultyTx {
            inner,
            faults: self.faults.clone(),
        }))
    }

    async fn list_travel_records(&self, identity: &str) -> Result<Vec<LedgerEntry>, StoreError> {
        if self.faults.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::backend("injected list failure"));
        }
        self.inner.list_travel_records(identity).await
    }
}

struct FaultyTx {
    inner: Box<dyn RentalTx>,
    faults: Arc<Faults>,
}

#[async_trait]
impl RentalTx for FaultyTx {
    async fn fetch_bike_for_update(&mut self, code: BikeCode) -> Result<Option<Bike>, StoreError> {
        self.inner.fetch_bike_for_update(code).await
    }

    async fn write_bike_state(&mut self, bike: &Bike) -> Result<(), StoreError> {
        if self.faults.stall_write.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.faults.fail_write.load(Ordering::SeqCst) {
            return Err(StoreError::backend("injected write failure"));
        }
        self.inner.write_bike_state(bike).await
    }

    async fn append_travel_record(
        &mut self,
        identity: &str,
        entry: &LedgerEntry,
    ) -> Result<(), StoreError> {
        if self.faults.fail_append.load(Ordering::SeqCst) {
            return Err(StoreError::backend("injected append failure"));
        }
        self.inner.append_travel_record(identity, entry).await
    }

    async fn now(&mut self) -> Result<i64, StoreError> {
        self.inner.now().await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.faults.slow_commit.load(Ordering::SeqCst) {
            tokio::time::sleep(STORAGE_TIMEOUT * 2).await;
        }
        if self.faults.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::backend("injected commit failure"));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.rollback().await
    }
}

pub struct Harness {
    pub store: InMemoryRentalStore,
    pub clock: Arc<ManualClock>,
    pub faults: Arc<Faults>,
    pub machine: Arc<RentalStateMachine>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = ManualClock::at(0);
        let store = InMemoryRentalStore::with_clock(clock.clone());
        let faults = Arc::new(Faults::default());
        let faulty = FaultyStore {
            inner: store.clone(),
            faults: faults.clone(),
        };
        let machine = RentalStateMachine::new(Arc::new(faulty))
            .with_storage_timeout(STORAGE_TIMEOUT);

        Self {
            store,
            clock,
            faults,
            machine: Arc::new(machine),
        }
    }

    pub fn with_bikes(codes: &[i64]) -> Self {
        let harness = Self::new();
        for code in codes {
            harness.store.provision_bike(Bike::new(BikeCode(*code), 1)).unwrap();
        }
        harness
    }

    pub async fn bike(&self, code: i64) -> Bike {
        self.store.get_bike(BikeCode(code)).await.unwrap().unwrap()
    }

    pub async fn ledger_len(&self, identity: &str) -> usize {
        self.store.list_travel_records(identity).await.unwrap().len()
    }
}
