use pedal_shared::{Masked, TravelInfo};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::accountant::{LedgerEntry, TripAccountant};
use crate::bike::{BikeCode, BikeState};
use crate::repository::{RentalStore, RentalTx, StoreError};

const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);
const DAMAGED: &str = "damaged";

/// Result of a rental operation. Only `PersistenceFailed` is a failure; the
/// rest are business outcomes reported back to the rider.
#[derive(Debug, Clone, PartialEq)]
pub enum RentalOutcome {
    Completed(TravelInfo),
    AlreadyOpenBySelf,
    ConflictHeldByOther,
    AssetUnavailable(String),
    /// Lock against a bike with no open session. Never computes a trip.
    NoOpenSession,
    NotFound,
    PersistenceFailed,
}

/// Unlock is only valid against a locked bike.
fn plan_unlock(state: &BikeState, identity: &str) -> Result<(), RentalOutcome> {
    match state {
        BikeState::Locked => Ok(()),
        BikeState::Unlocked { holder, .. } if holder == identity => {
            Err(RentalOutcome::AlreadyOpenBySelf)
        }
        BikeState::Unlocked { .. } => Err(RentalOutcome::ConflictHeldByOther),
        BikeState::Damaged => Err(RentalOutcome::AssetUnavailable(DAMAGED.to_string())),
    }
}

/// Lock is only valid against a bike unlocked by the same rider. Yields the
/// session start to bill from.
fn plan_lock(state: &BikeState, identity: &str) -> Result<i64, RentalOutcome> {
    match state {
        BikeState::Unlocked {
            holder,
            session_start,
        } if holder == identity => Ok(*session_start),
        BikeState::Unlocked { .. } => Err(RentalOutcome::ConflictHeldByOther),
        BikeState::Locked => Err(RentalOutcome::NoOpenSession),
        BikeState::Damaged => Err(RentalOutcome::AssetUnavailable(DAMAGED.to_string())),
    }
}

/// A transition either settled without writing, or has writes staged in an
/// open transaction awaiting commit.
enum Prepared {
    Settled(RentalOutcome),
    Staged {
        tx: Box<dyn RentalTx>,
        outcome: RentalOutcome,
    },
}

/// Applies lock/unlock transitions against persisted bike state.
///
/// Each transition runs inside one store transaction holding the bike's row
/// lock from load to commit, so concurrent requests for the same bike
/// serialize while different bikes proceed independently.
pub struct RentalStateMachine {
    store: Arc<dyn RentalStore>,
    accountant: TripAccountant,
    storage_timeout: Duration,
}

impl RentalStateMachine {
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self {
            store,
            accountant: TripAccountant::default(),
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    pub async fn unlock(&self, code: BikeCode, identity: &str) -> RentalOutcome {
        debug!(bike = %code, identity = %Masked(identity), "unlock requested");
        let prepared = self.bounded("unlock", code, self.prepare_unlock(code, identity)).await;
        self.settle("unlock", code, identity, prepared).await
    }

    pub async fn lock(&self, code: BikeCode, identity: &str) -> RentalOutcome {
        debug!(bike = %code, identity = %Masked(identity), "lock requested");
        let prepared = self.bounded("lock", code, self.prepare_lock(code, identity)).await;
        self.settle("lock", code, identity, prepared).await
    }

    /// Read-only history for `identity`. An empty ledger is a successful, empty listing.
    pub async fn list_trips(&self, identity: &str) -> RentalOutcome {
        let listing = tokio::time::timeout(
            self.storage_timeout,
            self.store.list_travel_records(identity),
        )
        .await;

        match listing {
            Ok(Ok(entries)) => {
                debug!(identity = %Masked(identity), count = entries.len(), "listed travel records");
                RentalOutcome::Completed(self.accountant.summarize(&entries))
            }
            Ok(Err(e)) => {
                error!(identity = %Masked(identity), "Failed to list travel records: {}", e);
                RentalOutcome::PersistenceFailed
            }
            Err(_) => {
                error!(identity = %Masked(identity), "Listing travel records timed out");
                RentalOutcome::PersistenceFailed
            }
        }
    }

    /// Bounds everything up to the commit: begin, row lock wait, reads and
    /// staged writes. On timeout the future is dropped together with its
    /// transaction, which rolls back.
    async fn bounded<F>(&self, op: &'static str, code: BikeCode, fut: F) -> Prepared
    where
        F: Future<Output = Result<Prepared, StoreError>>,
    {
        match tokio::time::timeout(self.storage_timeout, fut).await {
            Ok(Ok(prepared)) => prepared,
            Ok(Err(e)) => {
                error!(bike = %code, "{} failed: {}", op, e);
                Prepared::Settled(RentalOutcome::PersistenceFailed)
            }
            Err(_) => {
                error!(bike = %code, "{} timed out after {:?}", op, self.storage_timeout);
                Prepared::Settled(RentalOutcome::PersistenceFailed)
            }
        }
    }

    /// Commits staged writes. An issued commit is awaited to the end so the
    /// reported outcome matches what storage holds; the store bounds it.
    async fn settle(
        &self,
        op: &'static str,
        code: BikeCode,
        identity: &str,
        prepared: Prepared,
    ) -> RentalOutcome {
        let (tx, outcome) = match prepared {
            Prepared::Settled(outcome) => return outcome,
            Prepared::Staged { tx, outcome } => (tx, outcome),
        };

        match tx.commit().await {
            Ok(()) => {
                info!(bike = %code, identity = %Masked(identity), "{} committed", op);
                outcome
            }
            Err(e) => {
                error!(bike = %code, "{} commit failed: {}", op, e);
                RentalOutcome::PersistenceFailed
            }
        }
    }

    async fn prepare_unlock(&self, code: BikeCode, identity: &str) -> Result<Prepared, StoreError> {
        let mut tx = self.store.begin().await?;
        let Some(mut bike) = tx.fetch_bike_for_update(code).await? else {
            release(tx, code).await;
            return Ok(Prepared::Settled(RentalOutcome::NotFound));
        };

        match plan_unlock(&bike.state, identity) {
            Ok(()) => {
                let now = tx.now().await?;
                bike.open_session(identity, now);
                tx.write_bike_state(&bike).await?;

                debug!(bike = %code, session_start = now, "unlock staged");
                Ok(Prepared::Staged {
                    tx,
                    outcome: RentalOutcome::Completed(TravelInfo::empty()),
                })
            }
            Err(outcome) => {
                debug!(bike = %code, state = ?bike.state.status(), ?outcome, "unlock rejected");
                release(tx, code).await;
                Ok(Prepared::Settled(outcome))
            }
        }
    }

    async fn prepare_lock(&self, code: BikeCode, identity: &str) -> Result<Prepared, StoreError> {
        let mut tx = self.store.begin().await?;
        let Some(mut bike) = tx.fetch_bike_for_update(code).await? else {
            release(tx, code).await;
            return Ok(Prepared::Settled(RentalOutcome::NotFound));
        };

        match plan_lock(&bike.state, identity) {
            Ok(session_start) => {
                let now = tx.now().await?;
                let trip = self.accountant.compute_trip(session_start, now);
                debug!(
                    bike = %code,
                    mileage = trip.mileage,
                    emissions = trip.emissions,
                    calories = trip.calories,
                    duration_minutes = trip.record.duration_minutes,
                    "trip computed"
                );

                // Both writes share the transaction: either the bike is locked
                // and the ledger has the trip, or neither happened.
                bike.close_session();
                tx.write_bike_state(&bike).await?;
                tx.append_travel_record(identity, &LedgerEntry::new(bike.asset_type, trip))
                    .await?;

                Ok(Prepared::Staged {
                    tx,
                    outcome: RentalOutcome::Completed(trip.to_travel_info()),
                })
            }
            Err(outcome) => {
                debug!(bike = %code, state = ?bike.state.status(), ?outcome, "lock rejected");
                release(tx, code).await;
                Ok(Prepared::Settled(outcome))
            }
        }
    }
}

/// Roll back a transaction that wrote nothing. A failed rollback does not
/// change the outcome: the row lock is released when the connection is.
async fn release(tx: Box<dyn RentalTx>, code: BikeCode) {
    if let Err(e) = tx.rollback().await {
        warn!(bike = %code, "rollback failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlocked(holder: &str) -> BikeState {
        BikeState::Unlocked {
            holder: holder.to_string(),
            session_start: 10,
        }
    }

    #[test]
    fn test_unlock_table() {
        assert_eq!(plan_unlock(&BikeState::Locked, "m"), Ok(()));
        assert_eq!(
            plan_unlock(&unlocked("m"), "m"),
            Err(RentalOutcome::AlreadyOpenBySelf)
        );
        assert_eq!(
            plan_unlock(&unlocked("n"), "m"),
            Err(RentalOutcome::ConflictHeldByOther)
        );
        assert_eq!(
            plan_unlock(&BikeState::Damaged, "m"),
            Err(RentalOutcome::AssetUnavailable("damaged".to_string()))
        );
    }

    #[test]
    fn test_lock_table() {
        assert_eq!(plan_lock(&unlocked("m"), "m"), Ok(10));
        assert_eq!(
            plan_lock(&unlocked("n"), "m"),
            Err(RentalOutcome::ConflictHeldByOther)
        );
        assert_eq!(
            plan_lock(&BikeState::Locked, "m"),
            Err(RentalOutcome::NoOpenSession)
        );
        assert_eq!(
            plan_lock(&BikeState::Damaged, "m"),
            Err(RentalOutcome::AssetUnavailable("damaged".to_string()))
        );
    }
}
