use async_trait::async_trait;
use pedal_core::repository::{RentalStore, RentalTx, StoreError};
use pedal_core::{Bike, BikeCode, BikeState, BikeStatus, LedgerEntry, TripSummary};
use pedal_shared::TravelRecord;
use sqlx::{PgPool, Postgres, Transaction};

// clock_timestamp() advances inside a transaction; NOW() would return the
// moment the transaction began, before the row lock was granted.
const CURRENT_EPOCH_SQL: &str = "SELECT FLOOR(EXTRACT(EPOCH FROM clock_timestamp()))::BIGINT";

/// PostgreSQL-backed bikes and travel ledger.
pub struct PgRentalStore {
    pool: PgPool,
}

impl PgRentalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BikeRow {
    code: i64,
    asset_type: i32,
    status: i16,
    holder: Option<String>,
    session_start: Option<i64>,
}

impl BikeRow {
    fn into_bike(self) -> Result<Bike, StoreError> {
        let status = BikeStatus::try_from(self.status)
            .map_err(|e| StoreError::Corrupt(format!("bike {}: {}", self.code, e)))?;
        let state = BikeState::from_parts(status, self.holder, self.session_start)
            .map_err(|e| StoreError::Corrupt(format!("bike {}: {}", self.code, e)))?;

        Ok(Bike {
            code: BikeCode(self.code),
            asset_type: self.asset_type,
            state,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TravelRow {
    asset_type: i32,
    mileage: f64,
    emissions: f64,
    calories: f64,
    start_ts: i64,
    duration_minutes: i64,
    fare_units: i32,
}

impl From<TravelRow> for LedgerEntry {
    fn from(row: TravelRow) -> Self {
        LedgerEntry::new(
            row.asset_type,
            TripSummary {
                mileage: row.mileage,
                emissions: row.emissions,
                calories: row.calories,
                record: TravelRecord::new(row.start_ts, row.duration_minutes, row.fare_units),
            },
        )
    }
}

#[async_trait]
impl RentalStore for PgRentalStore {
    async fn begin(&self) -> Result<Box<dyn RentalTx>, StoreError> {
        let tx = self.pool.begin().await.map_err(StoreError::backend)?;
        Ok(Box::new(PgRentalTx { tx }))
    }

    async fn list_travel_records(&self, identity: &str) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows: Vec<TravelRow> = sqlx::query_as(
            r#"
            SELECT asset_type, mileage, emissions, calories, start_ts, duration_minutes, fare_units
            FROM travel_records
            WHERE identity = $1
            ORDER BY id
            "#,
        )
        .bind(identity)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }
}

/// Dropping this without `commit` rolls the transaction back, releasing the row lock.
struct PgRentalTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RentalTx for PgRentalTx {
    async fn fetch_bike_for_update(&mut self, code: BikeCode) -> Result<Option<Bike>, StoreError> {
        // FOR UPDATE blocks concurrent transitions on this bike until we finish.
        let row: Option<BikeRow> = sqlx::query_as(
            r#"
            SELECT code, asset_type, status, holder, session_start
            FROM bikes
            WHERE code = $1
            FOR UPDATE
            "#,
        )
        .bind(code.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;

        row.map(BikeRow::into_bike).transpose()
    }

    async fn write_bike_state(&mut self, bike: &Bike) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE bikes
            SET status = $2, holder = $3, session_start = $4, updated_at = NOW()
            WHERE code = $1
            "#,
        )
        .bind(bike.code.value())
        .bind(bike.state.status().as_i16())
        .bind(bike.state.holder())
        .bind(bike.state.session_start())
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Corrupt(format!(
                "bike {} vanished during transition",
                bike.code
            )));
        }
        Ok(())
    }

    async fn append_travel_record(
        &mut self,
        identity: &str,
        entry: &LedgerEntry,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO travel_records
                (identity, asset_type, mileage, emissions, calories, start_ts, duration_minutes, fare_units)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(identity)
        .bind(entry.asset_type)
        .bind(entry.trip.mileage)
        .bind(entry.trip.emissions)
        .bind(entry.trip.calories)
        .bind(entry.trip.record.start_ts)
        .bind(entry.trip.record.duration_minutes)
        .bind(entry.trip.record.fare_units)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;

        Ok(())
    }

    async fn now(&mut self) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(CURRENT_EPOCH_SQL)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(StoreError::backend)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(StoreError::backend)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(StoreError::backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: i16, holder: Option<&str>, session_start: Option<i64>) -> BikeRow {
        BikeRow {
            code: 7,
            asset_type: 1,
            status,
            holder: holder.map(str::to_string),
            session_start,
        }
    }

    #[test]
    fn test_valid_rows_decode() {
        assert_eq!(row(0, None, None).into_bike().unwrap(), Bike::new(BikeCode(7), 1));
        assert_eq!(
            row(1, Some("13800000001"), Some(100)).into_bike().unwrap().state,
            BikeState::Unlocked {
                holder: "13800000001".to_string(),
                session_start: 100,
            }
        );
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        assert!(matches!(
            row(9, None, None).into_bike(),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_unlocked_without_holder_is_corrupt() {
        assert!(matches!(
            row(1, None, Some(100)).into_bike(),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_locked_with_holder_is_corrupt() {
        assert!(matches!(
            row(0, Some("13800000001"), None).into_bike(),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_clock_reads_wall_time_floored() {
        assert!(CURRENT_EPOCH_SQL.contains("clock_timestamp()"));
        assert!(CURRENT_EPOCH_SQL.contains("FLOOR("));
        assert!(!CURRENT_EPOCH_SQL.contains("NOW()"));
    }
}
