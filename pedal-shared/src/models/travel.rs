use serde::{Deserialize, Serialize};

/// One closed rental session as it appears in a rider's ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TravelRecord {
    pub start_ts: i64,         // Unix timestamp (seconds)
    pub duration_minutes: i64, // floor-rounded
    pub fare_units: i32,
}

impl TravelRecord {
    pub fn new(start_ts: i64, duration_minutes: i64, fare_units: i32) -> Self {
        Self {
            start_ts,
            duration_minutes,
            fare_units,
        }
    }
}

/// Trip metrics plus the records they were derived from.
///
/// For a single lock this holds exactly one record; for a history listing the
/// metrics are the sums over every record listed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TravelInfo {
    pub mileage: f64,
    pub emissions: f64,
    pub calories: f64,
    pub records: Vec<TravelRecord>,
}

impl TravelInfo {
    pub fn new(mileage: f64, emissions: f64, calories: f64, records: Vec<TravelRecord>) -> Self {
        Self {
            mileage,
            emissions,
            calories,
            records,
        }
    }

    /// Zero-valued payload carried by every non-success response.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_fare_units(&self) -> i64 {
        self.records.iter().map(|r| i64::from(r.fare_units)).sum()
    }
}
