use pedal_shared::{TravelInfo, TravelRecord};
use serde::{Deserialize, Serialize};

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_MINUTE: i64 = 60;

/// Fixed pricing and metric factors applied to every closed session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripPolicy {
    pub speed_per_hour: f64,      // assumed average speed, distance units / hour
    pub emissions_per_unit: f64,  // per distance unit
    pub calories_per_hour: f64,
    pub fare_per_session: i32,    // flat rate
}

impl Default for TripPolicy {
    fn default() -> Self {
        Self {
            speed_per_hour: 30.0,
            emissions_per_unit: 2.0,
            calories_per_hour: 469.0,
            fare_per_session: 1,
        }
    }
}

/// Metrics and ledger record for one closed session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub mileage: f64,
    pub emissions: f64,
    pub calories: f64,
    pub record: TravelRecord,
}

impl TripSummary {
    pub fn to_travel_info(&self) -> TravelInfo {
        TravelInfo::new(self.mileage, self.emissions, self.calories, vec![self.record])
    }
}

/// A stored ledger row: the trip plus the asset type it was ridden on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub asset_type: i32,
    pub trip: TripSummary,
}

impl LedgerEntry {
    pub fn new(asset_type: i32, trip: TripSummary) -> Self {
        Self { asset_type, trip }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TripAccountant {
    policy: TripPolicy,
}

impl TripAccountant {
    pub fn new(policy: TripPolicy) -> Self {
        Self { policy }
    }

    /// Derive the trip for a session running from `start` to `end` (epoch seconds).
    ///
    /// A clock that went backwards yields a zero-length trip; the fare is still charged.
    pub fn compute_trip(&self, start: i64, end: i64) -> TripSummary {
        let elapsed = end.saturating_sub(start).max(0);
        let hours = elapsed as f64 / SECONDS_PER_HOUR;
        let mileage = hours * self.policy.speed_per_hour;

        TripSummary {
            mileage,
            emissions: mileage * self.policy.emissions_per_unit,
            calories: hours * self.policy.calories_per_hour,
            record: TravelRecord::new(
                start,
                elapsed / SECONDS_PER_MINUTE,
                self.policy.fare_per_session,
            ),
        }
    }

    /// Fold ledger entries into a history view. Order is preserved.
    pub fn summarize(&self, entries: &[LedgerEntry]) -> TravelInfo {
        entries.iter().fold(TravelInfo::empty(), |mut info, entry| {
            info.mileage += entry.trip.mileage;
            info.emissions += entry.trip.emissions;
            info.calories += entry.trip.calories;
            info.records.push(entry.trip.record);
            info
        })
    }
}
