pub mod accountant;
pub mod bike;
pub mod clock;
pub mod rental;
pub mod repository;
pub mod router;

pub use accountant::{LedgerEntry, TripAccountant, TripPolicy, TripSummary};
pub use bike::{Bike, BikeCode, BikeState, BikeStatus};
pub use clock::{Clock, SystemClock};
pub use rental::{RentalOutcome, RentalStateMachine};
pub use repository::{RentalStore, RentalTx, StoreError};
pub use router::RequestRouter;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Unknown bike status: {0}")]
    UnknownBikeStatus(i16),
}

pub type CoreResult<T> = Result<T, CoreError>;
