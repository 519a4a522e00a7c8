pub mod models;
pub mod pii;

pub use models::events::{
    ListTripsRequest, ListTripsResponse, LockRequest, LockResponse, RentalRequest, RentalResponse,
    StatusCode, UnlockRequest, UnlockResponse,
};
pub use models::travel::{TravelInfo, TravelRecord};
pub use pii::Masked;
