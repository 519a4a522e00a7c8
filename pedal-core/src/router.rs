use pedal_shared::{
    ListTripsResponse, LockResponse, Masked, RentalRequest, RentalResponse, StatusCode,
    TravelInfo, UnlockResponse,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::bike::BikeCode;
use crate::rental::{RentalOutcome, RentalStateMachine};

/// Turns inbound bus events into state machine calls and typed responses.
///
/// Holds no business rules: every decision comes from [`RentalStateMachine`].
#[derive(Clone)]
pub struct RequestRouter {
    machine: Arc<RentalStateMachine>,
}

impl RequestRouter {
    pub fn new(machine: Arc<RentalStateMachine>) -> Self {
        Self { machine }
    }

    /// Decode a raw payload and route it, returning the requesting identity
    /// alongside the response. Absent, malformed or unknown-kind events are
    /// dropped: no response is produced.
    pub async fn route_payload(&self, payload: Option<&[u8]>) -> Option<(String, RentalResponse)> {
        let Some(bytes) = payload else {
            warn!("Dropping event with empty payload");
            return None;
        };

        match serde_json::from_slice::<RentalRequest>(bytes) {
            Ok(request) => {
                let identity = request.identity().to_string();
                Some((identity, self.route(request).await))
            }
            Err(e) => {
                warn!("Dropping undecodable event: {}", e);
                None
            }
        }
    }

    pub async fn route(&self, request: RentalRequest) -> RentalResponse {
        debug!(kind = request.kind(), identity = %Masked(request.identity()), "routing request");

        match request {
            RentalRequest::Unlock(req) => {
                let outcome = match parse_code(&req.asset_code) {
                    Some(code) => self.machine.unlock(code, &req.identity).await,
                    None => RentalOutcome::NotFound,
                };
                RentalResponse::UnlockResult(unlock_response(outcome))
            }
            RentalRequest::Lock(req) => {
                let outcome = match parse_code(&req.asset_code) {
                    Some(code) => self.machine.lock(code, &req.identity).await,
                    None => RentalOutcome::NotFound,
                };
                RentalResponse::LockResult(lock_response(outcome))
            }
            RentalRequest::ListTrips(req) => {
                let outcome = self.machine.list_trips(&req.identity).await;
                RentalResponse::ListTripsResult(list_trips_response(outcome))
            }
        }
    }
}

/// Malformed codes can never name a bike, so they share the not-found status.
fn parse_code(raw: &str) -> Option<BikeCode> {
    match raw.parse::<BikeCode>() {
        Ok(code) => Some(code),
        Err(e) => {
            warn!("Rejecting request: {}", e);
            None
        }
    }
}

fn unlock_response(outcome: RentalOutcome) -> UnlockResponse {
    let (status, message) = match outcome {
        RentalOutcome::Completed(_) => (StatusCode::Success, "success"),
        RentalOutcome::AlreadyOpenBySelf => (StatusCode::AlreadyRunning, "session already running"),
        RentalOutcome::ConflictHeldByOther => (StatusCode::AssetTaken, "another rider holds the bike"),
        RentalOutcome::AssetUnavailable(_) => (StatusCode::AssetDamaged, "bike is damaged"),
        RentalOutcome::NoOpenSession | RentalOutcome::NotFound => {
            (StatusCode::InvalidData, "cannot find bike")
        }
        RentalOutcome::PersistenceFailed => (StatusCode::ProcessFailed, "unlock failed"),
    };

    UnlockResponse {
        status,
        message: message.to_string(),
    }
}

fn lock_response(outcome: RentalOutcome) -> LockResponse {
    let (status, message, trip_info) = match outcome {
        RentalOutcome::Completed(info) => (StatusCode::Success, "success", info),
        RentalOutcome::ConflictHeldByOther => (
            StatusCode::AssetTaken,
            "another rider holds the bike",
            TravelInfo::empty(),
        ),
        RentalOutcome::AssetUnavailable(_) => {
            (StatusCode::AssetDamaged, "bike is damaged", TravelInfo::empty())
        }
        RentalOutcome::NoOpenSession | RentalOutcome::AlreadyOpenBySelf => (
            StatusCode::InvalidData,
            "no open session on this bike",
            TravelInfo::empty(),
        ),
        RentalOutcome::NotFound => (StatusCode::InvalidData, "cannot find bike", TravelInfo::empty()),
        RentalOutcome::PersistenceFailed => {
            (StatusCode::ProcessFailed, "lock failed", TravelInfo::empty())
        }
    };

    LockResponse {
        status,
        message: message.to_string(),
        trip_info,
    }
}

fn list_trips_response(outcome: RentalOutcome) -> ListTripsResponse {
    match outcome {
        RentalOutcome::Completed(trip_info) => ListTripsResponse {
            status: StatusCode::Success,
            message: "success".to_string(),
            trip_info,
        },
        _ => ListTripsResponse {
            status: StatusCode::ProcessFailed,
            message: "failed".to_string(),
            trip_info: TravelInfo::empty(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pedal_shared::TravelRecord;

    #[test]
    fn test_unlock_status_mapping() {
        let cases = [
            (RentalOutcome::Completed(TravelInfo::empty()), StatusCode::Success),
            (RentalOutcome::AlreadyOpenBySelf, StatusCode::AlreadyRunning),
            (RentalOutcome::ConflictHeldByOther, StatusCode::AssetTaken),
            (RentalOutcome::AssetUnavailable("damaged".into()), StatusCode::AssetDamaged),
            (RentalOutcome::NotFound, StatusCode::InvalidData),
            (RentalOutcome::PersistenceFailed, StatusCode::ProcessFailed),
        ];
        for (outcome, expected) in cases {
            assert_eq!(unlock_response(outcome).status, expected);
        }
    }

    #[test]
    fn test_lock_carries_trip_only_on_success() {
        let info = TravelInfo::new(30.0, 60.0, 469.0, vec![TravelRecord::new(0, 60, 1)]);
        let rsp = lock_response(RentalOutcome::Completed(info.clone()));
        assert_eq!(rsp.status, StatusCode::Success);
        assert_eq!(rsp.trip_info, info);

        let rsp = lock_response(RentalOutcome::NoOpenSession);
        assert_eq!(rsp.status, StatusCode::InvalidData);
        assert_eq!(rsp.trip_info, TravelInfo::empty());

        let rsp = lock_response(RentalOutcome::PersistenceFailed);
        assert_eq!(rsp.status, StatusCode::ProcessFailed);
        assert!(rsp.trip_info.is_empty());
    }

    #[test]
    fn test_list_failure_is_process_failed() {
        let rsp = list_trips_response(RentalOutcome::PersistenceFailed);
        assert_eq!(rsp.status, StatusCode::ProcessFailed);
        assert_eq!(rsp.trip_info, TravelInfo::empty());
    }

    #[test]
    fn test_parse_code_rejects_garbage() {
        assert_eq!(parse_code("12"), Some(BikeCode(12)));
        assert_eq!(parse_code("12a"), None);
    }
}
