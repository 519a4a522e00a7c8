use serde::{Deserialize, Serialize};
use std::fmt;

use super::travel::TravelInfo;

/// Status codes carried by every response event. Serialized as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum StatusCode {
    Success,
    InvalidData,
    ProcessFailed,
    AssetTaken,
    AlreadyRunning,
    AssetDamaged,
}

impl StatusCode {
    pub const fn code(self) -> u16 {
        match self {
            StatusCode::Success => 200,
            StatusCode::InvalidData => 404,
            StatusCode::ProcessFailed => 406,
            StatusCode::AssetTaken => 407,
            StatusCode::AlreadyRunning => 408,
            StatusCode::AssetDamaged => 409,
        }
    }
}

impl From<StatusCode> for u16 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(StatusCode::Success),
            404 => Ok(StatusCode::InvalidData),
            406 => Ok(StatusCode::ProcessFailed),
            407 => Ok(StatusCode::AssetTaken),
            408 => Ok(StatusCode::AlreadyRunning),
            409 => Ok(StatusCode::AssetDamaged),
            other => Err(format!("unknown status code {}", other)),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// --- Inbound ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub identity: String,
    pub asset_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRequest {
    pub identity: String,
    pub asset_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTripsRequest {
    pub identity: String,
}

/// Every request the rental service accepts, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RentalRequest {
    Unlock(UnlockRequest),
    Lock(LockRequest),
    ListTrips(ListTripsRequest),
}

impl RentalRequest {
    pub fn identity(&self) -> &str {
        match self {
            RentalRequest::Unlock(req) => &req.identity,
            RentalRequest::Lock(req) => &req.identity,
            RentalRequest::ListTrips(req) => &req.identity,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RentalRequest::Unlock(_) => "unlock",
            RentalRequest::Lock(_) => "lock",
            RentalRequest::ListTrips(_) => "list_trips",
        }
    }
}

// --- Outbound ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockResponse {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockResponse {
    pub status: StatusCode,
    pub message: String,
    pub trip_info: TravelInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListTripsResponse {
    pub status: StatusCode,
    pub message: String,
    pub trip_info: TravelInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RentalResponse {
    UnlockResult(UnlockResponse),
    LockResult(LockResponse),
    ListTripsResult(ListTripsResponse),
}

impl RentalResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            RentalResponse::UnlockResult(rsp) => rsp.status,
            RentalResponse::LockResult(rsp) => rsp.status,
            RentalResponse::ListTripsResult(rsp) => rsp.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::travel::TravelRecord;

    #[test]
    fn test_request_decoding_by_kind() {
        let raw = r#"{"kind":"unlock","identity":"13800000000","asset_code":"42"}"#;
        let req: RentalRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(
            req,
            RentalRequest::Unlock(UnlockRequest {
                identity: "13800000000".to_string(),
                asset_code: "42".to_string(),
            })
        );
        assert_eq!(req.identity(), "13800000000");

        let raw = r#"{"kind":"list_trips","identity":"13800000000"}"#;
        let req: RentalRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.kind(), "list_trips");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let raw = r#"{"kind":"teleport","identity":"13800000000"}"#;
        assert!(serde_json::from_str::<RentalRequest>(raw).is_err());
    }

    #[test]
    fn test_status_serializes_as_number() {
        let rsp = RentalResponse::LockResult(LockResponse {
            status: StatusCode::Success,
            message: "success".to_string(),
            trip_info: TravelInfo::new(30.0, 60.0, 469.0, vec![TravelRecord::new(0, 60, 1)]),
        });
        let json = serde_json::to_value(&rsp).unwrap();
        assert_eq!(json["kind"], "lock_result");
        assert_eq!(json["status"], 200);
        assert_eq!(json["trip_info"]["records"][0]["duration_minutes"], 60);

        let back: RentalResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back.status(), StatusCode::Success);
    }

    #[test]
    fn test_unknown_status_code_fails() {
        let raw = r#"{"status":999,"message":"?"}"#;
        assert!(serde_json::from_str::<UnlockResponse>(raw).is_err());
        assert_eq!(StatusCode::try_from(409), Ok(StatusCode::AssetDamaged));
    }
}
