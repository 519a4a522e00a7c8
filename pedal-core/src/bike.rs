use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

/// Identifier of a physical bike. Arrives on the bus as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BikeCode(pub i64);

impl BikeCode {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl FromStr for BikeCode {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let trimmed = s.trim();
        let code: i64 = trimmed
            .parse()
            .map_err(|_| CoreError::ValidationError(format!("asset code '{}' is not numeric", s)))?;
        if code < 0 {
            return Err(CoreError::ValidationError(format!(
                "asset code {} must not be negative",
                code
            )));
        }
        Ok(Self(code))
    }
}

impl fmt::Display for BikeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted status column, without the session payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BikeStatus {
    Locked,
    Unlocked,
    Damaged,
}

impl BikeStatus {
    pub const fn as_i16(self) -> i16 {
        match self {
            BikeStatus::Locked => 0,
            BikeStatus::Unlocked => 1,
            BikeStatus::Damaged => 2,
        }
    }
}

impl TryFrom<i16> for BikeStatus {
    type Error = CoreError;

    fn try_from(raw: i16) -> CoreResult<Self> {
        match raw {
            0 => Ok(BikeStatus::Locked),
            1 => Ok(BikeStatus::Unlocked),
            2 => Ok(BikeStatus::Damaged),
            other => Err(CoreError::UnknownBikeStatus(other)),
        }
    }
}

/// Rental state of a bike. Holder and session start only exist while unlocked,
/// so they can never be set or cleared independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BikeState {
    Locked,
    Unlocked { holder: String, session_start: i64 },
    Damaged,
}

impl BikeState {
    pub fn status(&self) -> BikeStatus {
        match self {
            BikeState::Locked => BikeStatus::Locked,
            BikeState::Unlocked { .. } => BikeStatus::Unlocked,
            BikeState::Damaged => BikeStatus::Damaged,
        }
    }

    pub fn holder(&self) -> Option<&str> {
        match self {
            BikeState::Unlocked { holder, .. } => Some(holder),
            _ => None,
        }
    }

    pub fn session_start(&self) -> Option<i64> {
        match self {
            BikeState::Unlocked { session_start, .. } => Some(*session_start),
            _ => None,
        }
    }

    /// Rebuild a state from its stored columns. Rejects rows where the
    /// holder/session pair disagrees with the status.
    pub fn from_parts(
        status: BikeStatus,
        holder: Option<String>,
        session_start: Option<i64>,
    ) -> CoreResult<Self> {
        match (status, holder, session_start) {
            (BikeStatus::Unlocked, Some(holder), Some(session_start)) => Ok(BikeState::Unlocked {
                holder,
                session_start,
            }),
            (BikeStatus::Locked, None, None) => Ok(BikeState::Locked),
            (BikeStatus::Damaged, None, None) => Ok(BikeState::Damaged),
            (status, holder, session_start) => Err(CoreError::ValidationError(format!(
                "bike status {:?} inconsistent with holder present={} session_start present={}",
                status,
                holder.is_some(),
                session_start.is_some()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bike {
    pub code: BikeCode,
    pub asset_type: i32,
    pub state: BikeState,
}

impl Bike {
    pub fn new(code: BikeCode, asset_type: i32) -> Self {
        Self {
            code,
            asset_type,
            state: BikeState::Locked,
        }
    }

    pub fn damaged(code: BikeCode, asset_type: i32) -> Self {
        Self {
            code,
            asset_type,
            state: BikeState::Damaged,
        }
    }

    /// Transition: Locked → Unlocked(holder, now)
    pub fn open_session(&mut self, holder: &str, now: i64) {
        self.state = BikeState::Unlocked {
            holder: holder.to_string(),
            session_start: now,
        };
    }

    /// Transition: Unlocked → Locked. Clears holder and session start together.
    pub fn close_session(&mut self) {
        self.state = BikeState::Locked;
    }
}
