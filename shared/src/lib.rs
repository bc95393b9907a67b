//! Types shared between the stall service and the consumers of its events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StallStatus {
    Available,
    Held,
    Reserved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StallSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl StallStatus {
    pub const ALL: [StallStatus; 3] = [Self::Available, Self::Held, Self::Reserved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Held => "HELD",
            Self::Reserved => "RESERVED",
        }
    }
}

impl StallSize {
    pub const ALL: [StallSize; 3] = [Self::Small, Self::Medium, Self::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "SMALL",
            Self::Medium => "MEDIUM",
            Self::Large => "LARGE",
        }
    }
}

impl fmt::Display for StallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for StallSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StallStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "stall status",
                value: s.to_string(),
            })
    }
}

impl FromStr for StallSize {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "stall size",
                value: s.to_string(),
            })
    }
}

/// Which notification a status change produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StallEventKind {
    Reserved,
    Released,
}

/// Payload published to the event bus, keyed by `stall_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StallEvent {
    pub stall_id: i64,
    pub code: String,
    pub status: StallStatus,
    pub location: String,
}

impl StallEvent {
    pub fn key(&self) -> String {
        self.stall_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_wire_name() {
        for status in StallStatus::ALL {
            assert_eq!(status.as_str().parse::<StallStatus>(), Ok(status));
        }
        assert!("held".parse::<StallStatus>().is_err());
    }

    #[test]
    fn unknown_size_names_the_offending_value() {
        let err = "HUGE".parse::<StallSize>().unwrap_err();
        assert_eq!(err.to_string(), "unknown stall size value: HUGE");
    }

    #[test]
    fn event_payload_uses_camel_case_fields() {
        let event = StallEvent {
            stall_id: 7,
            code: "A-001".to_string(),
            status: StallStatus::Reserved,
            location: "Hall A".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "stallId": 7,
                "code": "A-001",
                "status": "RESERVED",
                "location": "Hall A",
            })
        );
        assert_eq!(event.key(), "7");
    }
}
