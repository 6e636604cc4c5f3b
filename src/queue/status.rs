// src/queue/status.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownLabel {}

fn unknown(kind: &'static str, value: &str) -> UnknownLabel {
    UnknownLabel {
        kind,
        value: value.to_string(),
    }
}

/* ============================================================
   Coarse pipeline stage
   ============================================================ */

/// Coarse pipeline stage. Only ever moves forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Prebooked,
    InOffice,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [
        BookingStatus::Prebooked,
        BookingStatus::InOffice,
        BookingStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Prebooked => "prebooked",
            BookingStatus::InOffice => "in_office",
            BookingStatus::Completed => "completed",
        }
    }

    /// The single legal successor, `None` once terminal.
    pub fn next(self) -> Option<BookingStatus> {
        match self {
            BookingStatus::Prebooked => Some(BookingStatus::InOffice),
            BookingStatus::InOffice => Some(BookingStatus::Completed),
            BookingStatus::Completed => None,
        }
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        BookingStatus::ALL
            .into_iter()
            .find(|bs| bs.as_str() == s)
            .ok_or_else(|| unknown("booking status", s))
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ============================================================
   Fine-grained clinical stage
   ============================================================ */

/// Advisory clinical stage. Any value may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientStatus {
    Pending,
    Confirmed,
    Intake,
    #[serde(rename = "Ready for provider")]
    ReadyForProvider,
    Provider,
    #[serde(rename = "Ready for Discharge")]
    ReadyForDischarge,
    Discharged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalPhase {
    PreProvider,
    InConsult,
}

impl PatientStatus {
    pub const ALL: [PatientStatus; 7] = [
        PatientStatus::Pending,
        PatientStatus::Confirmed,
        PatientStatus::Intake,
        PatientStatus::ReadyForProvider,
        PatientStatus::Provider,
        PatientStatus::ReadyForDischarge,
        PatientStatus::Discharged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatientStatus::Pending => "Pending",
            PatientStatus::Confirmed => "Confirmed",
            PatientStatus::Intake => "Intake",
            PatientStatus::ReadyForProvider => "Ready for provider",
            PatientStatus::Provider => "Provider",
            PatientStatus::ReadyForDischarge => "Ready for Discharge",
            PatientStatus::Discharged => "Discharged",
        }
    }

    pub fn phase(self) -> Option<ClinicalPhase> {
        match self {
            PatientStatus::Pending | PatientStatus::Confirmed | PatientStatus::Intake => {
                Some(ClinicalPhase::PreProvider)
            }
            PatientStatus::ReadyForProvider | PatientStatus::Provider => {
                Some(ClinicalPhase::InConsult)
            }
            PatientStatus::ReadyForDischarge | PatientStatus::Discharged => None,
        }
    }

    /// Stages at which the provider call can be joined.
    pub fn joins_call(self) -> bool {
        self.phase() == Some(ClinicalPhase::InConsult)
    }
}

impl FromStr for PatientStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PatientStatus::ALL
            .into_iter()
            .find(|ps| ps.as_str() == s)
            .ok_or_else(|| unknown("patient status", s))
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ============================================================
   Room location
   ============================================================ */

/// Physical location while in office.
///
/// Older rows and clients used `waiting` / `in_room`; both are accepted on
/// input and always written back as `waiting_room` / `in_call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    #[serde(alias = "waiting")]
    WaitingRoom,
    #[serde(alias = "in_room")]
    InCall,
}

impl RoomStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomStatus::WaitingRoom => "waiting_room",
            RoomStatus::InCall => "in_call",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RoomStatus::WaitingRoom => "Waiting Room",
            RoomStatus::InCall => "In Call",
        }
    }

    /// Parses a stored room label. The legacy `done` label (and an empty
    /// string) means the patient has no room.
    pub fn parse_stored(s: &str) -> Result<Option<RoomStatus>, UnknownLabel> {
        match s.trim() {
            "" | "done" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl FromStr for RoomStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "waiting_room" | "waiting" => Ok(RoomStatus::WaitingRoom),
            "in_call" | "in_room" => Ok(RoomStatus::InCall),
            other => Err(unknown("room status", other)),
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    #[default]
    Booked,
    Adhoc,
}

impl BookingType {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingType::Booked => "booked",
            BookingType::Adhoc => "adhoc",
        }
    }
}

impl FromStr for BookingType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "booked" => Ok(BookingType::Booked),
            "adhoc" => Ok(BookingType::Adhoc),
            other => Err(unknown("booking type", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_pipeline_is_linear() {
        let mut seen = vec![BookingStatus::Prebooked];
        while let Some(next) = seen.last().and_then(|s| s.next()) {
            seen.push(next);
        }
        assert_eq!(seen, BookingStatus::ALL.to_vec());
        assert_eq!(BookingStatus::Completed.next(), None);
    }

    #[test]
    fn test_status_labels_parse_back() {
        for s in BookingStatus::ALL {
            assert_eq!(s.as_str().parse::<BookingStatus>(), Ok(s));
        }
        for ps in PatientStatus::ALL {
            assert_eq!(ps.as_str().parse::<PatientStatus>(), Ok(ps));
        }
        assert_eq!(" in_office ".parse::<BookingStatus>(), Ok(BookingStatus::InOffice));
        assert!("done".parse::<BookingStatus>().is_err());
        assert!("ready for provider".parse::<PatientStatus>().is_err());
    }

    #[test]
    fn test_patient_status_json_uses_display_labels() {
        let json = serde_json::to_string(&PatientStatus::ReadyForDischarge).unwrap();
        assert_eq!(json, "\"Ready for Discharge\"");
        let ps: PatientStatus = serde_json::from_str("\"Ready for provider\"").unwrap();
        assert_eq!(ps, PatientStatus::ReadyForProvider);
    }

    #[test]
    fn test_patient_status_phases() {
        assert_eq!(PatientStatus::Intake.phase(), Some(ClinicalPhase::PreProvider));
        assert_eq!(PatientStatus::Provider.phase(), Some(ClinicalPhase::InConsult));
        assert_eq!(PatientStatus::Discharged.phase(), None);
        assert!(PatientStatus::ReadyForProvider.joins_call());
        assert!(!PatientStatus::Confirmed.joins_call());
    }

    #[test]
    fn test_room_status_accepts_legacy_vocabulary() {
        assert_eq!("waiting".parse::<RoomStatus>(), Ok(RoomStatus::WaitingRoom));
        assert_eq!("in_room".parse::<RoomStatus>(), Ok(RoomStatus::InCall));
        assert_eq!(RoomStatus::parse_stored("done"), Ok(None));
        assert_eq!(RoomStatus::parse_stored("in_call"), Ok(Some(RoomStatus::InCall)));
        assert!(RoomStatus::parse_stored("hallway").is_err());

        let legacy: RoomStatus = serde_json::from_str("\"in_room\"").unwrap();
        assert_eq!(serde_json::to_string(&legacy).unwrap(), "\"in_call\"");
    }
}
