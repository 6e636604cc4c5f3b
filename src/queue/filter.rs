// src/queue/filter.rs

use std::collections::HashSet;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::{Role, Session};
use crate::queue::booking::BookingEntry;
use crate::queue::status::{BookingStatus, PatientStatus};

/// Which bookings a caller may see. Staff look at one coarse-status tab at a
/// time across all patients; a patient sees only their own bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Staff { status: BookingStatus },
    Patient { patient_id: Uuid },
}

impl Scope {
    /// A patient always gets their own scope, whatever tab was requested.
    pub fn for_session(session: &Session, requested: Option<BookingStatus>) -> Scope {
        match session.role {
            Role::Staff => Scope::Staff {
                status: requested.unwrap_or(BookingStatus::Prebooked),
            },
            Role::Patient => Scope::Patient {
                patient_id: session.user_id,
            },
        }
    }

    pub fn ensure_permitted(&self, session: &Session) -> Result<(), QueueError> {
        match (self, session.role) {
            (_, Role::Staff) => Ok(()),
            (Scope::Patient { patient_id }, Role::Patient) if *patient_id == session.user_id => Ok(()),
            _ => Err(QueueError::Forbidden(
                "patients can only view their own bookings".into(),
            )),
        }
    }
}

/// Filters applied after the store query. All optional, AND-combined.
#[derive(Debug, Clone, Default)]
pub struct BookingFilters {
    pub provider_name_contains: Option<String>,
    pub patient_name_contains: Option<String>,
    pub patient_status_in: HashSet<PatientStatus>,
}

fn needle(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

impl BookingFilters {
    pub fn matches(&self, entry: &BookingEntry) -> bool {
        if let Some(n) = needle(&self.provider_name_contains) {
            if !entry.booking.provider_name.to_lowercase().contains(&n) {
                return false;
            }
        }
        if let Some(n) = needle(&self.patient_name_contains) {
            if !entry.patient.name.to_lowercase().contains(&n) {
                return false;
            }
        }
        if self.filters_patient_status() {
            match entry.booking.patient_status {
                Some(ps) if self.patient_status_in.contains(&ps) => {}
                _ => return false,
            }
        }
        true
    }

    /// Empty selection and "everything selected" both mean no filter.
    fn filters_patient_status(&self) -> bool {
        !self.patient_status_in.is_empty()
            && self.patient_status_in.len() < PatientStatus::ALL.len()
    }

    pub fn apply(&self, entries: Vec<BookingEntry>) -> Vec<BookingEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

/// Parses the comma-separated multi-select form, e.g. `Confirmed,Intake`.
pub fn parse_patient_status_list(raw: &str) -> Result<HashSet<PatientStatus>, QueueError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<PatientStatus>()
                .map_err(|e| QueueError::Validation(e.to_string()))
        })
        .collect()
}

/// Midnight of `now`'s calendar day in the clinic offset.
pub fn start_of_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = now.with_timezone(&offset).date_naive().and_time(NaiveTime::MIN);
    let utc_midnight = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::<Utc>::from_naive_utc_and_offset(utc_midnight, Utc)
}
