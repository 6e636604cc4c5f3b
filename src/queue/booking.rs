// src/queue/booking.rs

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QueueError;
use crate::queue::status::{BookingStatus, BookingType, PatientStatus, RoomStatus};

/// A booking as persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_name: String,
    pub booking_type: BookingType,
    pub booking_time: DateTime<Utc>,
    pub completed_time: Option<DateTime<Utc>>,
    pub chief_complaint: Option<String>,
    pub status: BookingStatus,
    pub patient_status: Option<PatientStatus>,
    pub room_status: Option<RoomStatus>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientBrief {
    pub name: String,
    pub dob: NaiveDate,
}

/// Booking joined with the minimal patient fields the queue displays.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingEntry {
    pub booking: Booking,
    pub patient: PatientBrief,
}

/* ============================================================
   Create form
   ============================================================ */

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBooking {
    #[serde(default)]
    pub provider_name: String,
    pub chief_complaint: Option<String>,
    #[serde(default)]
    pub booking_time: String,
    pub booking_type: Option<BookingType>,
}

/// A create form that passed validation, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub provider_name: String,
    pub chief_complaint: Option<String>,
    pub booking_time: DateTime<Utc>,
    pub booking_type: BookingType,
}

impl NewBooking {
    /// `offset` is the clinic's UTC offset, used for `datetime-local` input
    /// that carries no zone of its own.
    pub fn validate(&self, offset: FixedOffset) -> Result<ValidatedBooking, QueueError> {
        let provider_name = self.provider_name.trim();
        if provider_name.is_empty() {
            return Err(QueueError::Validation("provider_name is required".into()));
        }

        let booking_time = parse_booking_time(&self.booking_time, offset)?;

        let chief_complaint = self
            .chief_complaint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(ValidatedBooking {
            provider_name: provider_name.to_string(),
            chief_complaint,
            booking_time,
            booking_type: self.booking_type.unwrap_or_default(),
        })
    }
}

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub fn parse_booking_time(raw: &str, offset: FixedOffset) -> Result<DateTime<Utc>, QueueError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(QueueError::Validation("booking_time is required".into()));
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    for fmt in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            // fixed offsets have no gaps or folds
            if let Some(local) = offset.from_local_datetime(&naive).single() {
                return Ok(local.with_timezone(&Utc));
            }
        }
    }

    Err(QueueError::Validation(format!(
        "booking_time is not a valid timestamp: {raw:?}"
    )))
}

/* ============================================================
   Derived waiting time
   ============================================================ */

/// Whole minutes the patient has been waiting so far. `None` once completed
/// or before the booking time.
pub fn waiting_minutes(b: &Booking, now: DateTime<Utc>) -> Option<i64> {
    if b.status == BookingStatus::Completed || now < b.booking_time {
        return None;
    }
    Some((now - b.booking_time).num_minutes())
}

/// Whole minutes from booking time to completion.
pub fn total_wait_minutes(b: &Booking) -> Option<i64> {
    let completed = b.completed_time?;
    if completed < b.booking_time {
        return None;
    }
    Some((completed - b.booking_time).num_minutes())
}
