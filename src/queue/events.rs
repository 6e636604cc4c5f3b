// src/queue/events.rs

use serde::Serialize;
use uuid::Uuid;

use crate::models::Session;
use crate::queue::booking::Booking;
use crate::queue::status::BookingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEventKind {
    Created,
    Advanced,
    PatientStatusChanged,
    RoomChanged,
}

impl QueueEventKind {
    /// Only creates and stage moves change the per-status totals.
    pub fn invalidates_counts(self) -> bool {
        matches!(self, QueueEventKind::Created | QueueEventKind::Advanced)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueEventKind::Created => "created",
            QueueEventKind::Advanced => "advanced",
            QueueEventKind::PatientStatusChanged => "patient_status_changed",
            QueueEventKind::RoomChanged => "room_changed",
        }
    }
}

/// Emitted after a booking change commits, so views can refresh without
/// polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEvent {
    pub kind: QueueEventKind,
    pub booking_id: Uuid,
    pub patient_id: Uuid,
    pub status: BookingStatus,
    /// Tab totals must be re-fetched.
    pub counts_stale: bool,
}

impl QueueEvent {
    pub fn new(kind: QueueEventKind, booking: &Booking) -> Self {
        QueueEvent {
            kind,
            booking_id: booking.id,
            patient_id: booking.patient_id,
            status: booking.status,
            counts_stale: kind.invalidates_counts(),
        }
    }

    /// Staff see every change; a patient only changes to their own bookings.
    pub fn visible_to(&self, session: &Session) -> bool {
        session.is_staff() || self.patient_id == session.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::queue::booking::tests::sample_booking;
    use chrono::{TimeZone, Utc};

    fn event(kind: QueueEventKind) -> QueueEvent {
        let b = sample_booking(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
        QueueEvent::new(kind, &b)
    }

    #[test]
    fn test_patients_only_see_their_own_changes() {
        let ev = event(QueueEventKind::Advanced);
        let owner = Session {
            user_id: ev.patient_id,
            role: Role::Patient,
        };
        let other = Session {
            user_id: Uuid::new_v4(),
            role: Role::Patient,
        };
        let staff = Session {
            user_id: Uuid::new_v4(),
            role: Role::Staff,
        };

        assert!(ev.visible_to(&owner));
        assert!(!ev.visible_to(&other));
        assert!(ev.visible_to(&staff));
    }

    #[test]
    fn test_counts_stale_is_serialized() {
        let json = serde_json::to_value(event(QueueEventKind::Created)).unwrap();
        assert_eq!(json["kind"], "created");
        assert_eq!(json["counts_stale"], true);

        let json = serde_json::to_value(event(QueueEventKind::PatientStatusChanged)).unwrap();
        assert_eq!(json["counts_stale"], false);
    }
}
