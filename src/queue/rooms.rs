// src/queue/rooms.rs

use crate::queue::booking::BookingEntry;
use crate::queue::status::{BookingStatus, RoomStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct RoomGroup {
    pub room: RoomStatus,
    pub entries: Vec<BookingEntry>,
}

impl RoomGroup {
    fn new(room: RoomStatus) -> Self {
        RoomGroup {
            room,
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.room.label()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomGroups {
    pub waiting_room: RoomGroup,
    pub in_call: RoomGroup,
}

/// Splits in-office bookings by room, keeping input order within each group.
///
/// A booking with no room recorded is still in the building, so it is shown
/// in the waiting room. Bookings outside `in_office` are not part of either
/// group.
pub fn group_by_room(entries: Vec<BookingEntry>) -> RoomGroups {
    let mut groups = RoomGroups {
        waiting_room: RoomGroup::new(RoomStatus::WaitingRoom),
        in_call: RoomGroup::new(RoomStatus::InCall),
    };

    for e in entries {
        if e.booking.status != BookingStatus::InOffice {
            continue;
        }
        match e.booking.room_status.unwrap_or(RoomStatus::WaitingRoom) {
            RoomStatus::WaitingRoom => groups.waiting_room.entries.push(e),
            RoomStatus::InCall => groups.in_call.entries.push(e),
        }
    }

    groups
}
