// src/queue/counts.rs

use serde::Serialize;

use crate::queue::status::BookingStatus;

/// Per-status totals for the tab badges. Always carries all three statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub prebooked: u64,
    pub in_office: u64,
    pub completed: u64,
}

impl StatusCounts {
    pub fn from_rows(rows: impl IntoIterator<Item = (BookingStatus, i64)>) -> Self {
        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            let n = u64::try_from(n).unwrap_or(0);
            match status {
                BookingStatus::Prebooked => counts.prebooked += n,
                BookingStatus::InOffice => counts.in_office += n,
                BookingStatus::Completed => counts.completed += n,
            }
        }
        counts
    }

    pub fn total(&self) -> u64 {
        self.prebooked + self.in_office + self.completed
    }
}
