//! Storage boundary consumed by the queue. `PgStore` is the production
//! implementation; tests drive the queue through `MemoryStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Patient;
use crate::queue::booking::{Booking, BookingEntry};
use crate::queue::status::{BookingStatus, BookingType, PatientStatus, RoomStatus};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("row decode error: {0}")]
    Decode(String),
}

/// Rows with `booking_time >= since`, optionally narrowed by patient and
/// status, always ascending by `booking_time`.
#[derive(Debug, Clone, Copy)]
pub struct BookingQuery {
    pub since: DateTime<Utc>,
    pub patient_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone)]
pub struct BookingInsert {
    pub patient_id: Uuid,
    pub provider_name: String,
    pub booking_type: BookingType,
    pub booking_time: DateTime<Utc>,
    pub chief_complaint: Option<String>,
    pub status: BookingStatus,
    pub room_status: Option<RoomStatus>,
    pub created_at: DateTime<Utc>,
}

/// Field set for a single-row update. `None` leaves a column unchanged;
/// `room_status: Some(None)` clears the room.
#[derive(Debug, Clone, Default)]
pub struct BookingUpdate {
    pub status: Option<BookingStatus>,
    pub completed_time: Option<DateTime<Utc>>,
    pub patient_status: Option<PatientStatus>,
    pub room_status: Option<Option<RoomStatus>>,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn query_bookings(&self, q: &BookingQuery) -> Result<Vec<BookingEntry>, StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn insert_booking(&self, row: &BookingInsert) -> Result<Booking, StoreError>;

    /// Applies `update` atomically, only if the row still has
    /// `expected_status` (when given). Returns the updated row, or `None`
    /// when the row is missing or the guard did not match.
    async fn update_booking(
        &self,
        id: Uuid,
        expected_status: Option<BookingStatus>,
        update: &BookingUpdate,
    ) -> Result<Option<Booking>, StoreError>;

    async fn count_by_status(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(BookingStatus, i64)>, StoreError>;

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError>;

    async fn search_patients(
        &self,
        name_contains: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Patient>, StoreError>;
}
