// src/store/memory.rs

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Patient;
use crate::queue::booking::{Booking, BookingEntry, PatientBrief};
use crate::queue::status::BookingStatus;
use crate::store::{BookingInsert, BookingQuery, BookingStore, BookingUpdate, StoreError};

/// In-process store with the same query semantics as `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    bookings: Mutex<Vec<Booking>>,
    patients: Mutex<Vec<Patient>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn add_patient(&self, patient: Patient) {
        self.patients.lock().unwrap().push(patient);
    }

    /// Puts a row in place as-is, bypassing the lifecycle checks.
    pub fn put_booking(&self, booking: Booking) {
        self.bookings.lock().unwrap().push(booking);
    }

    pub fn booking(&self, id: Uuid) -> Option<Booking> {
        self.bookings.lock().unwrap().iter().find(|b| b.id == id).cloned()
    }

    /// While offline every call fails like a dropped connection.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn query_bookings(&self, q: &BookingQuery) -> Result<Vec<BookingEntry>, StoreError> {
        self.check_online()?;
        let patients = self.patients.lock().unwrap();
        let bookings = self.bookings.lock().unwrap();

        let mut out: Vec<BookingEntry> = bookings
            .iter()
            .filter(|b| b.booking_time >= q.since)
            .filter(|b| q.patient_id.is_none_or(|p| b.patient_id == p))
            .filter(|b| q.status.is_none_or(|s| b.status == s))
            .filter_map(|b| {
                let p = patients.iter().find(|p| p.id == b.patient_id)?;
                Some(BookingEntry {
                    booking: b.clone(),
                    patient: PatientBrief {
                        name: p.name.clone(),
                        dob: p.dob,
                    },
                })
            })
            .collect();
        out.sort_by_key(|e| (e.booking.booking_time, e.booking.id));
        Ok(out)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.check_online()?;
        Ok(self.booking(id))
    }

    async fn insert_booking(&self, row: &BookingInsert) -> Result<Booking, StoreError> {
        self.check_online()?;
        let booking = Booking {
            id: Uuid::new_v4(),
            patient_id: row.patient_id,
            provider_name: row.provider_name.clone(),
            booking_type: row.booking_type,
            booking_time: row.booking_time,
            completed_time: None,
            chief_complaint: row.chief_complaint.clone(),
            status: row.status,
            patient_status: None,
            room_status: row.room_status,
            created_at: row.created_at,
        };
        self.bookings.lock().unwrap().push(booking.clone());
        Ok(booking)
    }

    async fn update_booking(
        &self,
        id: Uuid,
        expected_status: Option<BookingStatus>,
        update: &BookingUpdate,
    ) -> Result<Option<Booking>, StoreError> {
        self.check_online()?;
        let mut bookings = self.bookings.lock().unwrap();
        let Some(b) = bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if expected_status.is_some_and(|s| b.status != s) {
            return Ok(None);
        }

        if let Some(s) = update.status {
            b.status = s;
        }
        if let Some(t) = update.completed_time {
            b.completed_time = Some(t);
        }
        if let Some(ps) = update.patient_status {
            b.patient_status = Some(ps);
        }
        if let Some(room) = update.room_status {
            b.room_status = room;
        }
        Ok(Some(b.clone()))
    }

    async fn count_by_status(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(BookingStatus, i64)>, StoreError> {
        self.check_online()?;
        let bookings = self.bookings.lock().unwrap();
        Ok(BookingStatus::ALL
            .into_iter()
            .map(|s| {
                let n = bookings
                    .iter()
                    .filter(|b| b.status == s && b.booking_time >= since)
                    .count();
                (s, n as i64)
            })
            .filter(|(_, n)| *n > 0)
            .collect())
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        self.check_online()?;
        Ok(self
            .patients
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn search_patients(
        &self,
        name_contains: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Patient>, StoreError> {
        self.check_online()?;
        let needle = name_contains.map(|s| s.trim().to_lowercase());
        let mut out: Vec<Patient> = self
            .patients
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.role == crate::models::Role::Patient)
            .filter(|p| {
                needle
                    .as_deref()
                    .is_none_or(|n| p.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(out)
    }
}
