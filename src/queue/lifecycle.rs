// src/queue/lifecycle.rs

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::Session;
use crate::queue::booking::{Booking, BookingEntry, NewBooking};
use crate::queue::clock::Clock;
use crate::queue::counts::StatusCounts;
use crate::queue::events::{QueueEvent, QueueEventKind};
use crate::queue::filter::{start_of_day, BookingFilters, Scope};
use crate::queue::rooms::{group_by_room, RoomGroups};
use crate::queue::status::{BookingStatus, PatientStatus, RoomStatus};
use crate::store::{BookingInsert, BookingQuery, BookingStore, BookingUpdate};

const EVENT_BUFFER: usize = 64;

/// Single entry point for reading and changing bookings.
///
/// Every read is a fresh snapshot from the store; nothing is cached between
/// calls. Writes are single guarded updates, so a failed call leaves the
/// booking exactly as it was.
pub struct QueueService {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    events: broadcast::Sender<QueueEvent>,
}

fn ensure_staff(session: &Session, action: &str) -> Result<(), QueueError> {
    if session.is_staff() {
        Ok(())
    } else {
        Err(QueueError::Forbidden(format!("Only staff can {action}")))
    }
}

impl QueueService {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            store,
            clock,
            offset,
            events,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn store(&self) -> &dyn BookingStore {
        self.store.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    fn publish(&self, kind: QueueEventKind, booking: &Booking) {
        // no subscribers is fine
        let _ = self.events.send(QueueEvent::new(kind, booking));
    }

    fn today_start(&self) -> DateTime<Utc> {
        start_of_day(self.now(), self.offset)
    }

    /* ============================================================
       Reads
       ============================================================ */

    /// Bookings from the start of today onward, ascending by booking time.
    pub async fn list_bookings(
        &self,
        session: &Session,
        scope: Scope,
        filters: &BookingFilters,
    ) -> Result<Vec<BookingEntry>, QueueError> {
        scope.ensure_permitted(session)?;

        let since = self.today_start();
        let query = match scope {
            Scope::Staff { status } => BookingQuery {
                since,
                patient_id: None,
                status: Some(status),
            },
            Scope::Patient { patient_id } => BookingQuery {
                since,
                patient_id: Some(patient_id),
                status: None,
            },
        };

        let rows = self.store.query_bookings(&query).await?;
        let fetched = rows.len();
        let out = filters.apply(rows);
        debug!(?scope, fetched, returned = out.len(), "listed bookings");
        Ok(out)
    }

    /// Tab badge totals from the start of today, ignoring any view filters.
    pub async fn counts_by_status(&self) -> Result<StatusCounts, QueueError> {
        let rows = self.store.count_by_status(self.today_start()).await?;
        let counts = StatusCounts::from_rows(rows);
        debug!(total = counts.total(), "counted bookings");
        Ok(counts)
    }

    /// The in-office tab split into waiting room and in call.
    pub async fn room_groups(
        &self,
        session: &Session,
        filters: &BookingFilters,
    ) -> Result<RoomGroups, QueueError> {
        ensure_staff(session, "view room groups")?;
        let scope = Scope::Staff {
            status: BookingStatus::InOffice,
        };
        let entries = self.list_bookings(session, scope, filters).await?;
        Ok(group_by_room(entries))
    }

    /* ============================================================
       Writes
       ============================================================ */

    pub async fn create_booking(
        &self,
        session: &Session,
        patient_id: Uuid,
        form: &NewBooking,
    ) -> Result<Booking, QueueError> {
        if !session.is_staff() && patient_id != session.user_id {
            return Err(QueueError::Forbidden(
                "patients can only book for themselves".into(),
            ));
        }

        let valid = form.validate(self.offset)?;

        if self.store.get_patient(patient_id).await?.is_none() {
            return Err(QueueError::NotFound("patient"));
        }

        let row = BookingInsert {
            patient_id,
            provider_name: valid.provider_name,
            booking_type: valid.booking_type,
            booking_time: valid.booking_time,
            chief_complaint: valid.chief_complaint,
            status: BookingStatus::Prebooked,
            room_status: Some(RoomStatus::WaitingRoom),
            created_at: self.now(),
        };
        let booking = self.store.insert_booking(&row).await?;

        info!(
            booking_id = %booking.id,
            patient_id = %booking.patient_id,
            booking_time = %booking.booking_time,
            "booking created"
        );
        self.publish(QueueEventKind::Created, &booking);
        Ok(booking)
    }

    /// Moves a booking one stage forward: prebooked → in_office → completed.
    pub async fn advance_status(
        &self,
        session: &Session,
        booking_id: Uuid,
    ) -> Result<Booking, QueueError> {
        ensure_staff(session, "move bookings between stages")?;

        let current = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(QueueError::NotFound("booking"))?;

        let Some(next) = current.status.next() else {
            warn!(%booking_id, from = %current.status, "advance rejected: already terminal");
            return Err(QueueError::InvalidTransition {
                from: current.status,
            });
        };

        let mut update = BookingUpdate {
            status: Some(next),
            ..Default::default()
        };
        if next == BookingStatus::Completed {
            // completion never precedes the booking time
            update.completed_time = Some(self.now().max(current.booking_time));
            update.room_status = Some(None);
        }

        match self
            .store
            .update_booking(booking_id, Some(current.status), &update)
            .await?
        {
            Some(booking) => {
                info!(%booking_id, from = %current.status, to = %next, "booking advanced");
                self.publish(QueueEventKind::Advanced, &booking);
                Ok(booking)
            }
            None => Err(self.guard_missed(booking_id, "advance").await),
        }
    }

    /// Sets the clinical stage. No ordering is enforced between stages.
    pub async fn set_patient_status(
        &self,
        session: &Session,
        booking_id: Uuid,
        patient_status: PatientStatus,
    ) -> Result<Booking, QueueError> {
        ensure_staff(session, "change patient status")?;

        let update = BookingUpdate {
            patient_status: Some(patient_status),
            ..Default::default()
        };
        let booking = self
            .store
            .update_booking(booking_id, None, &update)
            .await?
            .ok_or(QueueError::NotFound("booking"))?;

        info!(%booking_id, %patient_status, "patient status set");
        self.publish(QueueEventKind::PatientStatusChanged, &booking);
        Ok(booking)
    }

    /// Moves an in-office patient between the waiting room and the call.
    pub async fn set_room_status(
        &self,
        session: &Session,
        booking_id: Uuid,
        room: RoomStatus,
    ) -> Result<Booking, QueueError> {
        ensure_staff(session, "move patients between rooms")?;

        let update = BookingUpdate {
            room_status: Some(Some(room)),
            ..Default::default()
        };
        match self
            .store
            .update_booking(booking_id, Some(BookingStatus::InOffice), &update)
            .await?
        {
            Some(booking) => {
                info!(%booking_id, %room, "room status set");
                self.publish(QueueEventKind::RoomChanged, &booking);
                Ok(booking)
            }
            None => Err(self.guard_missed(booking_id, "room change").await),
        }
    }

    /// Explains why a guarded update touched no row.
    async fn guard_missed(&self, booking_id: Uuid, action: &str) -> QueueError {
        match self.store.get_booking(booking_id).await {
            Ok(Some(b)) => {
                warn!(%booking_id, status = %b.status, action, "update rejected: status changed");
                QueueError::InvalidTransition { from: b.status }
            }
            Ok(None) => QueueError::NotFound("booking"),
            Err(e) => e.into(),
        }
    }
}
