// src/routes/booking_routes.rs

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::session::SessionContext,
    models::{ApiOk, AppState},
    queue::{
        booking::{total_wait_minutes, waiting_minutes, Booking, BookingEntry, NewBooking, PatientBrief},
        counts::StatusCounts,
        filter::{parse_patient_status_list, BookingFilters, Scope},
        rooms::RoomGroup,
        status::{BookingStatus, PatientStatus, RoomStatus},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/counts", get(get_counts))
        .route("/bookings/rooms", get(get_room_groups))
        .route("/bookings/events", get(booking_events))
        .route("/bookings/{booking_id}/advance", post(advance_booking))
        .route("/bookings/{booking_id}/patient_status", put(put_patient_status))
        .route("/bookings/{booking_id}/room_status", put(put_room_status))
}

/* ============================================================
   Response DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct BookingDto {
    #[serde(flatten)]
    pub booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientBrief>,
    pub waiting_minutes: Option<i64>,
    pub total_wait_minutes: Option<i64>,
    pub can_join_call: bool,
}

impl BookingDto {
    fn new(booking: Booking, patient: Option<PatientBrief>, now: DateTime<Utc>) -> Self {
        BookingDto {
            waiting_minutes: waiting_minutes(&booking, now),
            total_wait_minutes: total_wait_minutes(&booking),
            can_join_call: booking.patient_status.is_some_and(PatientStatus::joins_call),
            booking,
            patient,
        }
    }

    fn from_entry(e: BookingEntry, now: DateTime<Utc>) -> Self {
        BookingDto::new(e.booking, Some(e.patient), now)
    }
}

#[derive(Debug, Serialize)]
pub struct RoomGroupDto {
    pub room: RoomStatus,
    pub name: &'static str,
    pub count: usize,
    pub bookings: Vec<BookingDto>,
}

impl RoomGroupDto {
    fn new(group: RoomGroup, now: DateTime<Utc>) -> Self {
        RoomGroupDto {
            room: group.room,
            name: group.name(),
            count: group.entries.len(),
            bookings: group
                .entries
                .into_iter()
                .map(|e| BookingDto::from_entry(e, now))
                .collect(),
        }
    }
}

/* ============================================================
   Query params
   ============================================================ */

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub provider: Option<String>,
    pub patient: Option<String>,
    /// Comma-separated, e.g. `Confirmed,Intake`
    pub patient_status: Option<String>,
}

impl ListQuery {
    fn requested_status(&self) -> Result<Option<BookingStatus>, ApiError> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<BookingStatus>())
            .transpose()
            .map_err(|e| ApiError::validation(e.to_string()))
    }

    fn filters(&self) -> Result<BookingFilters, ApiError> {
        let patient_status_in = match self.patient_status.as_deref() {
            Some(raw) => parse_patient_status_list(raw)?,
            None => Default::default(),
        };
        Ok(BookingFilters {
            provider_name_contains: self.provider.clone(),
            patient_name_contains: self.patient.clone(),
            patient_status_in,
        })
    }
}

/* ============================================================
   GET /bookings
   ============================================================ */

pub async fn list_bookings(
    State(state): State<AppState>,
    auth: SessionContext,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiOk<Vec<BookingDto>>>, ApiError> {
    let session = auth.session();
    let scope = Scope::for_session(&session, q.requested_status()?);
    let filters = q.filters()?;

    let entries = state.queue.list_bookings(&session, scope, &filters).await?;
    let now = state.queue.now();

    Ok(Json(ApiOk {
        data: entries
            .into_iter()
            .map(|e| BookingDto::from_entry(e, now))
            .collect(),
    }))
}

/* ============================================================
   GET /bookings/counts
   ============================================================ */

pub async fn get_counts(
    State(state): State<AppState>,
    auth: SessionContext,
) -> Result<Json<ApiOk<StatusCounts>>, ApiError> {
    if !auth.session().is_staff() {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only staff can view queue totals".into(),
        ));
    }

    let counts = state.queue.counts_by_status().await?;
    Ok(Json(ApiOk { data: counts }))
}

/* ============================================================
   GET /bookings/rooms
   ============================================================ */

pub async fn get_room_groups(
    State(state): State<AppState>,
    auth: SessionContext,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiOk<Vec<RoomGroupDto>>>, ApiError> {
    let filters = q.filters()?;
    let groups = state.queue.room_groups(&auth.session(), &filters).await?;
    let now = state.queue.now();

    Ok(Json(ApiOk {
        data: vec![
            RoomGroupDto::new(groups.waiting_room, now),
            RoomGroupDto::new(groups.in_call, now),
        ],
    }))
}

/* ============================================================
   POST /bookings (create)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Patients book for themselves; staff must name the patient.
    pub patient_id: Option<Uuid>,
    #[serde(flatten)]
    pub form: NewBooking,
}

pub async fn create_booking(
    State(state): State<AppState>,
    auth: SessionContext,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<ApiOk<BookingDto>>, ApiError> {
    let session = auth.session();
    let patient_id = match req.patient_id {
        Some(id) => id,
        None if !session.is_staff() => session.user_id,
        None => return Err(ApiError::validation("patient_id is required")),
    };

    let booking = state
        .queue
        .create_booking(&session, patient_id, &req.form)
        .await?;

    Ok(Json(ApiOk {
        data: BookingDto::new(booking, None, state.queue.now()),
    }))
}

/* ============================================================
   Transitions
   ============================================================ */

pub async fn advance_booking(
    State(state): State<AppState>,
    auth: SessionContext,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<ApiOk<BookingDto>>, ApiError> {
    let booking = state
        .queue
        .advance_status(&auth.session(), booking_id)
        .await?;

    Ok(Json(ApiOk {
        data: BookingDto::new(booking, None, state.queue.now()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PatientStatusRequest {
    pub patient_status: PatientStatus,
}

pub async fn put_patient_status(
    State(state): State<AppState>,
    auth: SessionContext,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<PatientStatusRequest>,
) -> Result<Json<ApiOk<BookingDto>>, ApiError> {
    let booking = state
        .queue
        .set_patient_status(&auth.session(), booking_id, req.patient_status)
        .await?;

    Ok(Json(ApiOk {
        data: BookingDto::new(booking, None, state.queue.now()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RoomStatusRequest {
    pub room_status: RoomStatus,
}

pub async fn put_room_status(
    State(state): State<AppState>,
    auth: SessionContext,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<RoomStatusRequest>,
) -> Result<Json<ApiOk<BookingDto>>, ApiError> {
    let booking = state
        .queue
        .set_room_status(&auth.session(), booking_id, req.room_status)
        .await?;

    Ok(Json(ApiOk {
        data: BookingDto::new(booking, None, state.queue.now()),
    }))
}

/* ============================================================
   GET /bookings/events (server-sent events)
   ============================================================ */

pub async fn booking_events(
    State(state): State<AppState>,
    auth: SessionContext,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let session = auth.session();
    let rx = state.queue.subscribe();

    let events = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.visible_to(&session) => {
                    let event = Event::default().event(ev.kind.as_str()).json_data(&ev);
                    return Some((event, rx));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged; asking client to resync");
                    return Some((Ok(Event::default().event("resync").data("{}")), rx));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
