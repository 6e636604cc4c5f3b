// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Patient, Role};
use crate::queue::booking::{Booking, BookingEntry, PatientBrief};
use crate::queue::status::{BookingStatus, RoomStatus};
use crate::store::{BookingInsert, BookingQuery, BookingStore, BookingUpdate, StoreError};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/* ============================================================
   Row models (enum columns are TEXT with CHECK constraints)
   ============================================================ */

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    patient_id: Uuid,
    provider_name: String,
    booking_type: String,
    booking_time: DateTime<Utc>,
    completed_time: Option<DateTime<Utc>>,
    chief_complaint: Option<String>,
    status: String,
    patient_status: Option<String>,
    room_status: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct BookingEntryRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    patient_name: String,
    patient_dob: NaiveDate,
}

#[derive(Debug, sqlx::FromRow)]
struct PatientRow {
    id: Uuid,
    name: String,
    dob: NaiveDate,
    role: String,
    created_at: DateTime<Utc>,
}

fn decode<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Decode(e.to_string())
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(r: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: r.id,
            patient_id: r.patient_id,
            provider_name: r.provider_name,
            booking_type: r.booking_type.parse().map_err(decode)?,
            booking_time: r.booking_time,
            completed_time: r.completed_time,
            chief_complaint: r.chief_complaint,
            status: r.status.parse().map_err(decode)?,
            patient_status: r
                .patient_status
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(decode)?,
            room_status: match r.room_status.as_deref() {
                Some(s) => RoomStatus::parse_stored(s).map_err(decode)?,
                None => None,
            },
            created_at: r.created_at,
        })
    }
}

impl TryFrom<BookingEntryRow> for BookingEntry {
    type Error = StoreError;

    fn try_from(r: BookingEntryRow) -> Result<Self, Self::Error> {
        Ok(BookingEntry {
            booking: r.booking.try_into()?,
            patient: PatientBrief {
                name: r.patient_name,
                dob: r.patient_dob,
            },
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = StoreError;

    fn try_from(r: PatientRow) -> Result<Self, Self::Error> {
        Ok(Patient {
            id: r.id,
            name: r.name,
            dob: r.dob,
            role: r.role.parse::<Role>().map_err(decode)?,
            created_at: r.created_at,
        })
    }
}

/// `ILIKE` pattern matching `needle` literally anywhere in the value.
fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

const BOOKING_COLUMNS: &str = r#"
    id, patient_id, provider_name, booking_type, booking_time, completed_time,
    chief_complaint, status, patient_status, room_status, created_at
"#;

#[async_trait]
impl BookingStore for PgStore {
    async fn query_bookings(&self, q: &BookingQuery) -> Result<Vec<BookingEntry>, StoreError> {
        let rows: Vec<BookingEntryRow> = sqlx::query_as::<_, BookingEntryRow>(
            r#"
            SELECT
              b.id,
              b.patient_id,
              b.provider_name,
              b.booking_type,
              b.booking_time,
              b.completed_time,
              b.chief_complaint,
              b.status,
              b.patient_status,
              b.room_status,
              b.created_at,

              p.name AS patient_name,
              p.dob  AS patient_dob

            FROM booking b
            JOIN patient p ON p.id = b.patient_id

            WHERE b.booking_time >= $1
              AND ($2::uuid IS NULL OR b.patient_id = $2)
              AND ($3::text IS NULL OR b.status = $3)

            ORDER BY b.booking_time ASC, b.id ASC
            "#,
        )
        .bind(q.since)
        .bind(q.patient_id)
        .bind(q.status.map(BookingStatus::as_str))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(BookingEntry::try_from).collect()
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM booking WHERE id = $1");
        let row: Option<BookingRow> = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn insert_booking(&self, row: &BookingInsert) -> Result<Booking, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO booking (
              patient_id,
              provider_name,
              booking_type,
              booking_time,
              chief_complaint,
              status,
              room_status,
              created_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let inserted: BookingRow = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(row.patient_id)
            .bind(&row.provider_name)
            .bind(row.booking_type.as_str())
            .bind(row.booking_time)
            .bind(row.chief_complaint.as_deref())
            .bind(row.status.as_str())
            .bind(row.room_status.map(RoomStatus::as_str))
            .bind(row.created_at)
            .fetch_one(&self.db)
            .await?;

        inserted.try_into()
    }

    async fn update_booking(
        &self,
        id: Uuid,
        expected_status: Option<BookingStatus>,
        update: &BookingUpdate,
    ) -> Result<Option<Booking>, StoreError> {
        // CASE instead of COALESCE for room_status so it can be set to NULL
        let sql = format!(
            r#"
            UPDATE booking
            SET
              status         = COALESCE($3::text, status),
              completed_time = COALESCE($4::timestamptz, completed_time),
              patient_status = COALESCE($5::text, patient_status),
              room_status    = CASE WHEN $6::boolean THEN $7::text ELSE room_status END
            WHERE id = $1
              AND ($2::text IS NULL OR status = $2)
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let row: Option<BookingRow> = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .bind(expected_status.map(BookingStatus::as_str))
            .bind(update.status.map(BookingStatus::as_str))
            .bind(update.completed_time)
            .bind(update.patient_status.map(|ps| ps.as_str()))
            .bind(update.room_status.is_some())
            .bind(update.room_status.flatten().map(RoomStatus::as_str))
            .fetch_optional(&self.db)
            .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn count_by_status(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(BookingStatus, i64)>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) AS n
            FROM booking
            WHERE booking_time >= $1
            GROUP BY status
            "#,
        )
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|(s, n)| Ok((s.parse::<BookingStatus>().map_err(decode)?, n)))
            .collect()
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        let row: Option<PatientRow> = sqlx::query_as::<_, PatientRow>(
            r#"
            SELECT id, name, dob, role, created_at
            FROM patient
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Patient::try_from).transpose()
    }

    async fn search_patients(
        &self,
        name_contains: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Patient>, StoreError> {
        let like = name_contains
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let rows: Vec<PatientRow> = sqlx::query_as::<_, PatientRow>(
            r#"
            SELECT id, name, dob, role, created_at
            FROM patient
            WHERE role = 'patient'
              AND ($1::text IS NULL OR name ILIKE $1 ESCAPE '\')
            ORDER BY name ASC
            LIMIT $2
            "#,
        )
        .bind(like)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Patient::try_from).collect()
    }
}
