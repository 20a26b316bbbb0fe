use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::repository::BookingRepository;
use atelier_core::{Booking, BookingStatus, Error};

use crate::database::map_sqlx;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    room_id: Uuid,
    studio_id: Uuid,
    assignee_id: Option<Uuid>,
    subject: String,
    is_all_day: bool,
    status: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, Error> {
        Ok(Booking {
            id: self.id,
            room_id: self.room_id,
            studio_id: self.studio_id,
            assignee_id: self.assignee_id,
            subject: self.subject,
            is_all_day: self.is_all_day,
            status: BookingStatus::parse(&self.status)?,
            start_time: self.start_time,
            end_time: self.end_time,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, room_id, studio_id, assignee_id, subject, is_all_day, status, start_time, end_time, created_at, updated_at";

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Booking>, Error> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn find_by_resource_and_range(
        &self,
        room_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, Error> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings \
             WHERE room_id = $1 AND start_time < $3 AND end_time > $2 \
             ORDER BY created_at",
            BOOKING_COLUMNS
        ))
        .bind(room_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn list(&self, room_id: Option<Uuid>) -> Result<Vec<Booking>, Error> {
        let rows: Vec<BookingRow> = match room_id {
            Some(room) => sqlx::query_as(&format!(
                "SELECT {} FROM bookings WHERE room_id = $1 ORDER BY created_at",
                BOOKING_COLUMNS
            ))
            .bind(room)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?,
            None => sqlx::query_as(&format!(
                "SELECT {} FROM bookings ORDER BY created_at",
                BOOKING_COLUMNS
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?,
        };

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn save(&self, booking: &Booking) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO bookings (id, room_id, studio_id, assignee_id, subject, is_all_day, status, start_time, end_time, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (id) DO UPDATE SET \
                assignee_id = EXCLUDED.assignee_id, \
                subject = EXCLUDED.subject, \
                is_all_day = EXCLUDED.is_all_day, \
                status = EXCLUDED.status, \
                start_time = EXCLUDED.start_time, \
                end_time = EXCLUDED.end_time, \
                updated_at = EXCLUDED.updated_at",
        )
        .bind(booking.id)
        .bind(booking.room_id)
        .bind(booking.studio_id)
        .bind(booking.assignee_id)
        .bind(&booking.subject)
        .bind(booking.is_all_day)
        .bind(booking.status.as_str())
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: BookingStatus) -> Result<(), Error> {
        let result = sqlx::query("UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("booking {}", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), Error> {
        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}
