use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::repository::ChargeRepository;
use atelier_core::{Charge, Error};

use crate::database::map_sqlx;

pub struct PgChargeRepository {
    pool: PgPool,
}

impl PgChargeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ChargeRow {
    id: Uuid,
    owner_email: String,
    artist_email: String,
    credits: i64,
    confirmed: bool,
    confirmation_token: Option<String>,
    booking_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<ChargeRow> for Charge {
    fn from(row: ChargeRow) -> Self {
        Charge {
            id: row.id,
            owner_email: row.owner_email,
            artist_email: row.artist_email,
            credits: row.credits,
            confirmed: row.confirmed,
            confirmation_token: row.confirmation_token,
            booking_id: row.booking_id,
            created_at: row.created_at,
        }
    }
}

const CHARGE_COLUMNS: &str =
    "id, owner_email, artist_email, credits, confirmed, confirmation_token, booking_id, created_at";

#[async_trait]
impl ChargeRepository for PgChargeRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Charge>, Error> {
        let row: Option<ChargeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM charges WHERE id = $1",
            CHARGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Charge::from))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Charge>, Error> {
        let row: Option<ChargeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM charges WHERE confirmation_token = $1",
            CHARGE_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Charge::from))
    }

    async fn save(&self, charge: &Charge) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO charges (id, owner_email, artist_email, credits, confirmed, confirmation_token, booking_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET \
                confirmed = EXCLUDED.confirmed, \
                confirmation_token = EXCLUDED.confirmation_token, \
                booking_id = EXCLUDED.booking_id",
        )
        .bind(charge.id)
        .bind(&charge.owner_email)
        .bind(&charge.artist_email)
        .bind(charge.credits)
        .bind(charge.confirmed)
        .bind(&charge.confirmation_token)
        .bind(charge.booking_id)
        .bind(charge.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn consume(&self, id: Uuid, confirmed: bool) -> Result<(), Error> {
        let result = sqlx::query(
            "UPDATE charges SET confirmation_token = NULL, confirmed = confirmed OR $1 WHERE id = $2",
        )
        .bind(confirmed)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("charge {}", id)));
        }
        Ok(())
    }
}
