use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use atelier_core::repository::{CreditLedger, UserRepository};
use atelier_core::{BookingStatus, Error, Role, User};

use crate::database::map_sqlx;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    credit: i64,
    confirmed: bool,
    email_token: Option<String>,
    password_hash: String,
    payout_account: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, Error> {
        let role = match self.role.as_str() {
            "owner" => Role::Owner,
            "artist" => Role::Artist,
            other => return Err(Error::Unavailable(format!("unknown role '{}'", other))),
        };
        Ok(User {
            id: self.id,
            email: self.email,
            name: self.name,
            role,
            credit: self.credit,
            confirmed: self.confirmed,
            email_token: self.email_token,
            password_hash: self.password_hash,
            payout_account: self.payout_account,
            created_at: self.created_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, email, name, role, credit, confirmed, email_token, password_hash, payout_account, created_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find(&self, id: Uuid) -> Result<Option<User>, Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email_token(&self, token: &str) -> Result<Option<User>, Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE email_token = $1",
            USER_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn save(&self, user: &User) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO users (id, email, name, role, credit, confirmed, email_token, password_hash, payout_account, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET \
                name = EXCLUDED.name, \
                role = EXCLUDED.role, \
                credit = EXCLUDED.credit, \
                confirmed = EXCLUDED.confirmed, \
                email_token = EXCLUDED.email_token, \
                password_hash = EXCLUDED.password_hash, \
                payout_account = EXCLUDED.payout_account",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.credit)
        .bind(user.confirmed)
        .bind(&user.email_token)
        .bind(&user.password_hash)
        .bind(&user.payout_account)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn adjust_credit(&self, email: &str, delta: i64) -> Result<(), Error> {
        let result = sqlx::query("UPDATE users SET credit = credit + $1 WHERE email = $2")
            .bind(delta)
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("user {}", email)));
        }
        Ok(())
    }
}

/// Transactional settle for booking confirmation: both balance moves,
/// the booking status flip and the charge consumption commit or roll
/// back together.
pub struct PgCreditLedger {
    pool: PgPool,
}

impl PgCreditLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditLedger for PgCreditLedger {
    async fn settle_confirmation(
        &self,
        charge_id: Uuid,
        artist_email: &str,
        owner_email: &str,
        amount: i64,
        booking_id: Uuid,
    ) -> Result<(), Error> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query("UPDATE users SET credit = credit - $1 WHERE email = $2")
            .bind(amount)
            .bind(artist_email)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        sqlx::query("UPDATE users SET credit = credit + $1 WHERE email = $2")
            .bind(amount)
            .bind(owner_email)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        sqlx::query("UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(BookingStatus::Booked.as_str())
            .bind(booking_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        sqlx::query(
            "UPDATE charges SET confirmed = TRUE, confirmation_token = NULL WHERE id = $1",
        )
        .bind(charge_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        info!(%charge_id, %booking_id, amount, "confirmation settled");
        Ok(())
    }
}
