use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::charge::Charge;
use crate::error::Error;
use crate::identity::User;
use crate::studio::{Studio, StudioQuery, StudioWithDistance};

/// Repository trait for booking records.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Booking>, Error>;

    /// All bookings for a room whose range intersects `[start, end)`,
    /// ordered by creation time.
    async fn find_by_resource_and_range(
        &self,
        room_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, Error>;

    /// All bookings, optionally restricted to one room.
    async fn list(&self, room_id: Option<Uuid>) -> Result<Vec<Booking>, Error>;

    async fn save(&self, booking: &Booking) -> Result<(), Error>;

    async fn set_status(&self, id: Uuid, status: BookingStatus) -> Result<(), Error>;

    async fn delete(&self, id: Uuid) -> Result<(), Error>;
}

/// Repository trait for studio records.
#[async_trait]
pub trait StudioRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Studio>, Error>;

    /// The studio containing the given room, if any.
    async fn find_by_room(&self, room_id: Uuid) -> Result<Option<Studio>, Error>;

    /// Filtered, optionally geo-ordered listing. When the query carries
    /// an origin, results come back nearest first with distances filled.
    async fn list(&self, query: &StudioQuery) -> Result<Vec<StudioWithDistance>, Error>;

    async fn save(&self, studio: &Studio) -> Result<(), Error>;

    async fn delete(&self, id: Uuid) -> Result<(), Error>;
}

/// Repository trait for pending credit charges.
#[async_trait]
pub trait ChargeRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Charge>, Error>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Charge>, Error>;

    async fn save(&self, charge: &Charge) -> Result<(), Error>;

    /// Clears the single-use confirmation token, marking the charge
    /// confirmed when `confirmed` is set.
    async fn consume(&self, id: Uuid, confirmed: bool) -> Result<(), Error>;
}

/// Repository trait for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<User>, Error>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    async fn find_by_email_token(&self, token: &str) -> Result<Option<User>, Error>;

    async fn save(&self, user: &User) -> Result<(), Error>;

    /// Applies a signed adjustment to a user's credit balance.
    async fn adjust_credit(&self, email: &str, delta: i64) -> Result<(), Error>;
}

/// The transactional unit for booking confirmation: debit the artist,
/// credit the owner, flip the booking to `Booked` and consume the charge
/// in a single unit where the backing store supports transactions.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn settle_confirmation(
        &self,
        charge_id: Uuid,
        artist_email: &str,
        owner_email: &str,
        amount: i64,
        booking_id: Uuid,
    ) -> Result<(), Error>;
}
