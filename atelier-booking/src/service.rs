use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use atelier_core::payment::PaymentGateway;
use atelier_core::repository::{
    BookingRepository, ChargeRepository, CreditLedger, StudioRepository, UserRepository,
};
use atelier_core::{Booking, BookingStatus, Error};

use crate::engine::{Availability, AvailabilityEngine};

/// Tunable business rules, passed in explicitly rather than read from
/// the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRules {
    /// Platform fee charged to the artist on instant bookings, in basis
    /// points of the credit amount.
    pub platform_fee_bps: i64,
    /// Freshness window for charge confirmation tokens, in hours.
    pub confirmation_window_hours: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            platform_fee_bps: 1500,
            confirmation_window_hours: 24,
        }
    }
}

/// Which flow a booking came from. Charge-backed bookings start out
/// `Pending`; owner blocks go straight to `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BookingOrigin {
    Charge,
    OwnerBlock,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub room_id: Uuid,
    pub studio_id: Uuid,
    pub subject: String,
    pub is_all_day: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub origin: BookingOrigin,
    pub charge_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub subject: Option<String>,
    pub is_all_day: Option<bool>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone)]
pub struct InstantBooking {
    pub artist_id: Uuid,
    pub room_id: Uuid,
    pub studio_id: Uuid,
    pub subject: String,
    pub is_all_day: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub credits: i64,
}

/// A booking annotated with whether the requester may still edit it.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedBooking {
    #[serde(flatten)]
    pub booking: Booking,
    pub is_changeable: bool,
}

/// Availability for one room, plus the studio it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct RoomAvailability {
    pub studio_id: Uuid,
    #[serde(flatten)]
    pub availability: Availability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Credit moved and the booking is `Booked`.
    Confirmed,
    /// Token was older than the freshness window; it is burned and the
    /// linked booking still flips to `Booked`, but no credit moves.
    Expired,
    /// No pending charge carries this token (including already-used ones).
    UnknownToken,
}

/// Orchestrates booking CRUD, availability queries and the charge
/// confirmation flow over its collaborators. Holds no mutable state of
/// its own; every request is handled independently.
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    studios: Arc<dyn StudioRepository>,
    charges: Arc<dyn ChargeRepository>,
    users: Arc<dyn UserRepository>,
    ledger: Arc<dyn CreditLedger>,
    gateway: Arc<dyn PaymentGateway>,
    engine: AvailabilityEngine,
    rules: BookingRules,
}

impl BookingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        studios: Arc<dyn StudioRepository>,
        charges: Arc<dyn ChargeRepository>,
        users: Arc<dyn UserRepository>,
        ledger: Arc<dyn CreditLedger>,
        gateway: Arc<dyn PaymentGateway>,
        rules: BookingRules,
    ) -> Self {
        Self {
            bookings,
            studios,
            charges,
            users,
            ledger,
            gateway,
            engine: AvailabilityEngine::default(),
            rules,
        }
    }

    /// Free/busy timeline for a room on a given day.
    pub async fn list_availability(
        &self,
        room_id: Uuid,
        day: NaiveDate,
    ) -> Result<RoomAvailability, Error> {
        let studio = self
            .studios
            .find_by_room(room_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("no studio owns room {}", room_id)))?;

        let day_start = day.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::hours(24);
        let bookings = self
            .bookings
            .find_by_resource_and_range(room_id, day_start, day_end)
            .await?;

        let availability = self.engine.compute(room_id, day, &bookings)?;
        Ok(RoomAvailability {
            studio_id: studio.id,
            availability,
        })
    }

    /// Bookings with the derived `is_changeable` flag.
    pub async fn list_bookings(
        &self,
        room_id: Option<Uuid>,
    ) -> Result<Vec<AnnotatedBooking>, Error> {
        let bookings = self.bookings.list(room_id).await?;
        Ok(bookings
            .into_iter()
            .map(|booking| {
                let is_changeable = is_changeable(booking.status);
                AnnotatedBooking {
                    booking,
                    is_changeable,
                }
            })
            .collect())
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<Booking, Error> {
        self.bookings
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("booking {}", id)))
    }

    pub async fn create_booking(&self, input: NewBooking) -> Result<Booking, Error> {
        Booking::validate_range(input.start_time, input.end_time)?;

        let now = Utc::now();
        let status = match input.origin {
            BookingOrigin::Charge => BookingStatus::Pending,
            BookingOrigin::OwnerBlock => BookingStatus::Unavailable,
        };
        let mut booking = Booking {
            id: Uuid::new_v4(),
            room_id: input.room_id,
            studio_id: input.studio_id,
            assignee_id: None,
            subject: input.subject,
            is_all_day: input.is_all_day,
            status,
            start_time: input.start_time,
            end_time: input.end_time,
            created_at: now,
            updated_at: now,
        };

        // A charge reference cross-links both ways: the booking gets the
        // charge's artist as assignee, the charge gets the booking id.
        if let Some(charge_id) = input.charge_id {
            let mut charge = self
                .charges
                .find(charge_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("charge {}", charge_id)))?;
            let artist = self
                .users
                .find_by_email(&charge.artist_email)
                .await?
                .ok_or_else(|| Error::not_found(format!("artist {}", charge.artist_email)))?;
            booking.assignee_id = Some(artist.id);
            charge.booking_id = Some(booking.id);
            self.charges.save(&charge).await?;
        }

        self.bookings.save(&booking).await?;
        info!(booking_id = %booking.id, status = booking.status.as_str(), "booking created");
        Ok(booking)
    }

    pub async fn update_booking(&self, id: Uuid, patch: BookingPatch) -> Result<Booking, Error> {
        let mut booking = self.get_booking(id).await?;

        if let Some(subject) = patch.subject {
            booking.subject = subject;
        }
        if let Some(is_all_day) = patch.is_all_day {
            booking.is_all_day = is_all_day;
        }
        if let Some(start) = patch.start_time {
            booking.start_time = start;
        }
        if let Some(end) = patch.end_time {
            booking.end_time = end;
        }
        if let Some(status) = patch.status {
            booking.status = status;
        }
        Booking::validate_range(booking.start_time, booking.end_time)?;
        booking.updated_at = Utc::now();

        self.bookings.save(&booking).await?;
        Ok(booking)
    }

    pub async fn remove_booking(&self, id: Uuid) -> Result<(), Error> {
        // Physical removal; there is no soft-delete.
        let booking = self.get_booking(id).await?;
        self.bookings.delete(booking.id).await
    }

    /// Direct booking paid from the artist's credit balance. The owner is
    /// paid out through the gateway when onboarded, otherwise credited on
    /// the internal ledger. The artist is debited the amount plus the
    /// platform fee.
    pub async fn instant_book(&self, input: InstantBooking) -> Result<Booking, Error> {
        Booking::validate_range(input.start_time, input.end_time)?;

        let artist = self
            .users
            .find(input.artist_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("artist {}", input.artist_id)))?;
        if artist.credit < input.credits {
            return Err(Error::Conflict(format!(
                "artist credit {} below booking price {}",
                artist.credit, input.credits
            )));
        }

        let studio = self
            .studios
            .find(input.studio_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("studio {}", input.studio_id)))?;
        let owner = self
            .users
            .find(studio.owner_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("owner of studio {}", studio.id)))?;

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            room_id: input.room_id,
            studio_id: input.studio_id,
            assignee_id: Some(artist.id),
            subject: input.subject,
            is_all_day: input.is_all_day,
            status: BookingStatus::Booked,
            start_time: input.start_time,
            end_time: input.end_time,
            created_at: now,
            updated_at: now,
        };
        self.bookings.save(&booking).await?;

        // Pay the owner: gateway transfer if onboarded, ledger otherwise.
        let mut paid_via_gateway = false;
        if let Some(account) = owner.payout_account.as_deref() {
            if self.gateway.payouts_active(account).await? {
                self.gateway.transfer(input.credits * 100, account).await?;
                paid_via_gateway = true;
            }
        }
        if !paid_via_gateway {
            self.users.adjust_credit(&owner.email, input.credits).await?;
        }

        let fee = input.credits * self.rules.platform_fee_bps / 10_000;
        self.users
            .adjust_credit(&artist.email, -(input.credits + fee))
            .await?;

        info!(
            booking_id = %booking.id,
            credits = input.credits,
            via_gateway = paid_via_gateway,
            "instant booking settled"
        );
        Ok(booking)
    }

    /// Processes a confirmation token. The token is single-use: whatever
    /// the freshness outcome, it is cleared before returning.
    pub async fn confirm_booking(&self, token: &str) -> Result<ConfirmOutcome, Error> {
        let Some(charge) = self.charges.find_by_token(token).await? else {
            return Ok(ConfirmOutcome::UnknownToken);
        };

        let age = Utc::now() - charge.created_at;
        if age > Duration::hours(self.rules.confirmation_window_hours) {
            warn!(charge_id = %charge.id, "confirmation token expired");
            self.charges.consume(charge.id, false).await?;
            if let Some(booking_id) = charge.booking_id {
                self.bookings
                    .set_status(booking_id, BookingStatus::Booked)
                    .await?;
            }
            return Ok(ConfirmOutcome::Expired);
        }

        if let Some(booking_id) = charge.booking_id {
            if let Some(booking) = self.bookings.find(booking_id).await? {
                let studio = self
                    .studios
                    .find(booking.studio_id)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("studio {}", booking.studio_id)))?;
                // One transactional unit: debit, credit, booking status,
                // charge consumption.
                self.ledger
                    .settle_confirmation(
                        charge.id,
                        &charge.artist_email,
                        &charge.owner_email,
                        studio.price,
                        booking_id,
                    )
                    .await?;
                info!(charge_id = %charge.id, booking_id = %booking_id, "booking confirmed");
                return Ok(ConfirmOutcome::Confirmed);
            }
        }

        // Fresh token but nothing to settle against; burn it as confirmed.
        self.charges.consume(charge.id, true).await?;
        Ok(ConfirmOutcome::Confirmed)
    }
}

/// Derived edit flag: default true, forced false for any status other
/// than `Unavailable`, forced back true for `Pending`. The three-step
/// shape is load-bearing compatibility; net effect is that only `Booked`
/// is locked. The API layer reuses this so every surface reports the
/// same flag for the same record.
pub fn is_changeable(status: BookingStatus) -> bool {
    let mut changeable = true;
    if status != BookingStatus::Unavailable {
        changeable = false;
    }
    if status == BookingStatus::Pending {
        changeable = true;
    }
    changeable
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atelier_core::payment::{Balance, ChargeStatus, ProviderCharge};
    use atelier_core::studio::{StudioQuery, StudioWithDistance};
    use atelier_core::{Charge, GeoPoint, LineItem, Role, Studio, User};
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemBookings {
        items: Mutex<Vec<Booking>>,
    }

    #[async_trait]
    impl BookingRepository for MemBookings {
        async fn find(&self, id: Uuid) -> Result<Option<Booking>, Error> {
            Ok(self.items.lock().unwrap().iter().find(|b| b.id == id).cloned())
        }

        async fn find_by_resource_and_range(
            &self,
            room_id: Uuid,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Booking>, Error> {
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.room_id == room_id && b.start_time < end && b.end_time > start)
                .cloned()
                .collect())
        }

        async fn list(&self, room_id: Option<Uuid>) -> Result<Vec<Booking>, Error> {
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .filter(|b| room_id.map_or(true, |r| b.room_id == r))
                .cloned()
                .collect())
        }

        async fn save(&self, booking: &Booking) -> Result<(), Error> {
            let mut items = self.items.lock().unwrap();
            if let Some(existing) = items.iter_mut().find(|b| b.id == booking.id) {
                *existing = booking.clone();
            } else {
                items.push(booking.clone());
            }
            Ok(())
        }

        async fn set_status(&self, id: Uuid, status: BookingStatus) -> Result<(), Error> {
            let mut items = self.items.lock().unwrap();
            let booking = items
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| Error::not_found(format!("booking {}", id)))?;
            booking.status = status;
            Ok(())
        }

        async fn delete(&self, id: Uuid) -> Result<(), Error> {
            self.items.lock().unwrap().retain(|b| b.id != id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemStudios {
        items: Mutex<Vec<Studio>>,
    }

    #[async_trait]
    impl StudioRepository for MemStudios {
        async fn find(&self, id: Uuid) -> Result<Option<Studio>, Error> {
            Ok(self.items.lock().unwrap().iter().find(|s| s.id == id).cloned())
        }

        async fn find_by_room(&self, room_id: Uuid) -> Result<Option<Studio>, Error> {
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.rooms.iter().any(|r| r.id == room_id))
                .cloned())
        }

        async fn list(&self, _query: &StudioQuery) -> Result<Vec<StudioWithDistance>, Error> {
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .cloned()
                .map(|studio| StudioWithDistance {
                    studio,
                    distance_km: None,
                })
                .collect())
        }

        async fn save(&self, studio: &Studio) -> Result<(), Error> {
            self.items.lock().unwrap().push(studio.clone());
            Ok(())
        }

        async fn delete(&self, id: Uuid) -> Result<(), Error> {
            self.items.lock().unwrap().retain(|s| s.id != id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemCharges {
        items: Mutex<Vec<Charge>>,
    }

    #[async_trait]
    impl ChargeRepository for MemCharges {
        async fn find(&self, id: Uuid) -> Result<Option<Charge>, Error> {
            Ok(self.items.lock().unwrap().iter().find(|c| c.id == id).cloned())
        }

        async fn find_by_token(&self, token: &str) -> Result<Option<Charge>, Error> {
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.confirmation_token.as_deref() == Some(token))
                .cloned())
        }

        async fn save(&self, charge: &Charge) -> Result<(), Error> {
            let mut items = self.items.lock().unwrap();
            if let Some(existing) = items.iter_mut().find(|c| c.id == charge.id) {
                *existing = charge.clone();
            } else {
                items.push(charge.clone());
            }
            Ok(())
        }

        async fn consume(&self, id: Uuid, confirmed: bool) -> Result<(), Error> {
            let mut items = self.items.lock().unwrap();
            let charge = items
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| Error::not_found(format!("charge {}", id)))?;
            charge.confirmation_token = None;
            if confirmed {
                charge.confirmed = true;
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemUsers {
        items: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserRepository for MemUsers {
        async fn find(&self, id: Uuid) -> Result<Option<User>, Error> {
            Ok(self.items.lock().unwrap().iter().find(|u| u.id == id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
            Ok(self.items.lock().unwrap().iter().find(|u| u.email == email).cloned())
        }

        async fn find_by_email_token(&self, token: &str) -> Result<Option<User>, Error> {
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email_token.as_deref() == Some(token))
                .cloned())
        }

        async fn save(&self, user: &User) -> Result<(), Error> {
            let mut items = self.items.lock().unwrap();
            if let Some(existing) = items.iter_mut().find(|u| u.id == user.id) {
                *existing = user.clone();
            } else {
                items.push(user.clone());
            }
            Ok(())
        }

        async fn adjust_credit(&self, email: &str, delta: i64) -> Result<(), Error> {
            let mut items = self.items.lock().unwrap();
            let user = items
                .iter_mut()
                .find(|u| u.email == email)
                .ok_or_else(|| Error::not_found(format!("user {}", email)))?;
            user.credit += delta;
            Ok(())
        }
    }

    /// Fake ledger mirroring the store's transactional settle: all four
    /// mutations applied together against the in-memory collections.
    struct MemLedger {
        users: Arc<MemUsers>,
        bookings: Arc<MemBookings>,
        charges: Arc<MemCharges>,
    }

    #[async_trait]
    impl CreditLedger for MemLedger {
        async fn settle_confirmation(
            &self,
            charge_id: Uuid,
            artist_email: &str,
            owner_email: &str,
            amount: i64,
            booking_id: Uuid,
        ) -> Result<(), Error> {
            self.users.adjust_credit(artist_email, -amount).await?;
            self.users.adjust_credit(owner_email, amount).await?;
            self.bookings
                .set_status(booking_id, BookingStatus::Booked)
                .await?;
            self.charges.consume(charge_id, true).await
        }
    }

    struct MemGateway {
        payouts_active: bool,
        transfers: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl PaymentGateway for MemGateway {
        async fn charge(
            &self,
            amount_cents: i64,
            _source_token: &str,
            _description: &str,
        ) -> Result<ProviderCharge, Error> {
            Ok(ProviderCharge {
                id: "ch_test".into(),
                amount_cents,
                currency: "usd".into(),
                status: ChargeStatus::Succeeded,
            })
        }

        async fn payouts_active(&self, _account: &str) -> Result<bool, Error> {
            Ok(self.payouts_active)
        }

        async fn transfer(&self, amount_cents: i64, account: &str) -> Result<(), Error> {
            self.transfers
                .lock()
                .unwrap()
                .push((amount_cents, account.to_string()));
            Ok(())
        }

        async fn balance(&self, _account: &str) -> Result<Balance, Error> {
            Ok(Balance {
                amount_cents: 0,
                currency: "usd".into(),
            })
        }
    }

    struct Fixture {
        service: BookingService,
        bookings: Arc<MemBookings>,
        studios: Arc<MemStudios>,
        charges: Arc<MemCharges>,
        users: Arc<MemUsers>,
        gateway: Arc<MemGateway>,
    }

    fn fixture(gateway_payouts: bool) -> Fixture {
        let bookings = Arc::new(MemBookings::default());
        let studios = Arc::new(MemStudios::default());
        let charges = Arc::new(MemCharges::default());
        let users = Arc::new(MemUsers::default());
        let ledger = Arc::new(MemLedger {
            users: users.clone(),
            bookings: bookings.clone(),
            charges: charges.clone(),
        });
        let gateway = Arc::new(MemGateway {
            payouts_active: gateway_payouts,
            transfers: Mutex::new(Vec::new()),
        });
        let service = BookingService::new(
            bookings.clone(),
            studios.clone(),
            charges.clone(),
            users.clone(),
            ledger,
            gateway.clone(),
            BookingRules::default(),
        );
        Fixture {
            service,
            bookings,
            studios,
            charges,
            users,
            gateway,
        }
    }

    fn user(email: &str, role: Role, credit: i64, payout_account: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or("user").to_string(),
            role,
            credit,
            confirmed: true,
            email_token: None,
            password_hash: "x".into(),
            payout_account: payout_account.map(String::from),
            created_at: Utc::now(),
        }
    }

    fn studio(owner_id: Uuid, price: i64) -> Studio {
        let room = LineItem {
            id: Uuid::new_v4(),
            name: "Room A".into(),
            price,
        };
        Studio {
            id: Uuid::new_v4(),
            owner_id,
            name: "Echo Chamber".into(),
            phone_number: "5550100".into(),
            address: "1 Reverb Way".into(),
            room_type: "recording".into(),
            description: None,
            price,
            photo: "default.jpg".into(),
            location: Some(GeoPoint::new(-73.98, 40.75).unwrap()),
            rooms: vec![room],
            services: vec![],
            equipment: vec![],
            engineers: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn booking_for(room_id: Uuid, studio_id: Uuid, status: BookingStatus) -> Booking {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Booking {
            id: Uuid::new_v4(),
            room_id,
            studio_id,
            assignee_id: None,
            subject: "tracking".into(),
            is_all_day: false,
            status,
            start_time: start,
            end_time: start + Duration::hours(2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn changeable_flag_tracks_status() {
        let fx = fixture(false);
        let room = Uuid::new_v4();
        let studio_id = Uuid::new_v4();
        for status in [
            BookingStatus::Pending,
            BookingStatus::Unavailable,
            BookingStatus::Booked,
        ] {
            fx.bookings
                .save(&booking_for(room, studio_id, status))
                .await
                .unwrap();
        }

        let annotated = fx.service.list_bookings(Some(room)).await.unwrap();
        let flag = |status: BookingStatus| {
            annotated
                .iter()
                .find(|a| a.booking.status == status)
                .unwrap()
                .is_changeable
        };
        assert!(flag(BookingStatus::Pending));
        assert!(flag(BookingStatus::Unavailable));
        assert!(!flag(BookingStatus::Booked));
    }

    #[tokio::test]
    async fn availability_for_unknown_room_is_not_found() {
        let fx = fixture(false);
        let err = fx
            .service
            .list_availability(Uuid::new_v4(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn availability_reflects_room_bookings() {
        let fx = fixture(false);
        let owner = user("owner@example.com", Role::Owner, 0, None);
        let studio = studio(owner.id, 40);
        let room_id = studio.rooms[0].id;
        fx.users.save(&owner).await.unwrap();
        fx.studios.save(&studio).await.unwrap();
        fx.bookings
            .save(&booking_for(room_id, studio.id, BookingStatus::Unavailable))
            .await
            .unwrap();

        let result = fx
            .service
            .list_availability(room_id, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(result.studio_id, studio.id);
        assert_eq!(result.availability.slots[9], 0);
        assert_eq!(result.availability.slots[10], 0);
        assert_eq!(result.availability.free_ranges.len(), 2);
    }

    #[tokio::test]
    async fn create_booking_links_charge_and_defaults_status() {
        let fx = fixture(false);
        let artist = user("artist@example.com", Role::Artist, 10, None);
        fx.users.save(&artist).await.unwrap();
        let charge = Charge::new(
            "owner@example.com".into(),
            artist.email.clone(),
            40,
            "tok-1".into(),
        );
        fx.charges.save(&charge).await.unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let created = fx
            .service
            .create_booking(NewBooking {
                room_id: Uuid::new_v4(),
                studio_id: Uuid::new_v4(),
                subject: "mix session".into(),
                is_all_day: false,
                start_time: start,
                end_time: start + Duration::hours(1),
                origin: BookingOrigin::Charge,
                charge_id: Some(charge.id),
            })
            .await
            .unwrap();

        assert_eq!(created.status, BookingStatus::Pending);
        assert_eq!(created.assignee_id, Some(artist.id));
        let linked = fx.charges.find(charge.id).await.unwrap().unwrap();
        assert_eq!(linked.booking_id, Some(created.id));

        // Owner blocks skip the charge flow and start Unavailable.
        let blocked = fx
            .service
            .create_booking(NewBooking {
                room_id: Uuid::new_v4(),
                studio_id: Uuid::new_v4(),
                subject: "maintenance".into(),
                is_all_day: true,
                start_time: start,
                end_time: start + Duration::hours(4),
                origin: BookingOrigin::OwnerBlock,
                charge_id: None,
            })
            .await
            .unwrap();
        assert_eq!(blocked.status, BookingStatus::Unavailable);
    }

    #[tokio::test]
    async fn create_booking_rejects_inverted_range() {
        let fx = fixture(false);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let err = fx
            .service
            .create_booking(NewBooking {
                room_id: Uuid::new_v4(),
                studio_id: Uuid::new_v4(),
                subject: "bad".into(),
                is_all_day: false,
                start_time: start,
                end_time: start - Duration::hours(1),
                origin: BookingOrigin::OwnerBlock,
                charge_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn confirm_transfers_once_and_burns_the_token() {
        let fx = fixture(false);
        let owner = user("owner@example.com", Role::Owner, 0, None);
        let artist = user("artist@example.com", Role::Artist, 100, None);
        let studio = studio(owner.id, 40);
        let room_id = studio.rooms[0].id;
        fx.users.save(&owner).await.unwrap();
        fx.users.save(&artist).await.unwrap();
        fx.studios.save(&studio).await.unwrap();

        let booking = booking_for(room_id, studio.id, BookingStatus::Pending);
        fx.bookings.save(&booking).await.unwrap();
        let mut charge = Charge::new(owner.email.clone(), artist.email.clone(), 40, "tok-2".into());
        charge.booking_id = Some(booking.id);
        fx.charges.save(&charge).await.unwrap();

        let outcome = fx.service.confirm_booking("tok-2").await.unwrap();
        assert_eq!(outcome, ConfirmOutcome::Confirmed);
        assert_eq!(
            fx.users.find(artist.id).await.unwrap().unwrap().credit,
            60
        );
        assert_eq!(fx.users.find(owner.id).await.unwrap().unwrap().credit, 40);
        assert_eq!(
            fx.bookings.find(booking.id).await.unwrap().unwrap().status,
            BookingStatus::Booked
        );
        let consumed = fx.charges.find(charge.id).await.unwrap().unwrap();
        assert!(consumed.confirmed);
        assert!(consumed.confirmation_token.is_none());

        // Second use of the same token: no-op, credit moved exactly once.
        let second = fx.service.confirm_booking("tok-2").await.unwrap();
        assert_eq!(second, ConfirmOutcome::UnknownToken);
        assert_eq!(fx.users.find(owner.id).await.unwrap().unwrap().credit, 40);
        assert_eq!(
            fx.users.find(artist.id).await.unwrap().unwrap().credit,
            60
        );
    }

    #[tokio::test]
    async fn stale_confirmation_burns_token_without_transfer() {
        let fx = fixture(false);
        let owner = user("owner@example.com", Role::Owner, 0, None);
        let artist = user("artist@example.com", Role::Artist, 100, None);
        let studio = studio(owner.id, 40);
        fx.users.save(&owner).await.unwrap();
        fx.users.save(&artist).await.unwrap();
        fx.studios.save(&studio).await.unwrap();

        let booking = booking_for(studio.rooms[0].id, studio.id, BookingStatus::Pending);
        fx.bookings.save(&booking).await.unwrap();
        let mut charge = Charge::new(owner.email.clone(), artist.email.clone(), 40, "tok-3".into());
        charge.booking_id = Some(booking.id);
        charge.created_at = Utc::now() - Duration::hours(25);
        fx.charges.save(&charge).await.unwrap();

        let outcome = fx.service.confirm_booking("tok-3").await.unwrap();
        assert_eq!(outcome, ConfirmOutcome::Expired);
        assert_eq!(fx.users.find(owner.id).await.unwrap().unwrap().credit, 0);
        assert_eq!(
            fx.users.find(artist.id).await.unwrap().unwrap().credit,
            100
        );
        // The booking still flips and the token is still burned.
        assert_eq!(
            fx.bookings.find(booking.id).await.unwrap().unwrap().status,
            BookingStatus::Booked
        );
        let consumed = fx.charges.find(charge.id).await.unwrap().unwrap();
        assert!(!consumed.confirmed);
        assert!(consumed.confirmation_token.is_none());
    }

    #[tokio::test]
    async fn unknown_token_is_reported_not_errored() {
        let fx = fixture(false);
        let outcome = fx.service.confirm_booking("no-such-token").await.unwrap();
        assert_eq!(outcome, ConfirmOutcome::UnknownToken);
    }

    #[tokio::test]
    async fn instant_book_debits_fee_and_credits_owner_on_ledger() {
        let fx = fixture(false);
        let owner = user("owner@example.com", Role::Owner, 0, None);
        let artist = user("artist@example.com", Role::Artist, 100, None);
        let studio = studio(owner.id, 40);
        fx.users.save(&owner).await.unwrap();
        fx.users.save(&artist).await.unwrap();
        fx.studios.save(&studio).await.unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let booked = fx
            .service
            .instant_book(InstantBooking {
                artist_id: artist.id,
                room_id: studio.rooms[0].id,
                studio_id: studio.id,
                subject: "overdubs".into(),
                is_all_day: false,
                start_time: start,
                end_time: start + Duration::hours(2),
                credits: 40,
            })
            .await
            .unwrap();

        assert_eq!(booked.status, BookingStatus::Booked);
        assert_eq!(fx.users.find(owner.id).await.unwrap().unwrap().credit, 40);
        // 40 credits plus the 15% platform fee (6 credits, truncating).
        assert_eq!(
            fx.users.find(artist.id).await.unwrap().unwrap().credit,
            100 - 46
        );
        assert!(fx.gateway.transfers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn instant_book_pays_onboarded_owner_through_gateway() {
        let fx = fixture(true);
        let owner = user("owner@example.com", Role::Owner, 0, Some("acct_1"));
        let artist = user("artist@example.com", Role::Artist, 100, None);
        let studio = studio(owner.id, 40);
        fx.users.save(&owner).await.unwrap();
        fx.users.save(&artist).await.unwrap();
        fx.studios.save(&studio).await.unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        fx.service
            .instant_book(InstantBooking {
                artist_id: artist.id,
                room_id: studio.rooms[0].id,
                studio_id: studio.id,
                subject: "overdubs".into(),
                is_all_day: false,
                start_time: start,
                end_time: start + Duration::hours(2),
                credits: 40,
            })
            .await
            .unwrap();

        // Owner paid through the provider, not the internal ledger.
        assert_eq!(fx.users.find(owner.id).await.unwrap().unwrap().credit, 0);
        assert_eq!(
            fx.gateway.transfers.lock().unwrap().as_slice(),
            &[(4000, "acct_1".to_string())]
        );
    }

    #[tokio::test]
    async fn instant_book_rejects_insufficient_credit() {
        let fx = fixture(false);
        let owner = user("owner@example.com", Role::Owner, 0, None);
        let artist = user("artist@example.com", Role::Artist, 10, None);
        let studio = studio(owner.id, 40);
        fx.users.save(&owner).await.unwrap();
        fx.users.save(&artist).await.unwrap();
        fx.studios.save(&studio).await.unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let err = fx
            .service
            .instant_book(InstantBooking {
                artist_id: artist.id,
                room_id: studio.rooms[0].id,
                studio_id: studio.id,
                subject: "overdubs".into(),
                is_all_day: false,
                start_time: start,
                end_time: start + Duration::hours(2),
                credits: 40,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(fx.users.find(artist.id).await.unwrap().unwrap().credit, 10);
    }

    #[tokio::test]
    async fn update_and_remove_round_trip() {
        let fx = fixture(false);
        let booking = booking_for(Uuid::new_v4(), Uuid::new_v4(), BookingStatus::Pending);
        fx.bookings.save(&booking).await.unwrap();

        let updated = fx
            .service
            .update_booking(
                booking.id,
                BookingPatch {
                    subject: Some("rescheduled".into()),
                    status: Some(BookingStatus::Booked),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.subject, "rescheduled");
        assert_eq!(updated.status, BookingStatus::Booked);

        fx.service.remove_booking(booking.id).await.unwrap();
        let err = fx.service.get_booking(booking.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
