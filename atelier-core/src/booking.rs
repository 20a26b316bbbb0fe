use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    /// The bookable resource (a studio room).
    pub room_id: Uuid,
    /// The studio that owns the room.
    pub studio_id: Uuid,
    /// Assigned artist, when the booking came out of a charge flow.
    pub assignee_id: Option<Uuid>,
    pub subject: String,
    pub is_all_day: bool,
    pub status: BookingStatus,
    /// Half-open range: the booking occupies `[start_time, end_time)`.
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Rejects inverted or empty time ranges.
    pub fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), Error> {
        if start >= end {
            return Err(Error::invalid(format!(
                "booking start {} must precede end {}",
                start, end
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Unavailable,
    Booked,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Unavailable => "Unavailable",
            BookingStatus::Booked => "Booked",
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "Pending" => Ok(BookingStatus::Pending),
            "Unavailable" => Ok(BookingStatus::Unavailable),
            "Booked" => Ok(BookingStatus::Booked),
            other => Err(Error::invalid(format!("unknown booking status '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_inverted_range() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert!(matches!(
            Booking::validate_range(start, end),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Booking::validate_range(start, start),
            Err(Error::InvalidArgument(_))
        ));
        assert!(Booking::validate_range(end, start).is_ok());
    }

    #[test]
    fn status_round_trips() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Unavailable,
            BookingStatus::Booked,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(BookingStatus::parse("Cancelled").is_err());
    }
}
