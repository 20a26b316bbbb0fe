use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use atelier_core::{Booking, BookingStatus, Error};

use crate::grid::{SlotGrid, SlotState};

pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

/// A maximal run of contiguous free slots, reported as a half-open range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Derived availability for one resource on one day. Read-only and
/// ephemeral; assembled per query.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub resource_id: Uuid,
    /// Grid encoding: 1 = free, 0 = busy; one entry per slot.
    pub slots: Vec<u8>,
    pub free_ranges: Vec<FreeRange>,
}

/// Pure availability computation: bookings in, free/busy timeline out.
/// Safe to run concurrently and repeatedly.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityEngine {
    interval_minutes: u32,
}

impl Default for AvailabilityEngine {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
        }
    }
}

impl AvailabilityEngine {
    pub fn new(interval_minutes: u32) -> Self {
        Self { interval_minutes }
    }

    /// Builds the day's slot grid from the bookings that intersect it and
    /// collapses the result into ordered free ranges.
    pub fn compute(
        &self,
        resource_id: Uuid,
        day: NaiveDate,
        bookings: &[Booking],
    ) -> Result<Availability, Error> {
        let day_start = day.and_time(NaiveTime::MIN).and_utc();
        let mut grid = SlotGrid::new(day_start, self.interval_minutes)?;

        // Two passes, blocked-out slots first and regular bookings second.
        // Both mark busy today; the split is kept so the branches can
        // diverge without reworking the walk below.
        for booking in bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Unavailable)
        {
            grid.mark_range(booking.start_time, booking.end_time, SlotState::Busy);
        }
        for booking in bookings
            .iter()
            .filter(|b| b.status != BookingStatus::Unavailable)
        {
            grid.mark_range(booking.start_time, booking.end_time, SlotState::Busy);
        }

        let free_ranges = Self::collect_free_ranges(&grid);

        Ok(Availability {
            resource_id,
            slots: grid.slots().iter().map(|s| s.as_int()).collect(),
            free_ranges,
        })
    }

    /// Single left-to-right walk. A trailing busy sentinel closes any
    /// free run that reaches the end of the day.
    fn collect_free_ranges(grid: &SlotGrid) -> Vec<FreeRange> {
        let mut ranges = Vec::new();
        let mut open: Option<usize> = None;

        let sentinel = [SlotState::Busy];
        for (i, slot) in grid.slots().iter().chain(sentinel.iter()).enumerate() {
            match (slot.is_free(), open) {
                (true, None) => open = Some(i),
                (false, Some(start)) => {
                    ranges.push(FreeRange {
                        start: grid.slot_start(start),
                        end: grid.slot_start(i),
                    });
                    open = None;
                }
                _ => {}
            }
        }

        ranges
    }
}
