use chrono::{DateTime, Duration, Utc};

use atelier_core::Error;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Busy,
}

impl SlotState {
    pub fn is_free(&self) -> bool {
        matches!(self, SlotState::Free)
    }

    /// Wire encoding: 1 = free, 0 = busy.
    pub fn as_int(&self) -> u8 {
        match self {
            SlotState::Free => 1,
            SlotState::Busy => 0,
        }
    }
}

/// One calendar day discretized into fixed-width slots, each tagged
/// free or busy. Ephemeral: built per availability query, never stored.
#[derive(Debug, Clone)]
pub struct SlotGrid {
    day_start: DateTime<Utc>,
    interval_minutes: u32,
    slots: Vec<SlotState>,
}

impl SlotGrid {
    /// `interval_minutes` must be positive and divide the day evenly.
    pub fn new(day_start: DateTime<Utc>, interval_minutes: u32) -> Result<Self, Error> {
        if interval_minutes == 0 || MINUTES_PER_DAY % interval_minutes != 0 {
            return Err(Error::invalid(format!(
                "slot interval {} does not divide a 24h day",
                interval_minutes
            )));
        }
        let n = (MINUTES_PER_DAY / interval_minutes) as usize;
        Ok(Self {
            day_start,
            interval_minutes,
            slots: vec![SlotState::Free; n],
        })
    }

    pub fn day_start(&self) -> DateTime<Utc> {
        self.day_start
    }

    pub fn day_end(&self) -> DateTime<Utc> {
        self.day_start + Duration::minutes(MINUTES_PER_DAY as i64)
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[SlotState] {
        &self.slots
    }

    /// Timestamp of a slot boundary; index `len()` is the end of day.
    pub fn slot_start(&self, index: usize) -> DateTime<Utc> {
        self.day_start + Duration::minutes(index as i64 * self.interval_minutes as i64)
    }

    /// Marks every slot touched by `[start, end)` with `state`. The range
    /// is clipped to the day; a range fully outside it is a no-op. The
    /// start index truncates and the end index rounds up, so a partial
    /// slot overlap marks the whole slot (busy wins).
    pub fn mark_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>, state: SlotState) {
        let clipped_start = start.max(self.day_start);
        let clipped_end = end.min(self.day_end());
        if clipped_start >= clipped_end {
            return;
        }

        let interval = self.interval_minutes as i64;
        let start_offset = (clipped_start - self.day_start).num_minutes();
        let end_offset = (clipped_end - self.day_start).num_minutes();

        let start_idx = (start_offset / interval) as usize;
        let end_idx = (((end_offset + interval - 1) / interval) as usize).min(self.slots.len());

        for slot in &mut self.slots[start_idx..end_idx] {
            *slot = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn default_grid_has_24_free_slots() {
        let grid = SlotGrid::new(day(), 60).unwrap();
        assert_eq!(grid.len(), 24);
        assert!(grid.slots().iter().all(|s| s.is_free()));
    }

    #[test]
    fn rejects_uneven_interval() {
        assert!(SlotGrid::new(day(), 0).is_err());
        assert!(SlotGrid::new(day(), 7).is_err());
        assert_eq!(SlotGrid::new(day(), 30).unwrap().len(), 48);
    }

    #[test]
    fn partial_overlap_marks_whole_slot() {
        let mut grid = SlotGrid::new(day(), 60).unwrap();
        grid.mark_range(at(9, 0), at(10, 30), SlotState::Busy);
        for (i, slot) in grid.slots().iter().enumerate() {
            let expected_busy = i == 9 || i == 10;
            assert_eq!(!slot.is_free(), expected_busy, "slot {}", i);
        }
    }

    #[test]
    fn range_outside_day_is_noop() {
        let mut grid = SlotGrid::new(day(), 60).unwrap();
        let next_day = Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap();
        grid.mark_range(next_day, later, SlotState::Busy);
        assert!(grid.slots().iter().all(|s| s.is_free()));
    }

    #[test]
    fn range_spanning_day_boundary_is_clipped() {
        let mut grid = SlotGrid::new(day(), 60).unwrap();
        let prev_evening = Utc.with_ymd_and_hms(2023, 12, 31, 22, 0, 0).unwrap();
        grid.mark_range(prev_evening, at(2, 0), SlotState::Busy);
        assert!(!grid.slots()[0].is_free());
        assert!(!grid.slots()[1].is_free());
        assert!(grid.slots()[2].is_free());
    }

    #[test]
    fn exact_boundaries_stay_half_open() {
        let mut grid = SlotGrid::new(day(), 60).unwrap();
        grid.mark_range(at(9, 0), at(10, 0), SlotState::Busy);
        assert!(grid.slots()[8].is_free());
        assert!(!grid.slots()[9].is_free());
        assert!(grid.slots()[10].is_free());
    }
}
