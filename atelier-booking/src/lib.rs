pub mod distance;
pub mod engine;
pub mod grid;
pub mod service;

pub use distance::{bucket, DistanceBucket};
pub use engine::{Availability, AvailabilityEngine, FreeRange};
pub use grid::{SlotGrid, SlotState};
pub use service::{
    is_changeable, AnnotatedBooking, BookingOrigin, BookingPatch, BookingRules, BookingService,
    ConfirmOutcome, InstantBooking, NewBooking, RoomAvailability,
};
