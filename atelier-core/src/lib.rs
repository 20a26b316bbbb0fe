pub mod booking;
pub mod charge;
pub mod error;
pub mod geo;
pub mod identity;
pub mod mailer;
pub mod payment;
pub mod repository;
pub mod studio;

pub use booking::{Booking, BookingStatus};
pub use charge::Charge;
pub use error::Error;
pub use geo::GeoPoint;
pub use identity::{Role, User};
pub use studio::{DistanceFilter, LineItem, Studio, StudioQuery, StudioWithDistance};
