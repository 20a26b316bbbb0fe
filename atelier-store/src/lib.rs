pub mod app_config;
pub mod booking_repo;
pub mod charge_repo;
pub mod database;
pub mod studio_repo;
pub mod user_repo;

pub use booking_repo::PgBookingRepository;
pub use charge_repo::PgChargeRepository;
pub use database::DbClient;
pub use studio_repo::PgStudioRepository;
pub use user_repo::{PgCreditLedger, PgUserRepository};
