use std::sync::Arc;

use atelier_booking::BookingService;
use atelier_core::mailer::Mailer;
use atelier_core::payment::PaymentGateway;
use atelier_core::repository::{ChargeRepository, StudioRepository, UserRepository};
use atelier_store::app_config::AppSettings;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BookingService>,
    pub studios: Arc<dyn StudioRepository>,
    pub users: Arc<dyn UserRepository>,
    pub charges: Arc<dyn ChargeRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
    pub auth: AuthConfig,
    pub app: AppSettings,
}
