use async_trait::async_trait;

use crate::error::Error;

/// Outbound transactional email, specified at interface level only.
/// Delivery transport (SMTP settings, sender identity) is configuration
/// owned by the implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Account email confirmation with a tokenized link.
    async fn send_confirmation(&self, to: &str, name: &str, token: &str) -> Result<(), Error>;

    /// Booking confirmation; carries a generated password when the
    /// artist account was provisioned as part of the charge.
    async fn send_booking_confirmation(
        &self,
        to: &str,
        name: &str,
        token: &str,
        new_account_password: Option<&str>,
    ) -> Result<(), Error>;

    async fn send_password_reset(&self, to: &str, name: &str, token: &str) -> Result<(), Error>;
}
