use async_trait::async_trait;

use atelier_core::mailer::Mailer;
use atelier_core::Error;

/// Development mailer that logs the links it would send. Real SMTP
/// delivery is configuration-driven and out of scope here.
pub struct LogMailer {
    domain: String,
}

impl LogMailer {
    pub fn new(domain: String) -> Self {
        Self { domain }
    }

    fn confirmation_link(&self, token: &str) -> String {
        format!("{}/v1/confirmation/{}", self.domain, token)
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_confirmation(&self, to: &str, name: &str, token: &str) -> Result<(), Error> {
        tracing::info!(to, name, link = %self.confirmation_link(token), "confirmation email");
        Ok(())
    }

    async fn send_booking_confirmation(
        &self,
        to: &str,
        name: &str,
        token: &str,
        new_account_password: Option<&str>,
    ) -> Result<(), Error> {
        tracing::info!(
            to,
            name,
            link = %self.confirmation_link(token),
            provisioned = new_account_password.is_some(),
            "booking confirmation email"
        );
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, name: &str, token: &str) -> Result<(), Error> {
        tracing::info!(to, name, link = %self.confirmation_link(token), "password reset email");
        Ok(())
    }
}
