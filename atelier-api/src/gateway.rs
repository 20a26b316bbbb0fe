use async_trait::async_trait;
use uuid::Uuid;

use atelier_core::payment::{Balance, ChargeStatus, PaymentGateway, ProviderCharge};
use atelier_core::Error;

/// Development stand-in for the payment provider. Every charge
/// succeeds, no account is payout-onboarded, and balances read zero.
pub struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn charge(
        &self,
        amount_cents: i64,
        _source_token: &str,
        description: &str,
    ) -> Result<ProviderCharge, Error> {
        let charge = ProviderCharge {
            id: format!("ch_{}", Uuid::new_v4().simple()),
            amount_cents,
            currency: "usd".to_string(),
            status: ChargeStatus::Succeeded,
        };
        tracing::info!(charge_id = %charge.id, amount_cents, description, "mock charge");
        Ok(charge)
    }

    async fn payouts_active(&self, _account: &str) -> Result<bool, Error> {
        Ok(false)
    }

    async fn transfer(&self, amount_cents: i64, account: &str) -> Result<(), Error> {
        tracing::info!(amount_cents, account, "mock transfer");
        Ok(())
    }

    async fn balance(&self, _account: &str) -> Result<Balance, Error> {
        Ok(Balance {
            amount_cents: 0,
            currency: "usd".to_string(),
        })
    }
}
