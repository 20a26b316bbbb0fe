use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCharge {
    /// Provider's charge reference (e.g. ch_123).
    pub id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: ChargeStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Balance {
    pub amount_cents: i64,
    pub currency: String,
}

/// The third-party payment processor, specified at interface level only.
/// Amounts are in the provider's smallest currency unit.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge a payment source (card token) for a credit purchase.
    async fn charge(
        &self,
        amount_cents: i64,
        source_token: &str,
        description: &str,
    ) -> Result<ProviderCharge, Error>;

    /// Whether the account has completed payout onboarding.
    async fn payouts_active(&self, account: &str) -> Result<bool, Error>;

    /// Move funds to a connected payout account.
    async fn transfer(&self, amount_cents: i64, account: &str) -> Result<(), Error>;

    /// Available balance of a connected account.
    async fn balance(&self, account: &str) -> Result<Balance, Error>;
}
