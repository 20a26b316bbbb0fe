use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Artist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Artist => "artist",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Internal ledger balance, in whole credits.
    pub credit: i64,
    pub confirmed: bool,
    /// Token bound to the pending email-confirmation or password-reset
    /// action; cleared once used.
    pub email_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Payment-provider account reference for payouts, once onboarded.
    pub payout_account: Option<String>,
    pub created_at: DateTime<Utc>,
}
