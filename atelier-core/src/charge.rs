use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A credit purchase awaiting confirmation. The confirmation token is
/// single-use: it is cleared the first time it is processed, whatever
/// the freshness outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: Uuid,
    pub owner_email: String,
    pub artist_email: String,
    pub credits: i64,
    pub confirmed: bool,
    pub confirmation_token: Option<String>,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Charge {
    pub fn new(owner_email: String, artist_email: String, credits: i64, token: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_email,
            artist_email,
            credits,
            confirmed: false,
            confirmation_token: Some(token),
            booking_id: None,
            created_at: Utc::now(),
        }
    }
}
