use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// An independently priced sub-offering of a studio: a room, a service,
/// a piece of equipment, or an engineer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Studio {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub address: String,
    pub room_type: String,
    pub description: Option<String>,
    /// Base price in credits; the amount transferred on confirmation.
    pub price: i64,
    /// Stored file name only; upload/storage is handled elsewhere.
    pub photo: String,
    pub location: Option<GeoPoint>,
    pub rooms: Vec<LineItem>,
    pub services: Vec<LineItem>,
    pub equipment: Vec<LineItem>,
    pub engineers: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Geo-distance filter applied to a studio listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceFilter {
    /// Keep studios at most this many kilometres away.
    Within(f64),
    /// Keep studios at least this many kilometres away (the "200+" band).
    Beyond(f64),
}

#[derive(Debug, Clone, Default)]
pub struct StudioQuery {
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub room_type: Option<String>,
    /// Case-insensitive substring match on the studio name.
    pub search: Option<String>,
    /// Origin for distance computation and ordering.
    pub near: Option<GeoPoint>,
    pub distance: Option<DistanceFilter>,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
    pub page_number: u32,
    pub page_size: u32,
}

impl StudioQuery {
    pub fn page_size_or_default(&self) -> u32 {
        if self.page_size == 0 {
            10
        } else {
            self.page_size
        }
    }
}

/// A listing row: the studio plus its distance from the query origin,
/// when one was given.
#[derive(Debug, Clone, Serialize)]
pub struct StudioWithDistance {
    #[serde(flatten)]
    pub studio: Studio,
    pub distance_km: Option<f64>,
}
