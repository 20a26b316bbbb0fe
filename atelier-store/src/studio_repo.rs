use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::repository::StudioRepository;
use atelier_core::studio::{DistanceFilter, StudioWithDistance};
use atelier_core::{Error, GeoPoint, LineItem, Studio, StudioQuery};

use crate::database::map_sqlx;

pub struct PgStudioRepository {
    pool: PgPool,
}

impl PgStudioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StudioRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    phone_number: String,
    address: String,
    room_type: String,
    description: Option<String>,
    price: i64,
    photo: String,
    lng: Option<f64>,
    lat: Option<f64>,
    rooms: serde_json::Value,
    services: serde_json::Value,
    equipment: serde_json::Value,
    engineers: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StudioRow {
    fn into_studio(self) -> Result<Studio, Error> {
        let location = match (self.lng, self.lat) {
            (Some(lng), Some(lat)) => Some(GeoPoint::new(lng, lat)?),
            _ => None,
        };
        Ok(Studio {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            phone_number: self.phone_number,
            address: self.address,
            room_type: self.room_type,
            description: self.description,
            price: self.price,
            photo: self.photo,
            location,
            rooms: parse_items(self.rooms)?,
            services: parse_items(self.services)?,
            equipment: parse_items(self.equipment)?,
            engineers: parse_items(self.engineers)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn parse_items(value: serde_json::Value) -> Result<Vec<LineItem>, Error> {
    serde_json::from_value(value)
        .map_err(|e| Error::Unavailable(format!("corrupt line items: {}", e)))
}

const STUDIO_COLUMNS: &str = "id, owner_id, name, phone_number, address, room_type, description, price, photo, lng, lat, rooms, services, equipment, engineers, created_at, updated_at";

#[async_trait]
impl StudioRepository for PgStudioRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Studio>, Error> {
        let row: Option<StudioRow> = sqlx::query_as(&format!(
            "SELECT {} FROM studios WHERE id = $1",
            STUDIO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(StudioRow::into_studio).transpose()
    }

    async fn find_by_room(&self, room_id: Uuid) -> Result<Option<Studio>, Error> {
        // Rooms are stored as a JSONB array of line items; match on the id.
        let row: Option<StudioRow> = sqlx::query_as(&format!(
            "SELECT {} FROM studios WHERE rooms @> $1",
            STUDIO_COLUMNS
        ))
        .bind(serde_json::json!([{ "id": room_id }]))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(StudioRow::into_studio).transpose()
    }

    async fn list(&self, query: &StudioQuery) -> Result<Vec<StudioWithDistance>, Error> {
        // Price/type/name filters go to SQL; distance is computed and
        // ordered here since coordinates live in plain columns. Absent
        // filters collapse to always-true predicates.
        let sql = format!(
            "SELECT {} FROM studios \
             WHERE price >= $1 AND price <= $2 \
               AND ($3 = '' OR room_type = $3) \
               AND name ILIKE $4 \
             ORDER BY created_at",
            STUDIO_COLUMNS
        );

        let rows: Vec<StudioRow> = sqlx::query_as(&sql)
            .bind(query.min_price.unwrap_or(0))
            .bind(query.max_price.unwrap_or(i64::MAX))
            .bind(query.room_type.clone().unwrap_or_default())
            .bind(format!("%{}%", query.search.clone().unwrap_or_default()))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        let mut studios = rows
            .into_iter()
            .map(StudioRow::into_studio)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|studio| {
                let distance_km = match (query.near, studio.location) {
                    (Some(origin), Some(loc)) => Some(origin.distance_km(&loc)),
                    _ => None,
                };
                StudioWithDistance {
                    studio,
                    distance_km,
                }
            })
            .collect::<Vec<_>>();

        if let (Some(_), Some(filter)) = (query.near, query.distance) {
            studios.retain(|s| match (filter, s.distance_km) {
                (DistanceFilter::Within(max), Some(d)) => d <= max,
                (DistanceFilter::Beyond(min), Some(d)) => d >= min,
                _ => false,
            });
        }

        if query.near.is_some() {
            studios.sort_by(|a, b| {
                let da = a.distance_km.unwrap_or(f64::MAX);
                let db = b.distance_km.unwrap_or(f64::MAX);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        if let Some(sort_by) = query.sort_by.as_deref() {
            match sort_by {
                "price" => studios.sort_by_key(|s| s.studio.price),
                "name" => studios.sort_by(|a, b| a.studio.name.cmp(&b.studio.name)),
                "createdAt" => studios.sort_by_key(|s| s.studio.created_at),
                _ => {}
            }
            if query.sort_desc {
                studios.reverse();
            }
        }

        let page_size = query.page_size_or_default() as usize;
        let skip = query.page_number as usize * page_size;
        Ok(studios.into_iter().skip(skip).take(page_size).collect())
    }

    async fn save(&self, studio: &Studio) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO studios (id, owner_id, name, phone_number, address, room_type, description, price, photo, lng, lat, rooms, services, equipment, engineers, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             ON CONFLICT (id) DO UPDATE SET \
                name = EXCLUDED.name, \
                phone_number = EXCLUDED.phone_number, \
                address = EXCLUDED.address, \
                room_type = EXCLUDED.room_type, \
                description = EXCLUDED.description, \
                price = EXCLUDED.price, \
                photo = EXCLUDED.photo, \
                lng = EXCLUDED.lng, \
                lat = EXCLUDED.lat, \
                rooms = EXCLUDED.rooms, \
                services = EXCLUDED.services, \
                equipment = EXCLUDED.equipment, \
                engineers = EXCLUDED.engineers, \
                updated_at = EXCLUDED.updated_at",
        )
        .bind(studio.id)
        .bind(studio.owner_id)
        .bind(&studio.name)
        .bind(&studio.phone_number)
        .bind(&studio.address)
        .bind(&studio.room_type)
        .bind(&studio.description)
        .bind(studio.price)
        .bind(&studio.photo)
        .bind(studio.location.map(|l| l.lng))
        .bind(studio.location.map(|l| l.lat))
        .bind(to_json(&studio.rooms)?)
        .bind(to_json(&studio.services)?)
        .bind(to_json(&studio.equipment)?)
        .bind(to_json(&studio.engineers)?)
        .bind(studio.created_at)
        .bind(studio.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), Error> {
        sqlx::query("DELETE FROM studios WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

fn to_json(items: &[LineItem]) -> Result<serde_json::Value, Error> {
    serde_json::to_value(items).map_err(|e| Error::Unavailable(e.to_string()))
}
