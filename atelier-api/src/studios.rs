use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_booking::{bucket, DistanceBucket};
use atelier_core::{DistanceFilter, GeoPoint, LineItem, Studio, StudioQuery, StudioWithDistance};

use crate::error::AppError;
use crate::middleware::auth::{auth_middleware, Claims};
use crate::state::AppState;

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudiosQuery {
    min_price: Option<i64>,
    max_price: Option<i64>,
    room_type: Option<String>,
    search: Option<String>,
    lng: Option<f64>,
    lat: Option<f64>,
    /// Kilometre cap, or "200+" for the open-ended band.
    distance: Option<String>,
    sort_by: Option<String>,
    #[serde(default)]
    sort_desc: bool,
    page_number: Option<u32>,
    page_size: Option<u32>,
    /// When set, the response carries the nearest studio's distance
    /// bucket as `initValue`.
    #[serde(default)]
    init: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineItemRequest {
    id: Option<Uuid>,
    name: String,
    price: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudioRequest {
    name: String,
    phone_number: String,
    address: String,
    room_type: String,
    description: Option<String>,
    price: i64,
    #[serde(default)]
    photo: String,
    lng: Option<f64>,
    lat: Option<f64>,
    #[serde(default)]
    rooms: Vec<LineItemRequest>,
    #[serde(default)]
    services: Vec<LineItemRequest>,
    #[serde(default)]
    equipment: Vec<LineItemRequest>,
    #[serde(default)]
    engineers: Vec<LineItemRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LineItemDto {
    id: Uuid,
    name: String,
    price: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudioDto {
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
    rooms: Vec<LineItemDto>,
    services: Vec<LineItemDto>,
    equipment: Vec<LineItemDto>,
    engineers: Vec<LineItemDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<f64>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudioListDto {
    studios: Vec<StudioDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    init_value: Option<DistanceBucket>,
}

fn line_item_dto(item: LineItem) -> LineItemDto {
    LineItemDto {
        id: item.id,
        name: item.name,
        price: item.price,
    }
}

fn studio_dto(studio: Studio, distance: Option<f64>) -> StudioDto {
    StudioDto {
        id: studio.id,
        owner_id: studio.owner_id,
        name: studio.name,
        phone_number: studio.phone_number,
        address: studio.address,
        room_type: studio.room_type,
        description: studio.description,
        price: studio.price,
        photo: studio.photo,
        lng: studio.location.map(|p| p.lng),
        lat: studio.location.map(|p| p.lat),
        rooms: studio.rooms.into_iter().map(line_item_dto).collect(),
        services: studio.services.into_iter().map(line_item_dto).collect(),
        equipment: studio.equipment.into_iter().map(line_item_dto).collect(),
        engineers: studio.engineers.into_iter().map(line_item_dto).collect(),
        distance,
        created_at: studio.created_at,
    }
}

fn listed_dto(row: StudioWithDistance) -> StudioDto {
    studio_dto(row.studio, row.distance_km)
}

fn line_items(items: Vec<LineItemRequest>) -> Vec<LineItem> {
    items
        .into_iter()
        .map(|i| LineItem {
            id: i.id.unwrap_or_else(Uuid::new_v4),
            name: i.name,
            price: i.price,
        })
        .collect()
}

fn parse_distance(raw: &str) -> Result<DistanceFilter, AppError> {
    if let Some(stripped) = raw.strip_suffix('+') {
        let km: f64 = stripped
            .parse()
            .map_err(|_| AppError::ValidationError(format!("bad distance {}", raw)))?;
        return Ok(DistanceFilter::Beyond(km));
    }
    let km: f64 = raw
        .parse()
        .map_err(|_| AppError::ValidationError(format!("bad distance {}", raw)))?;
    Ok(DistanceFilter::Within(km))
}

/// The effective distance filter for a listing. An `init` request seeds
/// the default filter from the nearest unfiltered result, so the filter
/// is withheld there and only the bucket is reported back.
fn listing_distance(init: bool, raw: Option<&str>) -> Result<Option<DistanceFilter>, AppError> {
    if init {
        return Ok(None);
    }
    raw.map(parse_distance).transpose()
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/v1/studios", post(create_studio))
        .route("/v1/studios/{id}", put(update_studio).delete(delete_studio))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/v1/studios", get(list_studios))
        .route("/v1/studios/{id}", get(get_studio))
        .merge(protected)
}

async fn list_studios(
    State(state): State<AppState>,
    Query(query): Query<StudiosQuery>,
) -> Result<Json<StudioListDto>, AppError> {
    let near = match (query.lng, query.lat) {
        (Some(lng), Some(lat)) => Some(GeoPoint::new(lng, lat)?),
        _ => None,
    };
    let distance = listing_distance(query.init, query.distance.as_deref())?;

    let rows = state
        .studios
        .list(&StudioQuery {
            min_price: query.min_price,
            max_price: query.max_price,
            room_type: query.room_type,
            search: query.search,
            near,
            distance,
            sort_by: query.sort_by,
            sort_desc: query.sort_desc,
            page_number: query.page_number.unwrap_or(0),
            page_size: query.page_size.unwrap_or(0),
        })
        .await?;

    // Rows arrive nearest-first, so the first one carries the nearest
    // distance.
    let init_value = query
        .init
        .then(|| bucket(rows.first().and_then(|r| r.distance_km)));

    Ok(Json(StudioListDto {
        studios: rows.into_iter().map(listed_dto).collect(),
        init_value,
    }))
}

async fn get_studio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StudioDto>, AppError> {
    let studio = state
        .studios
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("studio {}", id)))?;
    Ok(Json(studio_dto(studio, None)))
}

async fn create_studio(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StudioRequest>,
) -> Result<(StatusCode, Json<StudioDto>), AppError> {
    let owner_id = require_owner(&claims)?;

    let location = match (req.lng, req.lat) {
        (Some(lng), Some(lat)) => Some(GeoPoint::new(lng, lat)?),
        _ => None,
    };
    let now = Utc::now();
    let studio = Studio {
        id: Uuid::new_v4(),
        owner_id,
        name: req.name,
        phone_number: req.phone_number,
        address: req.address,
        room_type: req.room_type,
        description: req.description,
        price: req.price,
        photo: req.photo,
        location,
        rooms: line_items(req.rooms),
        services: line_items(req.services),
        equipment: line_items(req.equipment),
        engineers: line_items(req.engineers),
        created_at: now,
        updated_at: now,
    };
    state.studios.save(&studio).await?;

    tracing::info!(studio_id = %studio.id, owner_id = %owner_id, "studio created");
    Ok((StatusCode::CREATED, Json(studio_dto(studio, None))))
}

async fn update_studio(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<StudioRequest>,
) -> Result<Json<StudioDto>, AppError> {
    let owner_id = require_owner(&claims)?;
    let existing = state
        .studios
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("studio {}", id)))?;
    if existing.owner_id != owner_id {
        return Err(AppError::AuthorizationError(
            "studio belongs to another owner".to_string(),
        ));
    }

    let location = match (req.lng, req.lat) {
        (Some(lng), Some(lat)) => Some(GeoPoint::new(lng, lat)?),
        _ => existing.location,
    };
    let studio = Studio {
        id: existing.id,
        owner_id: existing.owner_id,
        name: req.name,
        phone_number: req.phone_number,
        address: req.address,
        room_type: req.room_type,
        description: req.description,
        price: req.price,
        photo: if req.photo.is_empty() {
            existing.photo
        } else {
            req.photo
        },
        location,
        rooms: line_items(req.rooms),
        services: line_items(req.services),
        equipment: line_items(req.equipment),
        engineers: line_items(req.engineers),
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    state.studios.save(&studio).await?;
    Ok(Json(studio_dto(studio, None)))
}

async fn delete_studio(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let owner_id = require_owner(&claims)?;
    let existing = state
        .studios
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("studio {}", id)))?;
    if existing.owner_id != owner_id {
        return Err(AppError::AuthorizationError(
            "studio belongs to another owner".to_string(),
        ));
    }
    state.studios.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn require_owner(claims: &Claims) -> Result<Uuid, AppError> {
    if !claims.is_owner() {
        return Err(AppError::AuthorizationError(
            "owner role required".to_string(),
        ));
    }
    Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthenticationError("malformed subject claim".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_parses_caps_and_open_band() {
        assert_eq!(parse_distance("50").unwrap(), DistanceFilter::Within(50.0));
        assert_eq!(
            parse_distance("200+").unwrap(),
            DistanceFilter::Beyond(200.0)
        );
        assert!(parse_distance("near").is_err());
    }

    #[test]
    fn init_requests_withhold_the_distance_filter() {
        // Seeding the default filter reads the nearest result of the
        // unfiltered listing, so the carried filter must not apply.
        assert_eq!(listing_distance(true, Some("50")).unwrap(), None);
        assert_eq!(
            listing_distance(false, Some("50")).unwrap(),
            Some(DistanceFilter::Within(50.0))
        );
        assert_eq!(listing_distance(false, None).unwrap(), None);
    }
}
