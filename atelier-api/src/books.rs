use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_booking::{
    is_changeable, AnnotatedBooking, BookingOrigin, BookingPatch, InstantBooking, NewBooking,
    RoomAvailability,
};
use atelier_core::{Booking, BookingStatus};

use crate::error::AppError;
use crate::middleware::auth::{auth_middleware, Claims};
use crate::state::AppState;

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BooksQuery {
    resource_id: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeRangeDto {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Room availability payload. `id` is the owning studio, `resourceId`
/// the queried room.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityDto {
    id: Uuid,
    resource_id: Uuid,
    /// 1 = free, 0 = busy; one entry per hour slot.
    slots: Vec<u8>,
    free_ranges: Vec<FreeRangeDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingDto {
    id: Uuid,
    room_id: Uuid,
    studio_id: Uuid,
    assignee_id: Option<Uuid>,
    subject: String,
    is_all_day: bool,
    status: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    is_changeable: bool,
}

#[derive(Debug, Serialize)]
struct BookingListDto {
    bookings: Vec<BookingDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingRequest {
    room_id: Uuid,
    studio_id: Uuid,
    subject: String,
    #[serde(default)]
    is_all_day: bool,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    /// "Charge" makes the booking pending confirmation; anything else is
    /// an owner block.
    event_type: Option<String>,
    charge_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBookingRequest {
    subject: Option<String>,
    is_all_day: Option<bool>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    status: Option<BookingStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstantBookRequest {
    room_id: Uuid,
    studio_id: Uuid,
    subject: String,
    #[serde(default)]
    is_all_day: bool,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    credits: i64,
}

fn availability_dto(value: RoomAvailability) -> AvailabilityDto {
    AvailabilityDto {
        id: value.studio_id,
        resource_id: value.availability.resource_id,
        slots: value.availability.slots,
        free_ranges: value
            .availability
            .free_ranges
            .into_iter()
            .map(|r| FreeRangeDto {
                start: r.start,
                end: r.end,
            })
            .collect(),
    }
}

fn booking_dto(booking: Booking, is_changeable: bool) -> BookingDto {
    BookingDto {
        id: booking.id,
        room_id: booking.room_id,
        studio_id: booking.studio_id,
        assignee_id: booking.assignee_id,
        subject: booking.subject,
        is_all_day: booking.is_all_day,
        status: booking.status.as_str().to_string(),
        start_time: booking.start_time,
        end_time: booking.end_time,
        created_at: booking.created_at,
        is_changeable,
    }
}

fn annotated_dto(annotated: AnnotatedBooking) -> BookingDto {
    let is_changeable = annotated.is_changeable;
    booking_dto(annotated.booking, is_changeable)
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/v1/books", post(create_book))
        .route("/v1/books/{id}", put(update_book).delete(delete_book))
        .route("/v1/books/booked", post(instant_book))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/v1/books", get(list_books))
        .merge(protected)
}

/// Dual-mode listing. With both `resourceId` and `date` it returns the
/// free/busy timeline for that room and day; otherwise it returns the
/// bookings themselves.
async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BooksQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    match (query.resource_id.as_deref(), query.date.as_deref()) {
        (Some(resource_id), Some(date)) => {
            let room_id = Uuid::parse_str(resource_id)
                .map_err(|_| AppError::ValidationError(format!("bad resourceId {}", resource_id)))?;
            let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| AppError::ValidationError(format!("bad date {}", date)))?;

            let availability = state.service.list_availability(room_id, day).await?;
            Ok(Json(serde_json::to_value(availability_dto(availability))
                .map_err(|e| AppError::InternalServerError(e.to_string()))?))
        }
        _ => {
            let room_id = match query.resource_id.as_deref() {
                Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
                    AppError::ValidationError(format!("bad resourceId {}", raw))
                })?),
                None => None,
            };
            let bookings = state.service.list_bookings(room_id).await?;
            let body = BookingListDto {
                bookings: bookings.into_iter().map(annotated_dto).collect(),
            };
            Ok(Json(
                serde_json::to_value(body)
                    .map_err(|e| AppError::InternalServerError(e.to_string()))?,
            ))
        }
    }
}

async fn create_book(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingDto>), AppError> {
    let origin = match req.event_type.as_deref() {
        Some("Charge") => BookingOrigin::Charge,
        _ => BookingOrigin::OwnerBlock,
    };
    let booking = state
        .service
        .create_booking(NewBooking {
            room_id: req.room_id,
            studio_id: req.studio_id,
            subject: req.subject,
            is_all_day: req.is_all_day,
            start_time: req.start_time,
            end_time: req.end_time,
            origin,
            charge_id: req.charge_id,
        })
        .await?;

    let changeable = is_changeable(booking.status);
    Ok((StatusCode::CREATED, Json(booking_dto(booking, changeable))))
}

async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<BookingDto>, AppError> {
    let booking = state
        .service
        .update_booking(
            id,
            BookingPatch {
                subject: req.subject,
                is_all_day: req.is_all_day,
                start_time: req.start_time,
                end_time: req.end_time,
                status: req.status,
            },
        )
        .await?;
    let changeable = is_changeable(booking.status);
    Ok(Json(booking_dto(booking, changeable)))
}

async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.service.remove_booking(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Instant booking paid from the caller's credit balance.
async fn instant_book(
    State(state): State<AppState>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(req): Json<InstantBookRequest>,
) -> Result<(StatusCode, Json<BookingDto>), AppError> {
    let artist_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthenticationError("malformed subject claim".to_string()))?;

    let booking = state
        .service
        .instant_book(InstantBooking {
            artist_id,
            room_id: req.room_id,
            studio_id: req.studio_id,
            subject: req.subject,
            is_all_day: req.is_all_day,
            start_time: req.start_time,
            end_time: req.end_time,
            credits: req.credits,
        })
        .await?;

    let changeable = is_changeable(booking.status);
    Ok((StatusCode::CREATED, Json(booking_dto(booking, changeable))))
}
