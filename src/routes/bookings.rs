use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{
    backend::BackendClient,
    error::{AppError, ValidationError},
    middleware::auth_context::AuthenticatedUser,
    models::{
        api::{BookingQuery, Page},
        booking::BookingStatus,
    },
    routes::{respond, settle_mutation},
    services::{
        confirmation::{prepare_cancellation, CancellationReason},
        in_flight::InFlightRegistry,
        lifecycle::{Actor, BookingView},
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelInput {
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

fn status_filter(raw: Option<&str>) -> Result<Option<BookingStatus>, ValidationError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty() && *raw != "all") {
        None => Ok(None),
        Some(raw) => raw
            .parse::<BookingStatus>()
            .map(Some)
            .map_err(|_| ValidationError::UnknownStatus(raw.to_string())),
    }
}

pub async fn list_bookings(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    query: web::Query<BookingQuery>,
) -> Result<HttpResponse, AppError> {
    let mut query = query.into_inner();
    let wanted = status_filter(query.status.as_deref())?;
    // "all" and blank mean no filter, the backend only sees real statuses
    query.status = wanted.map(|status| status.as_str().to_string());
    let actor = user.actor();

    let page = match actor {
        Actor::Traveler => backend.traveler_bookings(&user.token, &query).await?,
        Actor::Guider => backend.guider_bookings(&user.token, &query).await?,
    };

    let fetched = page.bookings.len();
    let items: Vec<BookingView> = page
        .bookings
        .into_iter()
        .filter(|booking| wanted.map_or(true, |status| booking.current_status() == status))
        .map(|booking| BookingView::new(booking, actor))
        .collect();

    // the backend ignored the filter, so its total counts the wrong set
    let total = if items.len() < fetched {
        items.len() as u64
    } else {
        page.total
    };

    Ok(respond(
        "Bookings retrieved",
        Page {
            items,
            total,
            page: page.page,
            limit: page.limit,
        },
    ))
}

pub async fn get_booking(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let booking = backend.booking(&user.token, &path.into_inner()).await?;
    Ok(respond("Booking retrieved", BookingView::new(booking, user.actor())))
}

pub async fn cancel_booking(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    in_flight: web::Data<InFlightRegistry>,
    path: web::Path<String>,
    input: web::Json<CancelInput>,
) -> Result<HttpResponse, AppError> {
    let booking_id = path.into_inner();
    let input = input.into_inner();

    // a blank reason never costs a round trip
    CancellationReason::parse(input.cancellation_reason.as_deref())?;

    let _guard = in_flight.try_acquire(&booking_id)?;
    let booking = backend.booking(&user.token, &booking_id).await?;
    let request = prepare_cancellation(&booking, input.cancellation_reason.as_deref())?;

    log::info!("Traveler {} cancelling booking {}", user.user_id, booking_id);
    let outcome = backend
        .cancel_booking(&user.token, &booking_id, &request)
        .await;
    let booking = settle_mutation(&backend, &user, &booking_id, outcome).await?;

    Ok(respond(
        "Booking cancelled",
        BookingView::new(booking, Actor::Traveler),
    ))
}
