use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;

use crate::{
    backend::BackendClient,
    config::AppConfig,
    error::AppError,
    middleware::auth_context::AuthenticatedUser,
    models::stats::{DashboardView, StatsSource},
    routes::{respond, settle_mutation},
    services::{
        confirmation::{self, prepare_decision, DecisionInput, GuiderDecision},
        dashboard,
        in_flight::InFlightRegistry,
        lifecycle::{Actor, BookingView},
    },
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub booking: BookingView,
    /// `None` when the pending list could not be refreshed.
    pub awaiting_confirmation: Option<usize>,
}

async fn awaiting_count(backend: &BackendClient, token: &str) -> Result<usize, AppError> {
    let pending = backend.pending_confirmations(token).await?;
    Ok(confirmation::pending_confirmations(pending, Utc::now()).len())
}

pub async fn pending_confirmations(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
) -> Result<HttpResponse, AppError> {
    let bookings = backend.pending_confirmations(&user.token).await?;
    let pending = confirmation::pending_confirmations(bookings, Utc::now());
    Ok(respond("Pending confirmations retrieved", pending))
}

pub async fn decide_booking(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    in_flight: web::Data<InFlightRegistry>,
    path: web::Path<String>,
    input: web::Json<DecisionInput>,
) -> Result<HttpResponse, AppError> {
    let booking_id = path.into_inner();
    let input = input.into_inner();

    let decision = GuiderDecision::parse(&input)?;

    let _guard = in_flight.try_acquire(&booking_id)?;
    let booking = backend.booking(&user.token, &booking_id).await?;
    let request = prepare_decision(&booking, &input)?;

    log::info!(
        "Guider {} submitting {} for booking {}",
        user.user_id,
        decision.action().as_str(),
        booking_id
    );
    let outcome = backend
        .confirm_booking(&user.token, &booking_id, &request)
        .await;
    let booking = settle_mutation(&backend, &user, &booking_id, outcome).await?;

    // the awaiting-action alert must come from the source, not a local splice
    let awaiting_confirmation = match awaiting_count(&backend, &user.token).await {
        Ok(count) => Some(count),
        Err(e) => {
            log::warn!("Failed to refresh pending confirmations: {}", e);
            None
        }
    };

    let message = match decision {
        GuiderDecision::Confirm { .. } => "Booking confirmed",
        GuiderDecision::Cancel { .. } => "Booking cancelled",
    };
    Ok(respond(
        message,
        DecisionOutcome {
            booking: BookingView::new(booking, Actor::Guider),
            awaiting_confirmation,
        },
    ))
}

pub async fn dashboard(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let bucket = config.rejected_bucket;

    let (stats, source) = match backend.guider_stats(&user.token).await {
        Ok(stats) => (dashboard::from_stats(&stats, bucket), StatsSource::StatsEndpoint),
        Err(e) => {
            log::warn!("Stats endpoint unavailable, counting bookings instead: {}", e);
            let bookings = backend.all_guider_bookings(&user.token).await?;
            (dashboard::from_bookings(&bookings, bucket), StatsSource::Bookings)
        }
    };

    let awaiting_confirmation = awaiting_count(&backend, &user.token).await?;

    Ok(respond(
        "Dashboard retrieved",
        DashboardView {
            stats,
            awaiting_confirmation,
            source,
        },
    ))
}
