use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::{
    backend::BackendClient,
    error::AppError,
    middleware::auth_context::AuthenticatedUser,
    models::{
        booking::{Booking, BookingStatus, EmbeddedReview},
        review::{Review, ReviewEligibility, ReviewInput},
    },
    routes::respond,
    services::{
        in_flight::InFlightRegistry,
        lifecycle::{ensure_allowed, Actor, BookingAction},
        review_eligibility::{self, ReviewWrite},
    },
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub review: Review,
    pub eligibility: ReviewEligibility,
    pub summary: EmbeddedReview,
}

/// Skips the review lookup entirely for bookings that are not completed.
async fn eligibility_for(
    backend: &BackendClient,
    token: &str,
    booking: &Booking,
) -> Result<ReviewEligibility, AppError> {
    if booking.current_status() != BookingStatus::Completed {
        return Ok(review_eligibility::not_completed());
    }
    let remote = backend.can_review(token, &booking.id).await?;
    Ok(review_eligibility::reconcile(booking, remote))
}

pub async fn get_review_eligibility(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let booking = backend.booking(&user.token, &path.into_inner()).await?;
    let eligibility = eligibility_for(&backend, &user.token, &booking).await?;
    Ok(respond("Review eligibility retrieved", eligibility))
}

pub async fn submit_review(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    in_flight: web::Data<InFlightRegistry>,
    path: web::Path<String>,
    input: web::Json<ReviewInput>,
) -> Result<HttpResponse, AppError> {
    let booking_id = path.into_inner();
    let review = review_eligibility::validate_input(&input)?;

    let _guard = in_flight.try_acquire(&booking_id)?;
    let booking = backend.booking(&user.token, &booking_id).await?;
    ensure_allowed(&booking, Actor::Traveler, BookingAction::Review)?;

    let prior = eligibility_for(&backend, &user.token, &booking).await?;
    let write = review_eligibility::plan_write(&booking_id, &prior, review)?;

    let outcome = match &write {
        ReviewWrite::Create(request) => {
            log::info!(
                "Traveler {} creating {} review for booking {}",
                user.user_id,
                request.review_type.as_str(),
                booking_id
            );
            backend.create_review(&user.token, request).await
        }
        ReviewWrite::Update { review_id, request } => {
            log::info!(
                "Traveler {} updating review {} for booking {}",
                user.user_id,
                review_id,
                booking_id
            );
            backend.update_review(&user.token, review_id, request).await
        }
    };

    let review = match outcome {
        Ok(review) => review,
        Err(e) if e.is_rejection() => {
            log::warn!("Backend rejected review for booking {}: {}", booking_id, e);
            let booking = backend.booking(&user.token, &booking_id).await.ok();
            return Err(AppError::StaleState {
                message: e.to_string(),
                booking: booking.map(Box::new),
            });
        }
        Err(e) => return Err(e),
    };

    // fresh from the backend so the form switches to update mode
    let eligibility = match eligibility_for(&backend, &user.token, &booking).await {
        Ok(eligibility) => eligibility,
        Err(e) => {
            // the review is stored, so the submission still succeeded
            log::warn!(
                "Eligibility refresh after review on booking {} failed: {}",
                booking_id,
                e
            );
            review_eligibility::after_write(&booking, &prior, &review)
        }
    };
    let summary = EmbeddedReview::from_reviews(&eligibility);

    let message = match write {
        ReviewWrite::Create(_) => "Review submitted",
        ReviewWrite::Update { .. } => "Review updated",
    };
    Ok(respond(
        message,
        ReviewOutcome {
            review,
            eligibility,
            summary,
        },
    ))
}
