use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::{
    backend::BackendClient,
    error::AppError,
    middleware::{
        auth::{AuthMiddleware, Role},
        auth_context::AuthenticatedUser,
        role_auth::RequireRole,
    },
    models::{api::ApiEnvelope, booking::Booking},
};

pub mod bookings;
pub mod guider;
pub mod health;
pub mod notifications;
pub mod reviews;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/traveler")
                    .wrap(RequireRole::new(Role::Traveler))
                    .wrap(AuthMiddleware)
                    .route("/bookings", web::get().to(bookings::list_bookings))
                    .route("/bookings/{id}", web::get().to(bookings::get_booking))
                    .route(
                        "/bookings/{id}/cancel",
                        web::post().to(bookings::cancel_booking),
                    )
                    .route(
                        "/bookings/{id}/review-eligibility",
                        web::get().to(reviews::get_review_eligibility),
                    )
                    .route(
                        "/bookings/{id}/reviews",
                        web::post().to(reviews::submit_review),
                    ),
            )
            .service(
                web::scope("/guider")
                    .wrap(RequireRole::new(Role::Guider))
                    .wrap(AuthMiddleware)
                    .route("/bookings", web::get().to(bookings::list_bookings))
                    .route("/bookings/{id}", web::get().to(bookings::get_booking))
                    .route(
                        "/bookings/{id}/decision",
                        web::post().to(guider::decide_booking),
                    )
                    .route(
                        "/pending-confirmations",
                        web::get().to(guider::pending_confirmations),
                    )
                    .route("/dashboard", web::get().to(guider::dashboard)),
            )
            .service(
                web::scope("")
                    .wrap(AuthMiddleware)
                    .route("/session", web::post().to(notifications::start_session))
                    .route("/session", web::delete().to(notifications::end_session))
                    .route(
                        "/notifications",
                        web::get().to(notifications::list_notifications),
                    )
                    .route(
                        "/notifications/unread-count",
                        web::get().to(notifications::unread_count),
                    )
                    .route(
                        "/notifications/{id}/read",
                        web::post().to(notifications::mark_read),
                    ),
            ),
    );
}

pub(crate) fn respond<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiEnvelope::ok(message, data))
}

/// Settles a mutation against the backend's state of record. Success
/// refetches the booking rather than trusting what was sent. A rejection
/// refetches too and reports the fresh booking alongside the error.
pub(crate) async fn settle_mutation(
    backend: &BackendClient,
    user: &AuthenticatedUser,
    booking_id: &str,
    outcome: Result<Booking, AppError>,
) -> Result<Booking, AppError> {
    match outcome {
        Ok(returned) => match backend.booking(&user.token, booking_id).await {
            Ok(fresh) => Ok(fresh),
            Err(e) => {
                log::warn!(
                    "Refetch after mutating booking {} failed, using mutation response: {}",
                    booking_id,
                    e
                );
                Ok(returned)
            }
        },
        Err(e) if e.is_rejection() => {
            log::warn!("Backend rejected mutation on booking {}: {}", booking_id, e);
            let booking = backend
                .booking(&user.token, booking_id)
                .await
                .map_err(|refetch_err| {
                    log::warn!("Refetch of booking {} failed: {}", booking_id, refetch_err)
                })
                .ok();
            Err(AppError::StaleState {
                message: e.to_string(),
                booking: booking.map(Box::new),
            })
        }
        Err(e) => Err(e),
    }
}
