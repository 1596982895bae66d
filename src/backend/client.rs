use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{
    config::AppConfig,
    error::AppError,
    models::{
        api::{ApiEnvelope, BookingPage, BookingQuery},
        booking::Booking,
        notification::{Notification, UnreadCount},
        review::{CreateReviewRequest, Review, ReviewEligibility, UpdateReviewRequest},
        stats::BookingStats,
    },
    services::confirmation::{CancelBookingRequest, ConfirmBookingRequest},
};

/// Page size used when walking every booking for the dashboard fallback.
const FULL_SCAN_PAGE_SIZE: u32 = 100;

/// Thin wrapper over the marketplace REST API. Every call carries the
/// caller's bearer token and unwraps the `{success, message, data}` envelope.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: ReqwestClient,
    base_url: Url,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let http = ReqwestClient::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.backend_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Any HTTP answer at the base URL counts as reachable.
    pub async fn ping(&self) -> Result<u16, AppError> {
        let response = self.http.get(self.base_url.clone()).send().await?;
        Ok(response.status().as_u16())
    }

    fn request(&self, method: Method, path: &str, token: &str) -> Result<RequestBuilder, AppError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| AppError::Decode(format!("Invalid endpoint {}: {}", path, e)))?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope: ApiEnvelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(AppError::Decode(format!("Failed to parse response: {}", e)));
            }
            Err(_) => {
                // error bodies that are not our envelope still carry a message
                let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                    .map(|envelope| envelope.message)
                    .ok()
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| {
                        status
                            .canonical_reason()
                            .unwrap_or("Request failed")
                            .to_string()
                    });
                return Err(AppError::Application {
                    status: status.as_u16(),
                    message,
                });
            }
        };

        if !status.is_success() || !envelope.success {
            let message = if envelope.message.is_empty() {
                "Request failed".to_string()
            } else {
                envelope.message
            };
            return Err(AppError::Application {
                status: status.as_u16(),
                message,
            });
        }

        envelope
            .data
            .ok_or_else(|| AppError::Decode("Response is missing data".to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, AppError> {
        self.send(self.request(Method::GET, path, token)?).await
    }

    async fn write<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T, AppError> {
        self.send(self.request(method, path, token)?.json(body)).await
    }

    pub async fn traveler_bookings(
        &self,
        token: &str,
        query: &BookingQuery,
    ) -> Result<BookingPage, AppError> {
        self.send(
            self.request(Method::GET, "bookings/traveler/my-bookings", token)?
                .query(query),
        )
        .await
    }

    pub async fn guider_bookings(
        &self,
        token: &str,
        query: &BookingQuery,
    ) -> Result<BookingPage, AppError> {
        self.send(
            self.request(Method::GET, "bookings/guider/my-bookings", token)?
                .query(query),
        )
        .await
    }

    /// Walks every page of the guider's bookings.
    pub async fn all_guider_bookings(&self, token: &str) -> Result<Vec<Booking>, AppError> {
        let mut bookings = Vec::new();
        let mut page = 1;
        loop {
            let query = BookingQuery {
                status: None,
                page: Some(page),
                limit: Some(FULL_SCAN_PAGE_SIZE),
            };
            let batch = self.guider_bookings(token, &query).await?;
            let fetched = batch.bookings.len();
            bookings.extend(batch.bookings);

            if fetched == 0 || bookings.len() as u64 >= batch.total {
                return Ok(bookings);
            }
            page += 1;
        }
    }

    pub async fn pending_confirmations(&self, token: &str) -> Result<Vec<Booking>, AppError> {
        self.get("bookings/guider/pending-confirmations", token).await
    }

    pub async fn guider_stats(&self, token: &str) -> Result<BookingStats, AppError> {
        self.get("bookings/guider/stats", token).await
    }

    pub async fn booking(&self, token: &str, booking_id: &str) -> Result<Booking, AppError> {
        self.get(&format!("bookings/{}", booking_id), token).await
    }

    pub async fn confirm_booking(
        &self,
        token: &str,
        booking_id: &str,
        request: &ConfirmBookingRequest,
    ) -> Result<Booking, AppError> {
        self.write(
            Method::PATCH,
            &format!("bookings/{}/confirm", booking_id),
            token,
            request,
        )
        .await
    }

    pub async fn cancel_booking(
        &self,
        token: &str,
        booking_id: &str,
        request: &CancelBookingRequest,
    ) -> Result<Booking, AppError> {
        self.write(
            Method::PATCH,
            &format!("bookings/{}/cancel", booking_id),
            token,
            request,
        )
        .await
    }

    pub async fn can_review(
        &self,
        token: &str,
        booking_id: &str,
    ) -> Result<ReviewEligibility, AppError> {
        self.get(&format!("reviews/can-review/{}", booking_id), token)
            .await
    }

    pub async fn create_review(
        &self,
        token: &str,
        request: &CreateReviewRequest,
    ) -> Result<Review, AppError> {
        self.write(Method::POST, "reviews", token, request).await
    }

    pub async fn update_review(
        &self,
        token: &str,
        review_id: &str,
        request: &UpdateReviewRequest,
    ) -> Result<Review, AppError> {
        self.write(
            Method::PATCH,
            &format!("reviews/{}", review_id),
            token,
            request,
        )
        .await
    }

    pub async fn unread_notification_count(&self, token: &str) -> Result<u64, AppError> {
        let unread: UnreadCount = self.get("notifications/unread-count", token).await?;
        Ok(unread.count)
    }

    pub async fn notifications(
        &self,
        token: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError> {
        self.send(
            self.request(Method::GET, "notifications", token)?
                .query(&[("unreadOnly", unread_only)]),
        )
        .await
    }

    pub async fn mark_notification_read(
        &self,
        token: &str,
        notification_id: &str,
    ) -> Result<Notification, AppError> {
        self.write(
            Method::PATCH,
            &format!("notifications/{}/read", notification_id),
            token,
            &serde_json::json!({}),
        )
        .await
    }
}
