#![allow(dead_code)]

use actix_web::{
    dev::{ServerHandle, Service, ServiceResponse},
    http::StatusCode,
    test, web, App, HttpRequest, HttpResponse, HttpServer,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

use localguide_web::{
    config::AppConfig,
    middleware::auth::{Claims, Role},
    models::{
        booking::{Booking, BookingStatus, GuiderConfirmation},
        notification::Notification,
        review::{CreateReviewRequest, Review, ReviewType, UpdateReviewRequest},
    },
    services::confirmation::{CancelBookingRequest, ConfirmBookingRequest},
    AppState,
};

pub const TEST_SECRET: &str = "test_secret";
pub const TRAVELER_ID: &str = "traveler_1";
pub const GUIDER_ID: &str = "guider_1";

/// In-memory stand-in for the marketplace backend.
#[derive(Default)]
pub struct MockState {
    pub bookings: Mutex<HashMap<String, Booking>>,
    pub reviews: Mutex<Vec<Review>>,
    pub notifications: Mutex<Vec<Notification>>,
    pub mutations: AtomicUsize,
    pub review_seq: AtomicUsize,
    pub unread: AtomicU64,
    pub stats_unavailable: AtomicBool,
    /// Next booking mutation is refused as if someone else changed the booking first.
    pub reject_next_mutation: AtomicBool,
    /// Next booking mutation fails with a 503 and changes nothing.
    pub unavailable_next_mutation: AtomicBool,
    /// can-review answers 503 once the booking has a review.
    pub can_review_busy_after_write: AtomicBool,
    pub last_status_query: Mutex<Option<String>>,
}

impl MockState {
    pub fn seed(&self, bookings: Vec<Booking>) {
        let mut stored = self.bookings.lock().unwrap();
        for booking in bookings {
            stored.insert(booking.id.clone(), booking);
        }
    }

    pub fn booking(&self, id: &str) -> Booking {
        self.bookings.lock().unwrap().get(id).cloned().unwrap()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn reviews_for(&self, booking_id: &str, review_type: ReviewType) -> Vec<Review> {
        self.reviews
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.booking_id == booking_id && r.review_type == review_type)
            .cloned()
            .collect()
    }

    fn sorted_bookings(&self) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self.bookings.lock().unwrap().values().cloned().collect();
        bookings.sort_by(|a, b| a.id.cmp(&b.id));
        bookings
    }
}

pub struct MockBackend {
    pub state: Arc<MockState>,
    pub base_url: String,
    handle: ServerHandle,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let data = web::Data::from(Arc::clone(&state));

        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route("/health", web::get().to(|| async { "OK" }))
                .service(
                    web::scope("/api")
                        .route("/bookings/traveler/my-bookings", web::get().to(my_bookings))
                        .route("/bookings/guider/my-bookings", web::get().to(my_bookings))
                        .route(
                            "/bookings/guider/pending-confirmations",
                            web::get().to(pending_confirmations),
                        )
                        .route("/bookings/guider/stats", web::get().to(guider_stats))
                        .route("/bookings/{id}", web::get().to(get_booking))
                        .route("/bookings/{id}/confirm", web::patch().to(confirm_booking))
                        .route("/bookings/{id}/cancel", web::patch().to(cancel_booking))
                        .route("/reviews/can-review/{id}", web::get().to(can_review))
                        .route("/reviews", web::post().to(create_review))
                        .route("/reviews/{id}", web::patch().to(update_review))
                        .route("/notifications/unread-count", web::get().to(unread_count))
                        .route("/notifications", web::get().to(list_notifications))
                        .route("/notifications/{id}/read", web::patch().to(mark_read)),
                )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("mock backend should bind");

        let port = server.addrs()[0].port();
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        wait_for_server_ready(port).await;

        Self {
            state,
            base_url: format!("http://127.0.0.1:{}/api/", port),
            handle,
        }
    }

    pub async fn stop(&self) {
        self.handle.stop(false).await;
    }
}

pub struct TestApp {
    pub backend: MockBackend,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let backend = MockBackend::start().await;
        let base_url = backend.base_url.clone();
        let config = AppConfig::from_lookup(|key| match key {
            "BACKEND_API_URL" => Some(base_url.clone()),
            "JWT_SECRET" => Some(TEST_SECRET.to_string()),
            "REQUEST_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::new(config).unwrap();
        Self { backend, state }
    }

    pub fn mock(&self) -> &MockState {
        &self.backend.state
    }
}

pub fn token_for(role: Role) -> String {
    // fixed timestamps keep the token stable, sessions are keyed by it
    token_expiring_at(role, 4_102_444_800)
}

/// A token whose `exp` is `secs` seconds from now.
pub fn token_expiring_in(role: Role, secs: i64) -> String {
    token_expiring_at(role, (Utc::now().timestamp() + secs) as usize)
}

fn token_expiring_at(role: Role, exp: usize) -> String {
    let user_id = match role {
        Role::Traveler => TRAVELER_ID,
        Role::Guider => GUIDER_ID,
    };
    let claims = Claims {
        sub: format!("{}@example.com", user_id),
        exp,
        iat: 1_700_000_000,
        user_id: user_id.to_string(),
        role,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn bearer(role: Role) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token_for(role)))
}

pub fn booking(id: &str, status: &str) -> Booking {
    let guider_confirmation = match status {
        "pending" => "pending",
        "cancelled" | "rejected" => "cancelled",
        _ => "confirmed",
    };
    serde_json::from_value(json!({
        "_id": id,
        "planId": { "_id": "plan_1", "title": "Lisbon Food Walk" },
        "guiderId": { "_id": GUIDER_ID, "firstName": "Rui", "lastName": "Costa" },
        "travelerId": TRAVELER_ID,
        "bookingDetails": { "date": "2025-06-01", "numberOfParticipants": 2 },
        "financial": { "totalAmount": 90.0, "currency": "EUR", "isPaid": true },
        "status": { "status": status, "guiderConfirmation": guider_confirmation },
        "timeline": { "confirmationDeadlineHours": 24 },
        "createdAt": "2025-05-01T08:00:00Z"
    }))
    .unwrap()
}

/// Status of a call, whether the handler answered or a middleware refused.
pub async fn status_of<S, R, B>(app: &S, req: R) -> StatusCode
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
{
    match test::try_call_service(app, req).await {
        Ok(resp) => resp.status(),
        Err(err) => err.as_response_error().status_code(),
    }
}

pub async fn wait_for_server_ready(port: u16) {
    for _ in 0..30 {
        if let Ok(_) = reqwest::get(&format!("http://127.0.0.1:{}/health", port)).await {
            return;
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("Server failed to start within timeout");
}

// Mock handler functions

fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "message": "OK", "data": data }))
}

fn fail(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "success": false, "message": message }))
}

fn authorized(req: &HttpRequest) -> bool {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer "))
        .unwrap_or(false)
}

#[derive(Deserialize)]
struct PageQuery {
    status: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

async fn my_bookings(
    req: HttpRequest,
    state: web::Data<MockState>,
    query: web::Query<PageQuery>,
) -> HttpResponse {
    if !authorized(&req) {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    *state.last_status_query.lock().unwrap() = query.status.clone();
    let bookings = state.sorted_bookings();
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).max(1);
    let items: Vec<Booking> = bookings
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .cloned()
        .collect();
    ok(json!({
        "bookings": items,
        "total": bookings.len(),
        "page": page,
        "limit": limit
    }))
}

async fn pending_confirmations(state: web::Data<MockState>) -> HttpResponse {
    let pending: Vec<Booking> = state
        .sorted_bookings()
        .into_iter()
        .filter(|b| b.status.status == BookingStatus::Pending)
        .collect();
    ok(pending)
}

async fn guider_stats(state: web::Data<MockState>) -> HttpResponse {
    if state.stats_unavailable.load(Ordering::SeqCst) {
        return fail(StatusCode::SERVICE_UNAVAILABLE, "Stats are being recalculated");
    }
    let bookings = state.sorted_bookings();
    let count = |status: BookingStatus| bookings.iter().filter(|b| b.status.status == status).count();
    let revenue: f64 = bookings
        .iter()
        .filter(|b| {
            b.financial.is_paid
                && !matches!(b.status.status, BookingStatus::Cancelled | BookingStatus::Rejected)
        })
        .map(|b| b.financial.total_amount)
        .sum();
    ok(json!({
        "totalBookings": bookings.len(),
        "confirmedBookings": count(BookingStatus::Confirmed),
        "pendingBookings": count(BookingStatus::Pending),
        "cancelledBookings": count(BookingStatus::Cancelled),
        "rejectedBookings": count(BookingStatus::Rejected),
        "totalRevenue": revenue,
        "averageRating": 4.5,
        "totalReviews": state.reviews.lock().unwrap().len()
    }))
}

async fn get_booking(state: web::Data<MockState>, path: web::Path<String>) -> HttpResponse {
    match state.bookings.lock().unwrap().get(&path.into_inner()) {
        Some(booking) => ok(booking),
        None => fail(StatusCode::NOT_FOUND, "Booking not found"),
    }
}

async fn confirm_booking(
    state: web::Data<MockState>,
    path: web::Path<String>,
    body: web::Json<ConfirmBookingRequest>,
) -> HttpResponse {
    state.mutations.fetch_add(1, Ordering::SeqCst);
    let mut bookings = state.bookings.lock().unwrap();
    let Some(booking) = bookings.get_mut(&path.into_inner()) else {
        return fail(StatusCode::NOT_FOUND, "Booking not found");
    };
    if state.reject_next_mutation.swap(false, Ordering::SeqCst)
        || booking.status.status != BookingStatus::Pending
    {
        // the real backend answers 200 with success:false here
        return HttpResponse::Ok().json(json!({
            "success": false,
            "message": "Booking is no longer pending"
        }));
    }

    let now = Utc::now();
    match body.decision {
        GuiderConfirmation::Confirmed => {
            booking.status.status = BookingStatus::Confirmed;
            booking.status.guider_confirmation = GuiderConfirmation::Confirmed;
            booking.status.guider_confirmation_at = Some(now);
            booking.status.guider_confirmation_message = body.message.clone();
        }
        GuiderConfirmation::Cancelled => {
            booking.status.status = BookingStatus::Cancelled;
            booking.status.guider_confirmation = GuiderConfirmation::Cancelled;
            booking.cancellation.reason = body.cancellation_reason.clone();
            booking.cancellation.cancelled_at = Some(now);
            booking.cancellation.cancelled_by = Some(GUIDER_ID.to_string());
        }
        GuiderConfirmation::Pending => {
            return fail(StatusCode::BAD_REQUEST, "Invalid decision");
        }
    }
    booking.updated_at = Some(now);
    ok(booking.clone())
}

async fn cancel_booking(
    state: web::Data<MockState>,
    path: web::Path<String>,
    body: web::Json<CancelBookingRequest>,
) -> HttpResponse {
    state.mutations.fetch_add(1, Ordering::SeqCst);
    if state.unavailable_next_mutation.swap(false, Ordering::SeqCst) {
        return fail(StatusCode::SERVICE_UNAVAILABLE, "Bookings service unavailable");
    }
    let mut bookings = state.bookings.lock().unwrap();
    let Some(booking) = bookings.get_mut(&path.into_inner()) else {
        return fail(StatusCode::NOT_FOUND, "Booking not found");
    };
    if state.reject_next_mutation.swap(false, Ordering::SeqCst) {
        // someone else got there first
        booking.status.status = BookingStatus::Completed;
        return fail(StatusCode::BAD_REQUEST, "Booking can no longer be cancelled");
    }
    if !matches!(
        booking.status.status,
        BookingStatus::Pending | BookingStatus::Confirmed
    ) {
        return fail(StatusCode::BAD_REQUEST, "Booking can no longer be cancelled");
    }

    let now = Utc::now();
    booking.status.status = BookingStatus::Cancelled;
    booking.cancellation.reason = Some(body.cancellation_reason.clone());
    booking.cancellation.cancelled_at = Some(now);
    booking.cancellation.cancelled_by = Some(TRAVELER_ID.to_string());
    booking.updated_at = Some(now);
    ok(booking.clone())
}

async fn can_review(state: web::Data<MockState>, path: web::Path<String>) -> HttpResponse {
    let booking_id = path.into_inner();
    let completed = state
        .bookings
        .lock()
        .unwrap()
        .get(&booking_id)
        .map(|b| b.status.status == BookingStatus::Completed)
        .unwrap_or(false);
    if !completed {
        return ok(json!({
            "canReview": false,
            "canReviewBooking": false,
            "canReviewGuider": false,
            "bookingReview": null,
            "guiderReview": null,
            "reason": "Booking is not completed"
        }));
    }
    let booking_review = state.reviews_for(&booking_id, ReviewType::Booking).pop();
    let guider_review = state.reviews_for(&booking_id, ReviewType::Guider).pop();
    if state.can_review_busy_after_write.load(Ordering::SeqCst)
        && (booking_review.is_some() || guider_review.is_some())
    {
        return fail(StatusCode::SERVICE_UNAVAILABLE, "Reviews service busy");
    }
    ok(json!({
        "canReview": true,
        "canReviewBooking": booking_review.is_none(),
        "canReviewGuider": guider_review.is_none(),
        "bookingReview": booking_review,
        "guiderReview": guider_review
    }))
}

async fn create_review(
    state: web::Data<MockState>,
    body: web::Json<CreateReviewRequest>,
) -> HttpResponse {
    state.mutations.fetch_add(1, Ordering::SeqCst);
    let body = body.into_inner();
    if !state.reviews_for(&body.booking_id, body.review_type).is_empty() {
        return fail(StatusCode::CONFLICT, "Review already exists");
    }
    let id = format!("review_{}", state.review_seq.fetch_add(1, Ordering::SeqCst) + 1);
    let review = Review {
        id,
        review_type: body.review_type,
        booking_id: body.booking_id,
        plan_id: Some("plan_1".to_string()),
        traveler_id: Some(TRAVELER_ID.to_string()),
        guider_id: Some(GUIDER_ID.to_string()),
        rating: body.rating,
        comment: body.comment,
        is_verified: true,
        created_at: Some(Utc::now()),
        updated_at: None,
    };
    state.reviews.lock().unwrap().push(review.clone());
    HttpResponse::Created().json(json!({ "success": true, "message": "Review created", "data": review }))
}

async fn update_review(
    state: web::Data<MockState>,
    path: web::Path<String>,
    body: web::Json<UpdateReviewRequest>,
) -> HttpResponse {
    state.mutations.fetch_add(1, Ordering::SeqCst);
    let review_id = path.into_inner();
    let mut reviews = state.reviews.lock().unwrap();
    match reviews.iter_mut().find(|r| r.id == review_id) {
        Some(review) => {
            review.rating = body.rating;
            review.comment = body.comment.clone();
            review.updated_at = Some(Utc::now());
            ok(review.clone())
        }
        None => fail(StatusCode::NOT_FOUND, "Review not found"),
    }
}

async fn unread_count(state: web::Data<MockState>) -> HttpResponse {
    ok(json!({ "count": state.unread.load(Ordering::SeqCst) }))
}

async fn list_notifications(state: web::Data<MockState>) -> HttpResponse {
    ok(state.notifications.lock().unwrap().clone())
}

async fn mark_read(state: web::Data<MockState>, path: web::Path<String>) -> HttpResponse {
    state.mutations.fetch_add(1, Ordering::SeqCst);
    let id = path.into_inner();
    let mut notifications = state.notifications.lock().unwrap();
    match notifications.iter_mut().find(|n| n.id == id) {
        Some(notification) => {
            if !notification.is_read {
                notification.is_read = true;
                state.unread.fetch_sub(1, Ordering::SeqCst);
            }
            ok(notification.clone())
        }
        None => fail(StatusCode::NOT_FOUND, "Notification not found"),
    }
}
