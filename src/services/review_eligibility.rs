use crate::{
    error::ValidationError,
    models::{
        booking::{Booking, BookingStatus, EmbeddedReview},
        review::{
            CreateReviewRequest, Rating, Review, ReviewEligibility, ReviewInput, ReviewType,
            UpdateReviewRequest,
        },
    },
};

pub const NOT_COMPLETED_REASON: &str = "Booking must be completed before it can be reviewed";

pub fn not_completed() -> ReviewEligibility {
    ReviewEligibility {
        can_review: false,
        can_review_booking: false,
        can_review_guider: false,
        booking_review: None,
        guider_review: None,
        reason: Some(NOT_COMPLETED_REASON.to_string()),
    }
}

/// Eligibility from the booking and the reviews already stored for it.
///
/// A completed booking can always be reviewed on both targets. An existing
/// review switches that target to update mode instead of closing it.
pub fn resolve(booking: &Booking, reviews: &[Review]) -> ReviewEligibility {
    if booking.current_status() != BookingStatus::Completed {
        return not_completed();
    }

    let find = |review_type: ReviewType| {
        reviews
            .iter()
            .filter(|review| review.booking_id == booking.id && review.review_type == review_type)
            .max_by_key(|review| review.updated_at.or(review.created_at))
            .cloned()
    };

    ReviewEligibility {
        can_review: true,
        can_review_booking: true,
        can_review_guider: true,
        booking_review: find(ReviewType::Booking),
        guider_review: find(ReviewType::Guider),
        reason: None,
    }
}

/// Reconciles what `GET /reviews/can-review/:bookingId` said with the local
/// booking. The completion gate is always applied locally.
pub fn reconcile(booking: &Booking, remote: ReviewEligibility) -> ReviewEligibility {
    let existing: Vec<Review> = remote
        .booking_review
        .into_iter()
        .chain(remote.guider_review)
        .collect();
    resolve(booking, &existing)
}

/// Eligibility right after `written` was stored, built from what was known
/// before the write. Used when the backend cannot be asked again.
pub fn after_write(
    booking: &Booking,
    prior: &ReviewEligibility,
    written: &Review,
) -> ReviewEligibility {
    let mut reviews: Vec<Review> = [prior.booking_review.as_ref(), prior.guider_review.as_ref()]
        .into_iter()
        .flatten()
        .filter(|review| review.review_type != written.review_type)
        .cloned()
        .collect();
    reviews.push(written.clone());
    resolve(booking, &reviews)
}

/// A review form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReview {
    pub review_type: ReviewType,
    pub rating: Rating,
    pub comment: Option<String>,
}

/// Rating is mandatory and must be a whole number in 1..=5. The comment is
/// optional; blank comments are dropped.
pub fn validate_input(input: &ReviewInput) -> Result<ValidReview, ValidationError> {
    let review_type = input.review_type.trim().parse::<ReviewType>()?;
    let rating = Rating::from_json(&input.rating)?;
    let comment = input
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|comment| !comment.is_empty())
        .map(str::to_string);

    Ok(ValidReview {
        review_type,
        rating,
        comment,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewWrite {
    Create(CreateReviewRequest),
    Update {
        review_id: String,
        request: UpdateReviewRequest,
    },
}

/// Routes a submission to create or update so there is never more than one
/// review per booking and type.
pub fn plan_write(
    booking_id: &str,
    eligibility: &ReviewEligibility,
    review: ValidReview,
) -> Result<ReviewWrite, ValidationError> {
    if !eligibility.can_submit(review.review_type) {
        return Err(ValidationError::BookingNotCompleted);
    }

    Ok(match eligibility.existing(review.review_type) {
        Some(existing) => ReviewWrite::Update {
            review_id: existing.id.clone(),
            request: UpdateReviewRequest {
                rating: review.rating,
                comment: review.comment,
            },
        },
        None => ReviewWrite::Create(CreateReviewRequest {
            review_type: review.review_type,
            booking_id: booking_id.to_string(),
            rating: review.rating,
            comment: review.comment,
        }),
    })
}

impl EmbeddedReview {
    /// Derives the legacy per-booking summary from the standalone reviews.
    /// The tour review wins over the guider review when both exist.
    pub fn from_reviews(eligibility: &ReviewEligibility) -> Self {
        let primary = eligibility
            .booking_review
            .as_ref()
            .or(eligibility.guider_review.as_ref());

        match primary {
            Some(review) => EmbeddedReview {
                is_reviewed: true,
                rating: Some(review.rating.value()),
                review: review.comment.clone(),
                reviewed_at: review.updated_at.or(review.created_at),
            },
            None => EmbeddedReview::default(),
        }
    }
}
