use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    /// Rates the tour plan itself.
    Booking,
    /// Rates the guider's service.
    Guider,
}

impl ReviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewType::Booking => "booking",
            ReviewType::Guider => "guider",
        }
    }
}

impl std::str::FromStr for ReviewType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booking" => Ok(ReviewType::Booking),
            "guider" => Ok(ReviewType::Guider),
            other => Err(ValidationError::UnknownReviewType(other.to_string())),
        }
    }
}

/// Star rating, always an integer in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Rating(value))
        } else {
            Err(ValidationError::RatingOutOfRange(value.to_string()))
        }
    }

    /// Parses untrusted JSON input. Fractions, strings and out-of-range
    /// numbers are all rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ValidationError> {
        let number = match value {
            serde_json::Value::Number(number) => number,
            serde_json::Value::Null => return Err(ValidationError::MissingRating),
            other => return Err(ValidationError::RatingNotInteger(other.to_string())),
        };

        if let Some(whole) = number.as_i64() {
            return u8::try_from(whole)
                .map_err(|_| ValidationError::RatingOutOfRange(whole.to_string()))
                .and_then(Rating::new);
        }

        match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.is_finite() => {
                if float >= f64::from(Self::MIN) && float <= f64::from(Self::MAX) {
                    Rating::new(float as u8)
                } else {
                    Err(ValidationError::RatingOutOfRange(number.to_string()))
                }
            }
            _ => Err(ValidationError::RatingNotInteger(number.to_string())),
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub review_type: ReviewType,
    pub booking_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traveler_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guider_id: Option<String>,
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Derived view of what the traveler may do review-wise on one booking.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEligibility {
    pub can_review: bool,
    #[serde(default)]
    pub can_review_booking: bool,
    #[serde(default)]
    pub can_review_guider: bool,
    #[serde(default)]
    pub booking_review: Option<Review>,
    #[serde(default)]
    pub guider_review: Option<Review>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReviewEligibility {
    pub fn existing(&self, review_type: ReviewType) -> Option<&Review> {
        match review_type {
            ReviewType::Booking => self.booking_review.as_ref(),
            ReviewType::Guider => self.guider_review.as_ref(),
        }
    }

    pub fn can_submit(&self, review_type: ReviewType) -> bool {
        self.can_review
            && match review_type {
                ReviewType::Booking => self.can_review_booking,
                ReviewType::Guider => self.can_review_guider,
            }
    }
}

/// Review form as posted by the UI, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub review_type: String,
    #[serde(default)]
    pub rating: serde_json::Value,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub review_type: ReviewType,
    pub booking_id: String,
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
