use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A plan or guider reference as the backend sends it: either the bare id or
/// the populated document, depending on which endpoint produced the booking.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Reference<T> {
    Populated(T),
    Id(String),
}

/// Documents that carry their own id.
pub trait Identified {
    fn id(&self) -> &str;
}

impl<T: Identified> Reference<T> {
    pub fn id(&self) -> &str {
        match self {
            Reference::Populated(doc) => doc.id(),
            Reference::Id(id) => id,
        }
    }

    pub fn populated(&self) -> Option<&T> {
        match self {
            Reference::Populated(doc) => Some(doc),
            Reference::Id(_) => None,
        }
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, Reference::Populated(_))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
}

impl Identified for PlanSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuiderSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identified for GuiderSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

impl GuiderSummary {
    pub fn display_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(name), None) | (None, Some(name)) => Some(name.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Rejected,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
        BookingStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Completed | BookingStatus::Rejected
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown booking status: {}", s))
    }
}

/// The guider's side of the decision, tracked independently of the booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuiderConfirmation {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingState {
    pub status: BookingStatus,
    #[serde(default)]
    pub guider_confirmation: GuiderConfirmation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guider_confirmation_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guider_confirmation_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub number_of_participants: u32,
    #[serde(default)]
    pub is_group_booking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Processed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    #[serde(default)]
    pub is_refunded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_status: Option<RefundStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_requested_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Financial {
    pub total_amount: f64,
    pub currency: String,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refund: Refund,
}

impl Financial {
    /// Amount actually refunded to the traveler so far.
    pub fn refunded_amount(&self) -> f64 {
        match self.refund.refund_status {
            Some(RefundStatus::Processed) if self.refund.is_refunded => {
                self.refund.refund_amount.unwrap_or(self.total_amount)
            }
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary_restrictions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessibility_needs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<serde_json::Value>,
}

/// Legacy single-review shadow embedded in the booking. Read-only here:
/// the standalone `Review` records are the writable source of truth.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedReview {
    #[serde(default)]
    pub is_reviewed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_expiry_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_deadline_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub plan_id: Reference<PlanSummary>,
    pub guider_id: Reference<GuiderSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traveler_id: Option<String>,
    pub booking_details: BookingDetails,
    pub financial: Financial,
    pub status: BookingState,
    #[serde(default)]
    pub cancellation: Cancellation,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub review: EmbeddedReview,
    #[serde(default)]
    pub timeline: Timeline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn current_status(&self) -> BookingStatus {
        self.status.status
    }

    pub fn plan_title(&self) -> Option<&str> {
        self.plan_id.populated().map(|plan| plan.title.as_str())
    }

    pub fn guider_name(&self) -> Option<String> {
        self.guider_id.populated().and_then(GuiderSummary::display_name)
    }

    /// When the guider has to have decided by, if the backend set a window.
    pub fn confirmation_deadline(&self) -> Option<DateTime<Utc>> {
        let hours = self.timeline.confirmation_deadline_hours?;
        let created_at = self.created_at?;
        Some(created_at + Duration::hours(i64::from(hours)))
    }

    pub fn is_confirmation_overdue(&self, now: DateTime<Utc>) -> bool {
        self.current_status() == BookingStatus::Pending
            && self
                .confirmation_deadline()
                .map(|deadline| now > deadline)
                .unwrap_or(false)
    }
}

/// Booking dates arrive either as `YYYY-MM-DD` or as a full RFC 3339 timestamp.
pub mod calendar_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(date) = NaiveDate::parse_from_str(&raw, FORMAT) {
            return Ok(date);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|timestamp| timestamp.date_naive())
            .map_err(|e| D::Error::custom(format!("invalid booking date {:?}: {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn booking_json(plan: serde_json::Value, guider: serde_json::Value) -> serde_json::Value {
        json!({
            "_id": "b1",
            "planId": plan,
            "guiderId": guider,
            "bookingDetails": {
                "date": "2025-03-14T00:00:00.000Z",
                "numberOfParticipants": 2
            },
            "financial": { "totalAmount": 120.0, "currency": "USD", "isPaid": true },
            "status": { "status": "pending", "guiderConfirmation": "pending" },
            "timeline": { "confirmationDeadlineHours": 24 },
            "createdAt": "2025-03-01T10:00:00Z"
        })
    }

    #[test]
    fn test_bare_references() {
        let booking: Booking = serde_json::from_value(booking_json(json!("p1"), json!("g1"))).unwrap();
        assert_eq!(booking.plan_id.id(), "p1");
        assert!(!booking.plan_id.is_populated());
        assert_eq!(booking.plan_title(), None);
        assert_eq!(booking.guider_name(), None);
    }

    #[test]
    fn test_populated_references() {
        let booking: Booking = serde_json::from_value(booking_json(
            json!({ "_id": "p1", "title": "Old Town Walk" }),
            json!({ "_id": "g1", "firstName": "Ana", "lastName": "Silva" }),
        ))
        .unwrap();
        assert_eq!(booking.plan_id.id(), "p1");
        assert_eq!(booking.plan_title(), Some("Old Town Walk"));
        assert_eq!(booking.guider_name().as_deref(), Some("Ana Silva"));
    }

    #[test]
    fn test_calendar_date_accepts_both_formats() {
        let booking: Booking = serde_json::from_value(booking_json(json!("p1"), json!("g1"))).unwrap();
        assert_eq!(
            booking.booking_details.date,
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
        );

        let details: BookingDetails = serde_json::from_value(json!({
            "date": "2025-07-01",
            "numberOfParticipants": 1
        }))
        .unwrap();
        assert_eq!(details.date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(serde_json::to_value(&details).unwrap()["date"], "2025-07-01");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let mut value = booking_json(json!("p1"), json!("g1"));
        value["status"]["status"] = json!("archived");
        assert!(serde_json::from_value::<Booking>(value).is_err());
        assert_eq!("rejected".parse::<BookingStatus>(), Ok(BookingStatus::Rejected));
    }

    #[test]
    fn test_confirmation_deadline() {
        let booking: Booking = serde_json::from_value(booking_json(json!("p1"), json!("g1"))).unwrap();
        let deadline = booking.confirmation_deadline().unwrap();
        assert_eq!(deadline.to_rfc3339(), "2025-03-02T10:00:00+00:00");
        assert!(!booking.is_confirmation_overdue(deadline));
        assert!(booking.is_confirmation_overdue(deadline + Duration::minutes(1)));
    }

    #[test]
    fn test_refunded_amount_only_counts_processed_refunds() {
        let mut financial = Financial {
            total_amount: 100.0,
            currency: "USD".to_string(),
            is_paid: true,
            payment_id: None,
            payment_method: None,
            paid_at: None,
            refund: Refund {
                is_refunded: true,
                refund_amount: Some(40.0),
                refund_status: Some(RefundStatus::Pending),
                ..Default::default()
            },
        };
        assert_eq!(financial.refunded_amount(), 0.0);
        financial.refund.refund_status = Some(RefundStatus::Processed);
        assert_eq!(financial.refunded_amount(), 40.0);
    }
}
