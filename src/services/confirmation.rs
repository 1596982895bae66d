use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ValidationError,
    models::booking::{Booking, BookingStatus, GuiderConfirmation},
};

use super::lifecycle::{ensure_allowed, Actor, BookingAction};

/// A cancellation reason that is known to be non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationReason(String);

impl CancellationReason {
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        match raw.map(str::trim) {
            Some(reason) if !reason.is_empty() => Ok(CancellationReason(reason.to_string())),
            _ => Err(ValidationError::MissingCancellationReason),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Decision form as posted by the guider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionInput {
    pub decision: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuiderDecision {
    Confirm { message: Option<String> },
    Cancel { reason: CancellationReason },
}

impl GuiderDecision {
    pub fn parse(input: &DecisionInput) -> Result<Self, ValidationError> {
        match input.decision.trim() {
            "confirmed" => Ok(GuiderDecision::Confirm {
                message: input
                    .message
                    .as_deref()
                    .map(str::trim)
                    .filter(|message| !message.is_empty())
                    .map(str::to_string),
            }),
            "cancelled" => Ok(GuiderDecision::Cancel {
                reason: CancellationReason::parse(input.cancellation_reason.as_deref())?,
            }),
            other => Err(ValidationError::UnknownDecision(other.to_string())),
        }
    }

    pub fn action(&self) -> BookingAction {
        match self {
            GuiderDecision::Confirm { .. } => BookingAction::Confirm,
            GuiderDecision::Cancel { .. } => BookingAction::Cancel,
        }
    }

    pub fn into_request(self) -> ConfirmBookingRequest {
        match self {
            GuiderDecision::Confirm { message } => ConfirmBookingRequest {
                decision: GuiderConfirmation::Confirmed,
                message,
                cancellation_reason: None,
            },
            GuiderDecision::Cancel { reason } => ConfirmBookingRequest {
                decision: GuiderConfirmation::Cancelled,
                message: None,
                cancellation_reason: Some(reason.into_inner()),
            },
        }
    }
}

/// Body of `PATCH /bookings/:id/confirm`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBookingRequest {
    pub decision: GuiderConfirmation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

/// Body of `PATCH /bookings/:id/cancel`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingRequest {
    pub cancellation_reason: String,
}

/// Validates a guider decision against the booking as last fetched and
/// produces the request to dispatch.
pub fn prepare_decision(
    booking: &Booking,
    input: &DecisionInput,
) -> Result<ConfirmBookingRequest, ValidationError> {
    let decision = GuiderDecision::parse(input)?;
    ensure_allowed(booking, Actor::Guider, decision.action())?;
    Ok(decision.into_request())
}

/// Validates a traveler cancellation.
pub fn prepare_cancellation(
    booking: &Booking,
    reason: Option<&str>,
) -> Result<CancelBookingRequest, ValidationError> {
    let reason = CancellationReason::parse(reason)?;
    ensure_allowed(booking, Actor::Traveler, BookingAction::Cancel)?;
    Ok(CancelBookingRequest {
        cancellation_reason: reason.into_inner(),
    })
}

/// Whether the booking still waits for the guider to decide.
pub fn is_awaiting_decision(booking: &Booking) -> bool {
    booking.current_status() == BookingStatus::Pending
        && booking.status.guider_confirmation == GuiderConfirmation::Pending
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConfirmation {
    pub booking: Booking,
    pub confirmation_deadline: Option<DateTime<Utc>>,
    pub overdue: bool,
}

/// Pending list for the guider's awaiting-action alert. Anything already
/// decided is dropped even if the backend still lists it, and the soonest
/// deadline comes first.
pub fn pending_confirmations(bookings: Vec<Booking>, now: DateTime<Utc>) -> Vec<PendingConfirmation> {
    let mut pending: Vec<PendingConfirmation> = bookings
        .into_iter()
        .filter(is_awaiting_decision)
        .map(|booking| PendingConfirmation {
            confirmation_deadline: booking.confirmation_deadline(),
            overdue: booking.is_confirmation_overdue(now),
            booking,
        })
        .collect();

    // no deadline sorts last
    pending.sort_by_key(|item| (item.confirmation_deadline.is_none(), item.confirmation_deadline));
    pending
}
