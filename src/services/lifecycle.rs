use serde::Serialize;

use crate::{
    error::ValidationError,
    models::booking::{Booking, BookingStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Traveler,
    Guider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Cancel,
    Confirm,
    Review,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Cancel => "cancel",
            BookingAction::Confirm => "confirm",
            BookingAction::Review => "review",
        }
    }
}

/// Actions `actor` may take on a booking in `status`.
///
/// | status    | traveler | guider          |
/// |-----------|----------|-----------------|
/// | pending   | cancel   | confirm, cancel |
/// | confirmed | cancel   |                 |
/// | completed | review   |                 |
/// | cancelled |          |                 |
/// | rejected  |          |                 |
pub fn allowed_actions(status: BookingStatus, actor: Actor) -> &'static [BookingAction] {
    match (status, actor) {
        (BookingStatus::Pending, Actor::Traveler) => &[BookingAction::Cancel],
        (BookingStatus::Pending, Actor::Guider) => &[BookingAction::Confirm, BookingAction::Cancel],
        (BookingStatus::Confirmed, Actor::Traveler) => &[BookingAction::Cancel],
        (BookingStatus::Completed, Actor::Traveler) => &[BookingAction::Review],
        _ => &[],
    }
}

pub fn is_allowed(status: BookingStatus, actor: Actor, action: BookingAction) -> bool {
    allowed_actions(status, actor).contains(&action)
}

/// Refuses `action` before any request is built for it.
pub fn ensure_allowed(
    booking: &Booking,
    actor: Actor,
    action: BookingAction,
) -> Result<(), ValidationError> {
    let status = booking.current_status();
    if is_allowed(status, actor, action) {
        Ok(())
    } else {
        Err(ValidationError::ActionNotAllowed {
            action: action.as_str(),
            status,
        })
    }
}

/// A booking together with what the current viewer may do with it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub booking: Booking,
    pub actions: Vec<BookingAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guider_name: Option<String>,
}

impl BookingView {
    pub fn new(booking: Booking, actor: Actor) -> Self {
        let actions = allowed_actions(booking.current_status(), actor).to_vec();
        let plan_title = booking.plan_title().map(str::to_string);
        let guider_name = booking.guider_name();
        Self {
            booking,
            actions,
            plan_title,
            guider_name,
        }
    }
}
