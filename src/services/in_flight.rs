use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::error::AppError;

/// Booking ids with a mutation currently on its way to the backend.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    bookings: Arc<Mutex<HashSet<String>>>,
}

/// Releases the booking when dropped, whether the request succeeded or not.
#[derive(Debug)]
pub struct InFlightGuard {
    bookings: Arc<Mutex<HashSet<String>>>,
    booking_id: String,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, booking_id: &str) -> Result<InFlightGuard, AppError> {
        let mut bookings = lock(&self.bookings);
        if !bookings.insert(booking_id.to_string()) {
            log::warn!("Duplicate submission for booking {} refused", booking_id);
            return Err(AppError::InFlight);
        }
        Ok(InFlightGuard {
            bookings: Arc::clone(&self.bookings),
            booking_id: booking_id.to_string(),
        })
    }

    pub fn is_in_flight(&self, booking_id: &str) -> bool {
        lock(&self.bookings).contains(booking_id)
    }
}

// a panic elsewhere must not leave a booking locked forever
fn lock(bookings: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    bookings
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.bookings).remove(&self.booking_id);
    }
}
