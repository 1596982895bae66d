use crate::{
    config::RejectedBucket,
    models::{
        booking::{Booking, BookingStatus},
        stats::{BookingStats, DashboardStats},
    },
};

/// Dashboard figures from the backend's pre-aggregated stats. Completed is
/// not part of that contract, so it is whatever the other buckets leave.
pub fn from_stats(stats: &BookingStats, rejected_bucket: RejectedBucket) -> DashboardStats {
    let rejected = stats.rejected_bookings.unwrap_or(0);
    let completed = stats.completed_bookings.unwrap_or_else(|| {
        stats
            .total_bookings
            .saturating_sub(stats.pending_bookings)
            .saturating_sub(stats.confirmed_bookings)
            .saturating_sub(stats.cancelled_bookings)
            .saturating_sub(rejected)
    });

    let (cancelled, rejected) = fold_rejected(stats.cancelled_bookings, rejected, rejected_bucket);

    DashboardStats {
        total_bookings: stats.total_bookings,
        pending_bookings: stats.pending_bookings,
        confirmed_bookings: stats.confirmed_bookings,
        cancelled_bookings: cancelled,
        completed_bookings: completed,
        rejected_bookings: rejected,
        total_revenue: stats.total_revenue,
        average_rating: stats.average_rating,
        total_reviews: stats.total_reviews,
    }
}

/// Fallback when the stats endpoint is unavailable: count the bookings by
/// status. Ratings live on the standalone reviews and are left empty here.
pub fn from_bookings(bookings: &[Booking], rejected_bucket: RejectedBucket) -> DashboardStats {
    let count = |status: BookingStatus| {
        bookings
            .iter()
            .filter(|booking| booking.current_status() == status)
            .count() as u64
    };

    let (cancelled, rejected) = fold_rejected(
        count(BookingStatus::Cancelled),
        count(BookingStatus::Rejected),
        rejected_bucket,
    );

    DashboardStats {
        total_bookings: bookings.len() as u64,
        pending_bookings: count(BookingStatus::Pending),
        confirmed_bookings: count(BookingStatus::Confirmed),
        cancelled_bookings: cancelled,
        completed_bookings: count(BookingStatus::Completed),
        rejected_bookings: rejected,
        total_revenue: revenue(bookings),
        average_rating: None,
        total_reviews: None,
    }
}

/// Paid amounts on bookings that still stand, less processed refunds.
pub fn revenue(bookings: &[Booking]) -> f64 {
    bookings
        .iter()
        .filter(|booking| booking.financial.is_paid)
        .filter(|booking| {
            !matches!(
                booking.current_status(),
                BookingStatus::Cancelled | BookingStatus::Rejected
            )
        })
        .map(|booking| booking.financial.total_amount - booking.financial.refunded_amount())
        .sum()
}

fn fold_rejected(cancelled: u64, rejected: u64, bucket: RejectedBucket) -> (u64, u64) {
    match bucket {
        RejectedBucket::Separate => (cancelled, rejected),
        RejectedBucket::Cancelled => (cancelled + rejected, 0),
    }
}
