use serde::{Deserialize, Serialize};

/// Pre-aggregated figures from `GET /bookings/guider/stats`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStats {
    pub total_bookings: u64,
    pub confirmed_bookings: u64,
    pub pending_bookings: u64,
    pub cancelled_bookings: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_bookings: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_bookings: Option<u64>,
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub total_reviews: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatsSource {
    StatsEndpoint,
    Bookings,
}

/// What the dashboard shows. `rejected_bookings` is always zero when rejected
/// bookings are folded into the cancelled bucket.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_bookings: u64,
    pub pending_bookings: u64,
    pub confirmed_bookings: u64,
    pub cancelled_bookings: u64,
    pub completed_bookings: u64,
    pub rejected_bookings: u64,
    pub total_revenue: f64,
    pub average_rating: Option<f64>,
    pub total_reviews: Option<u64>,
}

impl DashboardStats {
    pub fn bucket_sum(&self) -> u64 {
        self.pending_bookings
            + self.confirmed_bookings
            + self.cancelled_bookings
            + self.completed_bookings
            + self.rejected_bookings
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub stats: DashboardStats,
    pub awaiting_confirmation: usize,
    pub source: StatsSource,
}
