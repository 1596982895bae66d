pub mod confirmation;
pub mod dashboard;
pub mod in_flight;
pub mod lifecycle;
pub mod review_eligibility;
