pub mod api;
pub mod booking;
pub mod notification;
pub mod review;
pub mod stats;
