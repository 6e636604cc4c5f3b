//! Booking lifecycle: statuses, transitions, filters, and the views derived
//! from them (tab counts, room groups, waiting times).

pub mod booking;
pub mod clock;
pub mod counts;
pub mod events;
pub mod filter;
pub mod lifecycle;
pub mod rooms;
pub mod status;

pub use lifecycle::QueueService;
