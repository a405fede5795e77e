//! Library booking portal: seat labels, catalog resolution, reservations, and
//! the autonomous scheduler.

pub mod booking;
pub mod catalog;
pub mod scheduler;
pub mod seat;
