//! Session plumbing: per-user transport contexts and cookie helpers.

pub mod cookies;
pub mod transport;
