//! Profile and time-window store backing the scheduler and the CLI.

pub mod profile;
pub mod sqlite;

pub use profile::{BookingProfile, BookingWindow, ProfileStore};
pub use sqlite::SqliteStore;
