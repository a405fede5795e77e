//! Booking profile and window records plus the read-only view the
//! scheduler consumes.

use serde::Serialize;

use crate::library::seat::SeatId;

/// One student's saved booking setup.
///
/// The seat id is resolved from the label when the profile is saved, so
/// the time-critical booking path never touches the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct BookingProfile {
    pub student_id: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub seat_label: String,
    pub seat_id: Option<SeatId>,
    pub auto_enabled: bool,
    pub updated_at: String,
}

/// One recurring reservation slot for a profile.
///
/// Times are wall-clock strings: `start_time`/`end_time` are `HH:mm`
/// bounds of the slot itself, `auto_start_time` is the `HH:mm` instant
/// the portal opens that slot for booking.
#[derive(Debug, Clone, Serialize)]
pub struct BookingWindow {
    pub id: i64,
    pub student_id: String,
    pub start_time: String,
    pub end_time: String,
    pub auto_start_time: String,
    pub active: bool,
    pub created_at: String,
}

/// Read-only store view used by the scheduler tick.
pub trait ProfileStore: Send + Sync {
    /// Profiles with automatic booking switched on.
    fn auto_enabled_profiles(&self) -> anyhow::Result<Vec<BookingProfile>>;

    /// Active windows belonging to one student.
    fn active_windows(&self, student_id: &str) -> anyhow::Result<Vec<BookingWindow>>;

    /// Single profile lookup; `Ok(None)` when the student has none.
    fn profile(&self, student_id: &str) -> anyhow::Result<Option<BookingProfile>>;
}
