//! CLI subcommand implementations for the campanile binary.

pub mod book_cmd;
pub mod grades_cmd;
pub mod login_cmd;
pub mod output;
pub mod profile_cmd;
pub mod seat_cmd;
pub mod timetable_cmd;
pub mod watch_cmd;
pub mod window_cmd;
