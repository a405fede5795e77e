//! Academic system clients: grade and timetable queries over a harvested session.

pub mod grades;
pub mod timetable;
