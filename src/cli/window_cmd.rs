//! `campanile window <add|list|remove|toggle>` -- manage the recurring
//! reservation windows the scheduler fires on.

use crate::cli::output::{self, Styled};
use crate::cli::profile_cmd::parse_state;
use crate::store::{ProfileStore, SqliteStore};
use anyhow::{bail, Result};
use chrono::NaiveTime;

/// Reject anything that is not a wall-clock `HH:mm`.
fn check_time(what: &str, value: &str) -> Result<()> {
    if NaiveTime::parse_from_str(value, "%H:%M").is_err() {
        bail!("{what} must be HH:mm, got '{value}'");
    }
    Ok(())
}

/// Add a window for a student.
pub async fn add(student_id: &str, start: &str, end: &str, open: &str) -> Result<()> {
    let s = Styled::new();
    check_time("--start", start)?;
    check_time("--end", end)?;
    check_time("--open", open)?;

    let store = SqliteStore::open_default()?;
    if store.profile(student_id)?.is_none() {
        bail!("no saved profile for {student_id}: save one before adding windows");
    }
    let id = store.add_window(student_id, start, end, open)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "id": id,
            "student_id": student_id,
            "start_time": start,
            "end_time": end,
            "auto_start_time": open,
        }));
        return Ok(());
    }

    if !output::is_quiet() {
        eprintln!(
            "  {} Window {} added: {start}-{end}, released at {open}",
            s.ok_sym(),
            s.cyan(&id.to_string())
        );
    }
    Ok(())
}

/// List every window for a student.
pub async fn list(student_id: &str) -> Result<()> {
    let s = Styled::new();
    let store = SqliteStore::open_default()?;
    let windows = store.windows(student_id)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "student_id": student_id,
            "windows": windows,
        }));
        return Ok(());
    }

    if windows.is_empty() {
        eprintln!("  {} No windows for {student_id}.", s.warn_sym());
        return Ok(());
    }

    eprintln!(
        "  {}",
        s.bold(&format!(
            "{:>4}  {:<13} {:<9} {:<7}",
            "id", "slot", "release", "state"
        ))
    );
    for w in &windows {
        let (sym, state) = if w.active {
            (s.ok_sym(), "active")
        } else {
            (s.info_sym(), "paused")
        };
        eprintln!(
            "  {:>4}  {:<13} {:<9} {sym} {state}",
            w.id,
            format!("{}-{}", w.start_time, w.end_time),
            w.auto_start_time,
        );
    }
    Ok(())
}

/// Remove one window by id.
pub async fn remove(id: i64) -> Result<()> {
    let s = Styled::new();
    let store = SqliteStore::open_default()?;
    let removed = store.remove_window(id)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({ "id": id, "removed": removed }));
        return Ok(());
    }

    if removed {
        if !output::is_quiet() {
            eprintln!("  {} Window {id} removed.", s.ok_sym());
        }
    } else {
        eprintln!("  {} No window with id {id}.", s.warn_sym());
    }
    Ok(())
}

/// Activate or pause one window by id.
pub async fn toggle(id: i64, state: &str) -> Result<()> {
    let s = Styled::new();
    let active = parse_state(state)?;
    let store = SqliteStore::open_default()?;
    if !store.set_window_active(id, active)? {
        bail!("no window with id {id}");
    }

    if output::is_json() {
        output::print_json(&serde_json::json!({ "id": id, "active": active }));
        return Ok(());
    }

    if !output::is_quiet() {
        let verb = if active { "activated" } else { "paused" };
        eprintln!("  {} Window {id} {verb}.", s.ok_sym());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_time_accepts_wall_clock_only() {
        assert!(check_time("--start", "08:00").is_ok());
        assert!(check_time("--start", "23:59").is_ok());
        assert!(check_time("--start", "8 am").is_err());
        assert!(check_time("--start", "25:00").is_err());
        assert!(check_time("--start", "").is_err());
    }
}
