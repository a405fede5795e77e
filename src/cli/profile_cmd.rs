//! `campanile profile <set|show|remove|auto>` -- manage saved booking
//! profiles. Seat labels are resolved to catalog ids at save time so the
//! scheduler's firing path never waits on the catalog.

use crate::cli::output::{self, Styled};
use crate::config::PortalConfig;
use crate::library::catalog::SeatCatalogResolver;
use crate::session::transport::TransportFactory;
use crate::store::{ProfileStore, SqliteStore};
use anyhow::{bail, Result};

/// Parse an on/off argument.
pub fn parse_state(state: &str) -> Result<bool> {
    match state {
        "on" => Ok(true),
        "off" => Ok(false),
        other => bail!("state must be 'on' or 'off', got '{other}'"),
    }
}

/// Save (or replace) a profile, resolving the seat label live.
pub async fn set(student_id: &str, seat_label: &str, password: Option<String>) -> Result<()> {
    let s = Styled::new();
    let Some(password) = password.or_else(|| std::env::var("CAMPANILE_PASSWORD").ok()) else {
        bail!("profile set needs --password or CAMPANILE_PASSWORD");
    };

    let config = PortalConfig::from_env();
    let resolver = SeatCatalogResolver::new(config, TransportFactory::new());
    let seat_id = resolver.resolve(seat_label).await;

    let store = SqliteStore::open_default()?;
    store.upsert_profile(student_id, &password, seat_label, seat_id)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "student_id": student_id,
            "seat_label": seat_label,
            "seat_id": seat_id,
        }));
        return Ok(());
    }

    match seat_id {
        Some(id) => {
            if !output::is_quiet() {
                eprintln!(
                    "  {} Profile saved: {} -> seat id {}",
                    s.ok_sym(),
                    s.bold(seat_label),
                    s.cyan(&id.to_string())
                );
            }
        }
        None => {
            eprintln!(
                "  {} Profile saved, but '{seat_label}' did not resolve to a seat id.",
                s.warn_sym()
            );
            eprintln!(
                "  {}",
                s.dim("Automatic booking skips this profile until 'profile set' resolves it.")
            );
        }
    }
    Ok(())
}

/// Show one profile. The password is never printed.
pub async fn show(student_id: &str) -> Result<()> {
    let s = Styled::new();
    let store = SqliteStore::open_default()?;
    let Some(profile) = store.profile(student_id)? else {
        bail!("no saved profile for {student_id}");
    };

    if output::is_json() {
        output::print_json(&serde_json::json!(profile));
        return Ok(());
    }

    eprintln!("  {}", s.bold(&profile.student_id));
    output::print_check(s.ok_sym(), "seat label", &profile.seat_label);
    match profile.seat_id {
        Some(id) => output::print_check(s.ok_sym(), "seat id", &id.to_string()),
        None => output::print_check(s.warn_sym(), "seat id", "unresolved"),
    }
    let auto = if profile.auto_enabled {
        (s.ok_sym(), "on")
    } else {
        (s.info_sym(), "off")
    };
    output::print_check(auto.0, "auto booking", auto.1);
    output::print_check(s.ok_sym(), "updated", &s.dim(&profile.updated_at));
    Ok(())
}

/// Remove a profile and its windows.
pub async fn remove(student_id: &str) -> Result<()> {
    let s = Styled::new();
    let store = SqliteStore::open_default()?;
    let removed = store.remove_profile(student_id)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "student_id": student_id,
            "removed": removed,
        }));
        return Ok(());
    }

    if removed {
        if !output::is_quiet() {
            eprintln!("  {} Profile for {student_id} removed.", s.ok_sym());
        }
    } else {
        eprintln!("  {} No saved profile for {student_id}.", s.warn_sym());
    }
    Ok(())
}

/// Toggle automatic booking for a profile.
pub async fn auto(student_id: &str, state: &str) -> Result<()> {
    let s = Styled::new();
    let enabled = parse_state(state)?;
    let store = SqliteStore::open_default()?;
    if !store.set_auto_enabled(student_id, enabled)? {
        bail!("no saved profile for {student_id}");
    }

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "student_id": student_id,
            "auto_enabled": enabled,
        }));
        return Ok(());
    }

    if !output::is_quiet() {
        let verb = if enabled { "enabled" } else { "disabled" };
        eprintln!("  {} Automatic booking {verb} for {student_id}.", s.ok_sym());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert!(parse_state("on").unwrap());
        assert!(!parse_state("off").unwrap());
        assert!(parse_state("yes").is_err());
        assert!(parse_state("").is_err());
    }
}
