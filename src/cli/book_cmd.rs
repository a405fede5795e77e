//! `campanile book <student-id>` -- one-shot reservation attempt, outside
//! the scheduler. Useful for checking credentials and seat ids by hand.

use crate::cli::login_cmd::resolve_password;
use crate::cli::output::{self, Styled};
use crate::config::PortalConfig;
use crate::library::booking::BookingClient;
use crate::library::catalog::SeatCatalogResolver;
use crate::library::seat::SeatId;
use crate::session::transport::TransportFactory;
use crate::store::{ProfileStore, SqliteStore};
use anyhow::{bail, Context, Result};
use chrono::Local;

/// Run the book command.
///
/// `start`/`end` accept either a bare `HH:mm` (completed to today) or a
/// full `yyyy-MM-dd HH:mm:ss` datetime. The seat comes from the saved
/// profile unless `--seat` overrides it with a label resolved live.
pub async fn run(
    student_id: &str,
    password: Option<String>,
    start: &str,
    end: &str,
    seat: Option<String>,
) -> Result<()> {
    let s = Styled::new();
    let password = resolve_password(password, student_id)?;
    let config = PortalConfig::from_env();
    let transport = TransportFactory::new();

    let seat_id = match seat {
        Some(label) => {
            let resolver = SeatCatalogResolver::new(config.clone(), transport.clone());
            match resolver.resolve(&label).await {
                Some(id) => id,
                None => bail!("seat '{label}' could not be resolved against the catalog"),
            }
        }
        None => stored_seat_id(student_id)?,
    };

    let today = Local::now().format("%Y-%m-%d").to_string();
    let start = complete_datetime(start, &today);
    let end = complete_datetime(end, &today);

    let client = BookingClient::new(config, transport);
    let auth = client
        .login(student_id, &password)
        .await
        .context("booking portal login failed")?;
    let outcome = client
        .attempt(seat_id, &start, &end, &auth)
        .await
        .context("booking request failed")?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "student_id": student_id,
            "seat_id": seat_id,
            "start": start,
            "end": end,
            "outcome": outcome,
        }));
        if !outcome.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    if outcome.success {
        if !output::is_quiet() {
            eprintln!(
                "  {} Seat {} booked {} to {}",
                s.ok_sym(),
                s.cyan(&seat_id.to_string()),
                start,
                end
            );
            eprintln!("  {}", s.dim(&outcome.message));
        }
        Ok(())
    } else {
        eprintln!("  {} Booking refused: {}", s.fail_sym(), outcome.message);
        if output::is_verbose() && !outcome.raw.is_empty() {
            eprintln!("  {}", s.dim(&outcome.raw));
        }
        std::process::exit(1);
    }
}

/// Seat id from the saved profile; errors spell out what is missing.
fn stored_seat_id(student_id: &str) -> Result<SeatId> {
    seat_from_profile(&SqliteStore::open_default()?, student_id)
}

fn seat_from_profile(store: &SqliteStore, student_id: &str) -> Result<SeatId> {
    let Some(profile) = store.profile(student_id)? else {
        bail!("no saved profile for {student_id}: pass --seat or save a profile first");
    };
    let Some(seat_id) = profile.seat_id else {
        bail!(
            "profile for {student_id} has no resolved seat id \
             (label {}): re-run profile set",
            profile.seat_label
        );
    };
    Ok(seat_id)
}

/// Complete a bare `HH:mm` into a full datetime on the given date; values
/// already carrying a space pass through untouched.
fn complete_datetime(raw: &str, date: &str) -> String {
    if raw.contains(' ') {
        raw.to_string()
    } else {
        format!("{date} {raw}:00")
    }
}
