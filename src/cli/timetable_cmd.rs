//! `campanile timetable <student-id>` -- query the weekly course grid.

use crate::academic::timetable::{day_name, TimetableClient, TimetableEntry};
use crate::cli::login_cmd::{establish_session, resolve_password};
use crate::cli::output::{self, Styled};
use crate::config::PortalConfig;
use crate::session::transport::TransportFactory;
use anyhow::{Context, Result};

/// Run the timetable command, optionally filtered to one week.
pub async fn run(
    student_id: &str,
    password: Option<String>,
    year: &str,
    term: &str,
    week: Option<u32>,
) -> Result<()> {
    let s = Styled::new();
    let password = resolve_password(password, student_id)?;
    let config = PortalConfig::from_env();

    let cookies = establish_session(&config, student_id, &password).await?;
    let client = TimetableClient::new(config, TransportFactory::new());
    let mut entries = client
        .fetch_timetable(&cookies, year, term, student_id)
        .await
        .context("timetable query failed")?;

    if let Some(week) = week {
        entries.retain(|e| e.occurs_in_week(week));
    }
    entries.sort_by_key(|e| (e.day, e.start_period));

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "student_id": student_id,
            "week": week,
            "entries": entries,
        }));
        return Ok(());
    }

    if output::is_quiet() {
        return Ok(());
    }

    if entries.is_empty() {
        eprintln!("  {} No timetable entries for that query.", s.warn_sym());
        return Ok(());
    }

    let mut current_day = 0;
    for entry in &entries {
        if entry.day != current_day {
            current_day = entry.day;
            eprintln!();
            eprintln!("  {}", s.bold(day_name(entry.day)));
        }
        eprintln!("    {}", format_entry(&s, entry));
    }
    eprintln!();
    eprintln!("  {} {} meetings", s.ok_sym(), entries.len());
    Ok(())
}

fn format_entry(s: &Styled, entry: &TimetableEntry) -> String {
    let periods = if entry.start_period == entry.end_period {
        format!("第{}节", entry.start_period)
    } else {
        format!("第{}-{}节", entry.start_period, entry.end_period)
    };
    format!(
        "{periods:<10} {:<20} {:<12} {:<10} {}",
        entry.course,
        entry.location,
        entry.teacher,
        s.dim(&entry.raw_weeks)
    )
}
