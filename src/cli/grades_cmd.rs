//! `campanile grades <student-id>` -- query grade records through a fresh
//! signed-on session.

use crate::academic::grades::{GradeClient, GradeRow};
use crate::cli::login_cmd::{establish_session, resolve_password};
use crate::cli::output::{self, Styled};
use crate::config::PortalConfig;
use crate::session::transport::TransportFactory;
use anyhow::{Context, Result};

/// Run the grades command. Empty year/term query every record; the term
/// code is the portal's own (`3` = autumn, `12` = spring).
pub async fn run(student_id: &str, password: Option<String>, year: &str, term: &str) -> Result<()> {
    let s = Styled::new();
    let password = resolve_password(password, student_id)?;
    let config = PortalConfig::from_env();

    let cookies = establish_session(&config, student_id, &password).await?;
    let client = GradeClient::new(config, TransportFactory::new());
    let rows = client
        .fetch_grades(&cookies, year, term)
        .await
        .context("grade query failed")?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "student_id": student_id,
            "rows": rows,
        }));
        return Ok(());
    }

    if output::is_quiet() {
        return Ok(());
    }

    if rows.is_empty() {
        eprintln!("  {} No grade records for that query.", s.warn_sym());
        return Ok(());
    }

    eprintln!(
        "  {}",
        s.bold(&format!(
            "{:<10} {:<4} {:<24} {:>6} {:>6} {:>6}",
            "Year", "Term", "Course", "Credit", "Grade", "Point"
        ))
    );
    for row in &rows {
        eprintln!(
            "  {:<10} {:<4} {:<24} {:>6} {:>6} {:>6}",
            row.year,
            row.term,
            row.course,
            fmt_opt(row.credit),
            fmt_opt(row.grade),
            fmt_opt(row.point),
        );
    }
    eprintln!();
    eprintln!("  {} {} records", s.ok_sym(), rows.len());
    print_summary(&s, &rows);
    Ok(())
}

/// Weighted grade-point average over rows that carry both credit and point.
fn print_summary(s: &Styled, rows: &[GradeRow]) {
    let mut credits = 0.0;
    let mut weighted = 0.0;
    for row in rows {
        if let (Some(credit), Some(point)) = (row.credit, row.point) {
            credits += credit;
            weighted += credit * point;
        }
    }
    if credits > 0.0 {
        eprintln!(
            "  {} GPA {:.2} over {credits} credits",
            s.ok_sym(),
            weighted / credits
        );
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}"),
        None => "--".to_string(),
    }
}
