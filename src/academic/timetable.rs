//! Timetable query and week-expression parsing.
//!
//! The mobile endpoint returns one record per course meeting with a week
//! expression like `1-13周,15周(单)` and a period span like `7-8`. Entries
//! that fail to parse are skipped individually so one malformed record does
//! not lose the whole timetable.

use crate::config::PortalConfig;
use crate::error::{Error, Result};
use crate::session::cookies::render_cookie_header;
use crate::session::transport::TransportFactory;
use reqwest::header::COOKIE;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::academic::grades::field_str;

/// One course meeting on the weekly grid.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TimetableEntry {
    pub course: String,
    pub teacher: String,
    pub location: String,
    /// Day of week, 1 = Monday through 7 = Sunday.
    pub day: u32,
    /// First class period of the meeting.
    pub start_period: u32,
    /// Last class period of the meeting.
    pub end_period: u32,
    /// Weeks the meeting occurs in, expanded from the week expression.
    pub weeks: Vec<u32>,
    /// The unexpanded upstream week expression, kept for display.
    pub raw_weeks: String,
}

impl TimetableEntry {
    /// Whether this meeting occurs in the given week.
    pub fn occurs_in_week(&self, week: u32) -> bool {
        self.weeks.contains(&week)
    }
}

/// Fetches and parses the weekly timetable.
pub struct TimetableClient {
    config: PortalConfig,
    transport: TransportFactory,
}

impl TimetableClient {
    pub fn new(config: PortalConfig, transport: TransportFactory) -> Self {
        Self { config, transport }
    }

    /// Query the full-term timetable for one student.
    pub async fn fetch_timetable(
        &self,
        cookies: &HashMap<String, String>,
        year: &str,
        term: &str,
        account: &str,
    ) -> Result<Vec<TimetableEntry>> {
        let client = self.transport.bare_client()?;
        let form = [
            ("xnm", year),
            ("xqm", term),
            ("zs", ""),
            ("kblx", "1"),
            ("doType", "app"),
            ("xh", account),
        ];

        let resp = client
            .post(self.config.timetable_url())
            .form(&form)
            .header(COOKIE, render_cookie_header(cookies))
            .timeout(self.config.read_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                message: format!("timetable query returned status {status}"),
                raw: String::new(),
            });
        }

        let body = resp.text().await?;
        // A signed-out session gets the HTML login page instead of JSON.
        if body.trim_start().starts_with('<') {
            return Err(Error::SessionExpired);
        }

        let entries = parse_timetable(&body)?;
        debug!(entries = entries.len(), "timetable parsed");
        Ok(entries)
    }
}

/// Parse the timetable payload's `kbList` array.
pub fn parse_timetable(body: &str) -> Result<Vec<TimetableEntry>> {
    let root: Value = serde_json::from_str(body)?;
    let mut entries = Vec::new();

    let Some(kb_list) = root.get("kbList").and_then(Value::as_array) else {
        return Ok(entries);
    };

    for item in kb_list {
        match parse_entry(item) {
            Some(entry) => entries.push(entry),
            None => warn!(course = %field_str(item, "kcmc"), "skipping malformed timetable entry"),
        }
    }

    Ok(entries)
}

/// Parse one `kbList` record; `None` when any required field is malformed.
fn parse_entry(item: &Value) -> Option<TimetableEntry> {
    let raw_weeks = field_str(item, "zcd");
    let weeks = parse_week_expr(&raw_weeks)?;
    let (start_period, end_period) = parse_periods(&field_str(item, "jcs"))?;
    let day: u32 = field_str(item, "xqj").parse().ok()?;

    Some(TimetableEntry {
        course: field_str(item, "kcmc"),
        teacher: field_str(item, "xm"),
        location: field_str(item, "cdmc"),
        day,
        start_period,
        end_period,
        weeks,
        raw_weeks,
    })
}

/// Expand a week expression like `1-13周,15周(单)` into week numbers.
///
/// `(单)` (odd) and `(双)` (even) markers turn a range into a stride of two
/// starting from the range's first week. An empty expression expands to no
/// weeks; a malformed number anywhere rejects the whole expression.
pub fn parse_week_expr(expr: &str) -> Option<Vec<u32>> {
    let mut weeks = Vec::new();
    if expr.is_empty() {
        return Some(weeks);
    }

    let clean = expr.replace('周', "");
    for raw_part in clean.split(',') {
        let mut step = 1u32;
        let mut part = raw_part.trim().to_string();
        if part.contains("(单)") {
            step = 2;
            part = part.replace("(单)", "");
        } else if part.contains("(双)") {
            step = 2;
            part = part.replace("(双)", "");
        }

        if let Some((a, b)) = part.split_once('-') {
            let start: u32 = a.trim().parse().ok()?;
            let end: u32 = b.trim().parse().ok()?;
            let mut w = start;
            while w <= end {
                weeks.push(w);
                w += step;
            }
        } else {
            weeks.push(part.trim().parse().ok()?);
        }
    }
    Some(weeks)
}

/// Parse a period span like `7-8`; a bare `5` means a single period.
pub fn parse_periods(expr: &str) -> Option<(u32, u32)> {
    if let Some((a, b)) = expr.split_once('-') {
        let start: u32 = a.trim().parse().ok()?;
        let end: u32 = b.trim().parse().ok()?;
        Some((start, end))
    } else {
        let single: u32 = expr.trim().parse().ok()?;
        Some((single, single))
    }
}

/// Chinese weekday name for 1..=7, empty string otherwise.
pub fn day_name(day: u32) -> &'static str {
    match day {
        1 => "星期一",
        2 => "星期二",
        3 => "星期三",
        4 => "星期四",
        5 => "星期五",
        6 => "星期六",
        7 => "星期日",
        _ => "",
    }
}
