//! Grade query against the academic system.
//!
//! Uses the cookies harvested by the entry crawl (`JSESSIONID` plus the
//! sticky `route`). The endpoint serves JSON to a signed-in session and an
//! HTML login page otherwise, so an HTML-looking body is classified as an
//! expired session rather than a parse failure.

use crate::config::PortalConfig;
use crate::error::{Error, Result};
use crate::session::cookies::render_cookie_header;
use crate::session::transport::TransportFactory;
use reqwest::header::{COOKIE, REFERER};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// One parsed grade record.
///
/// Upstream marks absent numerics as `"--"` or `"null"`; those become `None`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GradeRow {
    /// Academic year label, e.g. `2024-2025`.
    pub year: String,
    /// Term label within the year.
    pub term: String,
    pub course: String,
    pub credit: Option<f64>,
    pub grade: Option<f64>,
    pub point: Option<f64>,
    /// Credit-weighted grade point.
    pub credit_point: Option<f64>,
}

/// Fetches and parses grade records.
pub struct GradeClient {
    config: PortalConfig,
    transport: TransportFactory,
}

impl GradeClient {
    pub fn new(config: PortalConfig, transport: TransportFactory) -> Self {
        Self { config, transport }
    }

    /// Query grades for the given year/term (empty strings query everything).
    pub async fn fetch_grades(
        &self,
        cookies: &HashMap<String, String>,
        year: &str,
        term: &str,
    ) -> Result<Vec<GradeRow>> {
        let client = self.transport.bare_client()?;
        let nd = chrono::Utc::now().timestamp_millis().to_string();
        let form = [
            ("xnm", year),
            ("xqm", term),
            ("sfzgcj", ""),
            ("_search", "false"),
            ("nd", nd.as_str()),
            ("queryModel.showCount", "100"),
            ("queryModel.currentPage", "1"),
            ("queryModel.sortOrder", "asc"),
            ("time", "2"),
        ];

        let resp = client
            .post(self.config.grade_query_url())
            .form(&form)
            .header(COOKIE, render_cookie_header(cookies))
            .header(
                REFERER,
                format!("{}/jwglxt/cjcx/cjcx_cxDgXscj.html", self.config.academic_base),
            )
            .timeout(self.config.read_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                message: format!("grade query returned status {status}"),
                raw: String::new(),
            });
        }

        let body = resp.text().await?;
        // A signed-out session gets the HTML login page instead of JSON.
        if body.trim_start().starts_with('<') {
            return Err(Error::SessionExpired);
        }

        let rows = parse_grades(&body)?;
        debug!(rows = rows.len(), "grade query parsed");
        Ok(rows)
    }
}

/// Parse the grade payload's `items` array into rows.
pub fn parse_grades(body: &str) -> Result<Vec<GradeRow>> {
    let root: Value = serde_json::from_str(body)?;
    let mut rows = Vec::new();

    let Some(items) = root.get("items").and_then(Value::as_array) else {
        return Ok(rows);
    };

    for item in items {
        let grade = field_number(item, "cj");
        let point = field_number(item, "jd");
        let mut row = GradeRow {
            year: field_str(item, "xnmmc"),
            term: field_str(item, "xqmmc"),
            course: field_str(item, "kcmc"),
            credit: field_number(item, "xf"),
            grade,
            point,
            credit_point: field_number(item, "xfjd"),
        };
        // Pass/fail courses report only a grade point; derive the percentage
        // grade the same way the portal's own frontend does.
        if row.grade.is_none() {
            if let Some(p) = row.point {
                row.grade = Some(p * 10.0 + 40.0);
            }
        }
        rows.push(row);
    }

    Ok(rows)
}

/// String field lookup tolerating numeric values; missing or null becomes `""`.
pub(crate) fn field_str(obj: &Value, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Numeric field lookup: tolerates string-wrapped numbers, maps the
/// upstream's `"--"`/`"null"` placeholders to `None`, and rounds half-up to
/// two decimals.
pub(crate) fn field_number(obj: &Value, key: &str) -> Option<f64> {
    let raw = match obj.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return None,
    };
    if raw.is_empty() || raw == "null" || raw == "--" {
        return None;
    }
    let parsed: f64 = raw.parse().ok()?;
    Some((parsed * 100.0).round() / 100.0)
}
