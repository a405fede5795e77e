//! Live seat-catalog lookup: seat label to numeric seat id.
//!
//! Catalog ids are not derivable offline; the same physical seat can carry a
//! different id after a catalog refresh, so every resolution queries the
//! region's live layout over a same-day window and bridges to the id through
//! the seat's display name. Resolution never fails hard: malformed labels,
//! unknown regions, exhausted retries, and no-match payloads all come back
//! as `None`.

use crate::config::{urlencode, PortalConfig};
use crate::library::seat::{SeatId, SeatLabel};
use crate::session::transport::TransportFactory;
use chrono::{DateTime, Local};
use reqwest::header::{ACCEPT, REFERER};
use serde_json::Value;
use tracing::{info, warn};

/// Resolves seat labels against the live catalog.
pub struct SeatCatalogResolver {
    config: PortalConfig,
    transport: TransportFactory,
}

impl SeatCatalogResolver {
    pub fn new(config: PortalConfig, transport: TransportFactory) -> Self {
        Self { config, transport }
    }

    /// Resolve a raw seat label to its catalog id.
    ///
    /// Returns `None` without any network traffic when the label fails the
    /// grammar or names an unknown region. Calling twice against the same
    /// catalog snapshot yields the same id.
    pub async fn resolve(&self, label: &str) -> Option<SeatId> {
        let seat = SeatLabel::parse(label)?;
        let Some(region) = seat.region_id() else {
            warn!(
                floor = %seat.floor,
                direction = %seat.direction,
                "no catalog region for this floor/direction"
            );
            return None;
        };

        let (start, end) = query_window(Local::now(), self.config.catalog_day_end_hour);
        self.lookup(region, &seat, &start, &end).await
    }

    /// Query the region layout and scan for the seat, re-attempting the
    /// request itself (transport failure, refused status, unreadable body)
    /// up to the configured ceiling. A cleanly parsed payload is final
    /// whether or not it contains a match.
    async fn lookup(
        &self,
        region: i64,
        seat: &SeatLabel,
        start: &str,
        end: &str,
    ) -> Option<SeatId> {
        let Ok(client) = self.transport.api_client() else {
            warn!("could not build catalog client");
            return None;
        };

        // Datetimes are pre-encoded with %20 spaces, as the portal's own
        // frontend sends them.
        let url = format!(
            "{}?pageNum=1&pageSize=500&regionid={region}&starttime={}&endtime={}",
            self.config.catalog_layout_url(),
            encode_window_param(start),
            encode_window_param(end),
        );

        for attempt in 1..=self.config.catalog_attempts {
            let sent = client
                .get(&url)
                .header(ACCEPT, "application/json, text/plain, */*")
                .header(REFERER, &self.config.library_base)
                .timeout(self.config.catalog_timeout)
                .send()
                .await;

            match sent {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(body) => match find_seat(&body, seat) {
                        Ok(found) => return found,
                        Err(err) => {
                            warn!(attempt, error = %err, "catalog payload unreadable")
                        }
                    },
                    Err(err) => warn!(attempt, error = %err, "catalog body read failed"),
                },
                Ok(resp) => {
                    warn!(attempt, status = %resp.status(), "catalog query refused")
                }
                Err(err) => warn!(attempt, error = %err, "catalog query transport failure"),
            }
        }

        warn!(region, "catalog lookup exhausted its attempts");
        None
    }
}

/// Same-day query window: now through today at the closing hour, formatted
/// as the portal's `yyyy-MM-dd HH:mm:ss`.
pub fn query_window(now: DateTime<Local>, end_hour: u32) -> (String, String) {
    let start = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let end = now
        .date_naive()
        .and_hms_opt(end_hour.min(23), 0, 0)
        .unwrap_or_else(|| now.naive_local());
    (start, end.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Percent-encode a datetime query value with `%20` spaces.
fn encode_window_param(datetime: &str) -> String {
    urlencode(datetime).replace('+', "%20")
}

/// Scan a catalog payload for the seat, matching by display name.
///
/// A hit must carry a positive id, contain the region's display name (table
/// numbers repeat across regions), and end with either the desk-numbered or
/// the seat-numbered suffix. First hit wins. `Err` means the payload was not
/// JSON; a JSON payload without the seat is a plain miss.
fn find_seat(body: &str, seat: &SeatLabel) -> Result<Option<SeatId>, serde_json::Error> {
    let root: Value = serde_json::from_str(body)?;
    let Some(list) = root.get("seatList").and_then(Value::as_array) else {
        return Ok(None);
    };

    let region_name = seat.region_display_name();
    let desk_suffix = seat.desk_suffix();
    let seat_suffix = seat.seat_suffix();

    for node in list {
        let name = node.get("seatName").and_then(Value::as_str).unwrap_or("");
        let id = node.get("id").and_then(Value::as_i64).unwrap_or(-1);

        if id > 0
            && name.contains(&region_name)
            && (name.ends_with(&desk_suffix) || name.ends_with(&seat_suffix))
        {
            info!(seat = %name, id, "seat label resolved");
            return Ok(Some(id));
        }
    }

    warn!(region = %region_name, suffix = %desk_suffix, "no catalog seat matched");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn label(raw: &str) -> SeatLabel {
        SeatLabel::parse(raw).unwrap()
    }

    #[test]
    fn test_find_seat_matches_desk_suffix() {
        let body = r#"{"seatList":[
            {"seatName":"三层东书库北区 10桌 F座","id":301},
            {"seatName":"三层东书库北区 11桌 F座","id":302},
            {"seatName":"三层东书库北区 11桌 G座","id":303}
        ]}"#;
        assert_eq!(find_seat(body, &label("03EN11F")).unwrap(), Some(302));
    }

    #[test]
    fn test_find_seat_matches_seat_suffix() {
        let body = r#"{"seatList":[
            {"seatName":"五层中区 04座 B座","id":5100}
        ]}"#;
        assert_eq!(find_seat(body, &label("05MM04B")).unwrap(), Some(5100));
    }

    #[test]
    fn test_find_seat_requires_region_name() {
        // Same table/column numbering in a different region must not match.
        let body = r#"{"seatList":[
            {"seatName":"三层东书库南区 11桌 F座","id":400}
        ]}"#;
        assert_eq!(find_seat(body, &label("03EN11F")).unwrap(), None);
    }

    #[test]
    fn test_find_seat_rejects_nonpositive_id() {
        let body = r#"{"seatList":[
            {"seatName":"三层东书库北区 11桌 F座","id":0},
            {"seatName":"三层东书库北区 11桌 F座","id":-5}
        ]}"#;
        assert_eq!(find_seat(body, &label("03EN11F")).unwrap(), None);
    }

    #[test]
    fn test_find_seat_first_match_wins() {
        let body = r#"{"seatList":[
            {"seatName":"三层东书库北区 11桌 F座","id":77},
            {"seatName":"三层东书库北区 11桌 F座","id":88}
        ]}"#;
        assert_eq!(find_seat(body, &label("03EN11F")).unwrap(), Some(77));
    }

    #[test]
    fn test_find_seat_missing_list_is_miss() {
        assert_eq!(find_seat(r#"{"total":0}"#, &label("03EN11F")).unwrap(), None);
        assert_eq!(
            find_seat(r#"{"seatList":null}"#, &label("03EN11F")).unwrap(),
            None
        );
    }

    #[test]
    fn test_find_seat_non_json_is_error() {
        assert!(find_seat("<html>oops</html>", &label("03EN11F")).is_err());
    }

    #[test]
    fn test_query_window_format() {
        let now = Local.with_ymd_and_hms(2025, 3, 7, 9, 30, 15).unwrap();
        let (start, end) = query_window(now, 22);
        assert_eq!(start, "2025-03-07 09:30:15");
        assert_eq!(end, "2025-03-07 22:00:00");
    }

    #[test]
    fn test_encode_window_param() {
        assert_eq!(
            encode_window_param("2025-03-07 22:00:00"),
            "2025-03-07%2022%3A00%3A00"
        );
    }

    // ---- Live-lookup tests against a mock catalog ----

    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver_for(server: &MockServer) -> SeatCatalogResolver {
        let config =
            PortalConfig::with_bases(&server.uri(), &server.uri(), &server.uri(), &server.uri());
        SeatCatalogResolver::new(config, TransportFactory::new())
    }

    const LAYOUT_BODY: &str = r#"{"seatList":[
        {"seatName":"三层东书库北区 10桌 F座","id":301},
        {"seatName":"三层东书库北区 11桌 F座","id":302}
    ]}"#;

    #[tokio::test]
    async fn test_resolve_queries_live_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/seatbook/layout/query"))
            .and(query_param("regionid", "7"))
            .and(query_param("pageSize", "500"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LAYOUT_BODY))
            .mount(&server)
            .await;

        assert_eq!(resolver_for(&server).resolve("03EN11F").await, Some(302));
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_per_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/seatbook/layout/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LAYOUT_BODY))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let first = resolver.resolve("03en-11f").await;
        let second = resolver.resolve("03EN11F").await;
        assert_eq!(first, Some(302));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_resolve_rejected_label_makes_no_request() {
        let server = MockServer::start().await;

        let resolver = resolver_for(&server);
        // Grammar failure and unknown-region failure both stop locally.
        assert_eq!(resolver.resolve("nonsense").await, None);
        assert_eq!(resolver.resolve("11EN01A").await, None);

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_retries_refused_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/seatbook/layout/query"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/seatbook/layout/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LAYOUT_BODY))
            .mount(&server)
            .await;

        assert_eq!(resolver_for(&server).resolve("03EN11F").await, Some(302));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_gives_up_after_attempt_ceiling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/seatbook/layout/query"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        assert_eq!(resolver_for(&server).resolve("03EN11F").await, None);
    }

    #[tokio::test]
    async fn test_resolve_parsed_miss_is_final() {
        let server = MockServer::start().await;
        // A clean payload without the seat must not be re-queried.
        Mock::given(method("GET"))
            .and(path("/api/seatbook/layout/query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"seatList":[{"seatName":"三层东书库北区 09桌 A座","id":9}]}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(resolver_for(&server).resolve("03EN11F").await, None);
    }
}
