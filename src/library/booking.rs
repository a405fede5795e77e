//! Booking portal login and single reservation attempts.
//!
//! The booking portal is a plain JSON API, unrelated to the CAS handshake:
//! a captcha bootstrap yields a login uuid, the login yields a bearer token
//! (plus an optional client ticket), and the reservation call authenticates
//! with the token as both a bearer header and a cookie. Success of an
//! attempt is decided strictly by the `code` field in the JSON payload; a
//! 2xx transport status alone means nothing.

use crate::config::PortalConfig;
use crate::error::{Error, Result};
use crate::library::seat::SeatId;
use crate::session::transport::TransportFactory;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, COOKIE};
use serde_json::Value;
use tracing::{debug, info};

/// Auth material for the booking portal.
#[derive(Debug, Clone)]
pub struct PortalAuth {
    /// Bearer token, also sent as the `Admin-Token` cookie.
    pub token: String,
    /// Client ticket cookie value; empty when the portal issued none.
    pub ticket: String,
}

impl PortalAuth {
    /// Render the dual-auth cookie header.
    fn cookie_header(&self) -> String {
        if self.ticket.is_empty() {
            format!("Admin-Token={}", self.token)
        } else {
            format!("Admin-Token={}; my_client_ticket={}", self.token, self.ticket)
        }
    }
}

/// Classified result of one reservation attempt.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BookingAttemptOutcome {
    pub success: bool,
    /// Human-readable upstream message, with fixed fallbacks when the
    /// payload carries none.
    pub message: String,
    /// Raw upstream payload, kept for diagnostics.
    pub raw: String,
}

impl BookingAttemptOutcome {
    /// A locally produced failure outcome with no upstream payload.
    pub fn refused(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            raw: String::new(),
        }
    }
}

/// Client for the booking portal's login and reservation endpoints.
pub struct BookingClient {
    config: PortalConfig,
    transport: TransportFactory,
}

impl BookingClient {
    pub fn new(config: PortalConfig, transport: TransportFactory) -> Self {
        Self { config, transport }
    }

    /// Log in to the booking portal and return its auth material.
    ///
    /// The captcha image itself is never solved; the portal only requires
    /// the uuid issued alongside it, with a fixed placeholder code.
    pub async fn login(&self, username: &str, password: &str) -> Result<PortalAuth> {
        let client = self.transport.api_client()?;
        let uuid = self.captcha_uuid(&client).await?;

        let payload = serde_json::json!({
            "username": username,
            "password": password,
            "code": "1",
            "uuid": uuid,
        });
        let resp = client
            .post(self.config.library_login_url())
            .json(&payload)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.8")
            .timeout(self.config.read_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                message: format!("login request returned status {status}"),
                raw: String::new(),
            });
        }

        let body = resp.text().await?;
        let root: Value = serde_json::from_str(&body)?;
        if root.get("code").and_then(Value::as_i64) != Some(200) {
            let message = root
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or(&body)
                .to_string();
            return Err(Error::Upstream { message, raw: body });
        }

        let data = root.get("data");
        let token = data
            .and_then(|d| d.get("token"))
            .and_then(Value::as_str)
            .or_else(|| data.and_then(|d| d.get("fresh_token")).and_then(Value::as_str))
            .or_else(|| root.get("token").and_then(Value::as_str))
            .unwrap_or("");
        if token.is_empty() {
            return Err(Error::Payload(
                "login accepted but no token in payload".to_string(),
            ));
        }

        let ticket = data
            .and_then(|d| d.get("ticket"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        info!(user = %username, "booking portal login succeeded");
        Ok(PortalAuth {
            token: token.to_string(),
            ticket,
        })
    }

    /// Issue one reservation attempt for a seat and time window.
    ///
    /// Start and end are `yyyy-MM-dd HH:mm:ss` datetimes. No retry happens
    /// here; retry policy belongs to the caller.
    pub async fn attempt(
        &self,
        seat_id: SeatId,
        start: &str,
        end: &str,
        auth: &PortalAuth,
    ) -> Result<BookingAttemptOutcome> {
        let client = self.transport.api_client()?;
        let url = self.booking_request_url(seat_id, start, end);

        let mut request = client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", auth.token))
            .header(COOKIE, auth.cookie_header())
            .header(ACCEPT, "application/json, text/plain, */*");
        if let Some(host) = self.library_host() {
            request = request.header("authority", host);
        }

        let resp = request.timeout(self.config.read_timeout).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                message: format!("booking request returned status {status}"),
                raw: String::new(),
            });
        }

        let body = resp.text().await?;
        let outcome = classify_outcome(&body)?;
        debug!(seat_id, success = outcome.success, message = %outcome.message, "attempt classified");
        Ok(outcome)
    }

    /// Reservation URL with the window datetimes `%20`-encoded in place.
    fn booking_request_url(&self, seat_id: SeatId, start: &str, end: &str) -> String {
        format!(
            "{}?channel=1001&seatid={seat_id}&starttime={}&endtime={}&terminal=WEB",
            self.config.booking_add_url(),
            start.replace(' ', "%20"),
            end.replace(' ', "%20"),
        )
    }

    /// Host of the library base, sent as the `authority` header the portal's
    /// frontend always includes.
    fn library_host(&self) -> Option<String> {
        reqwest::Url::parse(&self.config.library_base)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    /// Fetch the captcha bootstrap uuid (at `data.uuid` or the root).
    async fn captcha_uuid(&self, client: &reqwest::Client) -> Result<String> {
        let resp = client
            .get(self.config.captcha_url())
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.8")
            .timeout(self.config.read_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                message: format!("captcha endpoint returned status {status}"),
                raw: String::new(),
            });
        }

        let body = resp.text().await?;
        let root: Value = serde_json::from_str(&body)?;
        let uuid = root
            .get("data")
            .and_then(|d| d.get("uuid"))
            .and_then(Value::as_str)
            .or_else(|| root.get("uuid").and_then(Value::as_str))
            .unwrap_or("");
        if uuid.is_empty() {
            return Err(Error::Payload(format!(
                "captcha response carries no uuid: {body}"
            )));
        }
        Ok(uuid.to_string())
    }
}

/// Classify a reservation payload: success is `code == 200`, the message
/// comes from `msg` then `message`, with fixed fallbacks either way.
fn classify_outcome(raw: &str) -> std::result::Result<BookingAttemptOutcome, serde_json::Error> {
    let root: Value = serde_json::from_str(raw)?;
    let success = root.get("code").and_then(Value::as_i64) == Some(200);

    let mut message = root
        .get("msg")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if !success && message.is_empty() {
        message = root
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
    }
    if message.is_empty() {
        message = if success { "预约成功" } else { "预约失败(未知原因)" }.to_string();
    }

    Ok(BookingAttemptOutcome {
        success,
        message,
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_outcome_success_with_message() {
        let out = classify_outcome(r#"{"code":200,"msg":"已为您预约"}"#).unwrap();
        assert!(out.success);
        assert_eq!(out.message, "已为您预约");
    }

    #[test]
    fn test_classify_outcome_success_default_message() {
        let out = classify_outcome(r#"{"code":200}"#).unwrap();
        assert!(out.success);
        assert_eq!(out.message, "预约成功");
    }

    #[test]
    fn test_classify_outcome_failure_message_fallback_chain() {
        let out = classify_outcome(r#"{"code":500,"message":"该座位已被预约"}"#).unwrap();
        assert!(!out.success);
        assert_eq!(out.message, "该座位已被预约");

        let out = classify_outcome(r#"{"code":500}"#).unwrap();
        assert_eq!(out.message, "预约失败(未知原因)");
    }

    #[test]
    fn test_classify_outcome_missing_code_is_failure() {
        let out = classify_outcome(r#"{"msg":"maintenance"}"#).unwrap();
        assert!(!out.success);
        assert_eq!(out.message, "maintenance");
    }

    #[test]
    fn test_classify_outcome_keeps_raw_payload() {
        let raw = r#"{"code":500,"msg":"busy"}"#;
        assert_eq!(classify_outcome(raw).unwrap().raw, raw);
    }

    #[test]
    fn test_classify_outcome_non_json_is_error() {
        assert!(classify_outcome("<html></html>").is_err());
    }

    #[test]
    fn test_cookie_header_with_and_without_ticket() {
        let with = PortalAuth {
            token: "tok1".into(),
            ticket: "tick1".into(),
        };
        assert_eq!(
            with.cookie_header(),
            "Admin-Token=tok1; my_client_ticket=tick1"
        );

        let without = PortalAuth {
            token: "tok1".into(),
            ticket: String::new(),
        };
        assert_eq!(without.cookie_header(), "Admin-Token=tok1");
    }

    #[test]
    fn test_booking_request_url_encodes_window() {
        let client = BookingClient::new(PortalConfig::default(), TransportFactory::new());
        let url = client.booking_request_url(302, "2025-03-07 08:00:00", "2025-03-07 12:00:00");
        assert_eq!(
            url,
            "https://wslib.haut.edu.cn/stage-api/api/seatbook/user/addbooking\
             ?channel=1001&seatid=302&starttime=2025-03-07%2008:00:00\
             &endtime=2025-03-07%2012:00:00&terminal=WEB"
        );
    }

    #[test]
    fn test_refused_outcome() {
        let out = BookingAttemptOutcome::refused("no seat configured");
        assert!(!out.success);
        assert_eq!(out.message, "no seat configured");
        assert!(out.raw.is_empty());
    }

    // ---- Flow tests against a mock booking portal ----

    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BookingClient {
        let config =
            PortalConfig::with_bases(&server.uri(), &server.uri(), &server.uri(), &server.uri());
        BookingClient::new(config, TransportFactory::new())
    }

    async fn mount_captcha(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/captchaImage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"code":200,"uuid":"UUID-1","img":"iVBOR"}"#),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_login_carries_captcha_uuid() {
        let server = MockServer::start().await;
        mount_captcha(&server).await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_partial_json(serde_json::json!({
                "username": "2021001",
                "password": "pw",
                "code": "1",
                "uuid": "UUID-1",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"code":200,"data":{"token":"TOK-A","ticket":"TIC-B"}}"#,
            ))
            .mount(&server)
            .await;

        let auth = client_for(&server).login("2021001", "pw").await.unwrap();
        assert_eq!(auth.token, "TOK-A");
        assert_eq!(auth.ticket, "TIC-B");
    }

    #[tokio::test]
    async fn test_login_fresh_token_fallback() {
        let server = MockServer::start().await;
        mount_captcha(&server).await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"code":200,"data":{"fresh_token":"FT-9"}}"#),
            )
            .mount(&server)
            .await;

        let auth = client_for(&server).login("2021001", "pw").await.unwrap();
        assert_eq!(auth.token, "FT-9");
        assert!(auth.ticket.is_empty());
    }

    #[tokio::test]
    async fn test_login_surfaces_upstream_message() {
        let server = MockServer::start().await;
        mount_captcha(&server).await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"code":500,"msg":"验证码错误"}"#),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).login("2021001", "pw").await.unwrap_err();
        match err {
            Error::Upstream { message, .. } => assert_eq!(message, "验证码错误"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_login_requires_token_in_payload() {
        let server = MockServer::start().await;
        mount_captcha(&server).await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"code":200,"data":{}}"#))
            .mount(&server)
            .await;

        let err = client_for(&server).login("2021001", "pw").await.unwrap_err();
        assert!(matches!(err, Error::Payload(_)));
    }

    #[tokio::test]
    async fn test_attempt_sends_dual_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/seatbook/user/addbooking"))
            .and(query_param("channel", "1001"))
            .and(query_param("seatid", "912"))
            .and(query_param("starttime", "2025-03-07 08:00:00"))
            .and(query_param("endtime", "2025-03-07 12:00:00"))
            .and(query_param("terminal", "WEB"))
            .and(header("authorization", "Bearer TOK"))
            .and(header("cookie", "Admin-Token=TOK; my_client_ticket=TIC"))
            .and(header("authority", "127.0.0.1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"code":200,"msg":"操作成功"}"#),
            )
            .mount(&server)
            .await;

        let auth = PortalAuth {
            token: "TOK".into(),
            ticket: "TIC".into(),
        };
        let outcome = client_for(&server)
            .attempt(912, "2025-03-07 08:00:00", "2025-03-07 12:00:00", &auth)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, "操作成功");
    }

    #[tokio::test]
    async fn test_attempt_refusal_is_an_outcome_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/seatbook/user/addbooking"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"code":500,"msg":"该座位已被预约"}"#),
            )
            .mount(&server)
            .await;

        let auth = PortalAuth {
            token: "TOK".into(),
            ticket: String::new(),
        };
        let outcome = client_for(&server)
            .attempt(912, "2025-03-07 08:00:00", "2025-03-07 12:00:00", &auth)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "该座位已被预约");
    }
}
