//! CAS handshake driver -- credentials in, session tokens out.
//!
//! The exchange is a fixed five-step sequence with no content branching:
//! encode the secret, fetch a one-time ticket pair, submit the login form,
//! follow the service redirect exactly once, and read the session cookie out
//! of the jar. Success at the login step is signaled exclusively by a 3xx
//! status; a 200 means the portal re-rendered the form and the credentials
//! were rejected.

use crate::config::PortalConfig;
use crate::error::{Error, Result};
use crate::session::cookies::resolve_location;
use crate::session::transport::{HttpSessionContext, TransportFactory};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::LOCATION;
use serde::Deserialize;
use tracing::debug;

/// Login-field prefix the portal expects in front of the base64 secret.
///
/// Not cryptography, just the upstream's wire format; it must be reproduced
/// byte for byte or the login is rejected.
const SECRET_PREFIX: &str = "{gilight}_";

/// Account identifier and secret for one portal user. Never persisted here.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub account: String,
    pub secret: String,
}

/// Artifacts of a successful handshake.
///
/// Immutable once produced. The routing id only appears after the entry
/// crawl harvests it; the handshake itself yields the primary session id.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    /// Primary session cookie value (`JSESSIONID`).
    pub session_id: String,
    /// Sticky-routing cookie value (`route`), when harvested.
    pub route: Option<String>,
}

/// One-time ticket pair handed out by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginTicket {
    pub lt: String,
    pub execution: String,
}

/// Drives the CAS handshake against the identity provider.
pub struct SsoHandshakeClient {
    config: PortalConfig,
    transport: TransportFactory,
}

impl SsoHandshakeClient {
    pub fn new(config: PortalConfig, transport: TransportFactory) -> Self {
        Self { config, transport }
    }

    /// Run the full handshake and return the extracted session tokens.
    ///
    /// Each call builds a fresh `HttpSessionContext`; nothing is shared with
    /// other in-flight handshakes. Failed stages are never retried here: the
    /// one-time ticket is consumed by the attempt, so the caller must start
    /// over from scratch.
    pub async fn acquire_session(&self, credentials: &Credentials) -> Result<SessionTokens> {
        let ctx = self.transport.session_context()?;

        let ticket = self.fetch_login_ticket(&ctx).await?;
        debug!(account = %credentials.account, "login ticket acquired");

        let service_location = self.submit_login(&ctx, credentials, &ticket).await?;
        debug!("credentials accepted, service ticket issued");

        self.follow_service_redirect(&ctx, &service_location).await?;

        let session_id = self
            .extract_cookie(&ctx, &service_location, "JSESSIONID")?
            .ok_or_else(|| {
                Error::handshake(
                    "session-cookie-missing",
                    "no JSESSIONID in jar after ticket exchange",
                )
            })?;
        let route = self.extract_cookie(&ctx, &service_location, "route")?;
        debug!(sticky_route = route.is_some(), "session cookie extracted");

        Ok(SessionTokens { session_id, route })
    }

    /// Fetch the one-time `lt`/`execution` pair. The response is JSONP.
    async fn fetch_login_ticket(&self, ctx: &HttpSessionContext) -> Result<LoginTicket> {
        let url = self.config.ticket_url();
        let resp = ctx
            .client()
            .get(&url)
            .timeout(self.config.handshake_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::handshake("ticket-fetch", format!("status {status}")));
        }

        let body = resp.text().await?;
        let json = strip_jsonp(&body)
            .ok_or_else(|| Error::handshake("ticket-fetch", "response is not JSONP"))?;
        let ticket: LoginTicket = serde_json::from_str(json)?;
        Ok(ticket)
    }

    /// Submit the login form. A 3xx status is the only success signal; its
    /// `Location` must carry the service ticket.
    async fn submit_login(
        &self,
        ctx: &HttpSessionContext,
        credentials: &Credentials,
        ticket: &LoginTicket,
    ) -> Result<String> {
        let url = self.config.login_url();
        let encoded = encode_secret(&credentials.secret);
        let form = [
            ("username", credentials.account.as_str()),
            ("password", encoded.as_str()),
            ("lt", ticket.lt.as_str()),
            ("execution", ticket.execution.as_str()),
            ("_eventId", "submit"),
        ];

        let resp = ctx
            .client()
            .post(&url)
            .form(&form)
            .timeout(self.config.handshake_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_redirection() {
            return Err(Error::auth("invalid credentials"));
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !location.contains("ticket=") {
            return Err(Error::handshake(
                "no-ticket",
                format!("redirect location {location:?} carries no service ticket"),
            ));
        }

        Ok(resolve_location(&url, location))
    }

    /// Follow the service redirect exactly once so the target application
    /// exchanges the ticket and issues session cookies into the jar. The
    /// response status is informational only.
    async fn follow_service_redirect(&self, ctx: &HttpSessionContext, location: &str) -> Result<()> {
        let resp = ctx
            .client()
            .get(location)
            .timeout(self.config.handshake_timeout)
            .send()
            .await?;
        debug!(status = %resp.status(), "service redirect followed");
        Ok(())
    }

    /// Read a cookie from the jar by name, checking the followed URL first
    /// and the configured bases as fallbacks (the portal occasionally scopes
    /// cookies to the identity provider's domain instead).
    fn extract_cookie(
        &self,
        ctx: &HttpSessionContext,
        followed_url: &str,
        name: &str,
    ) -> Result<Option<String>> {
        for url in [
            followed_url,
            self.config.service_url.as_str(),
            self.config.cas_base.as_str(),
        ] {
            if let Some(value) = ctx.cookie_value(url, name)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// Encode the raw secret the way the portal's login field expects:
/// a fixed prefix plus the standard base64 of the secret bytes.
pub fn encode_secret(secret: &str) -> String {
    format!("{SECRET_PREFIX}{}", STANDARD.encode(secret.as_bytes()))
}

/// Strip a JSONP wrapper, returning the JSON between the first `(` and the
/// last `)`. Returns `None` when no wrapper is present.
fn strip_jsonp(body: &str) -> Option<&str> {
    let start = body.find('(')?;
    let end = body.rfind(')')?;
    if end <= start {
        return None;
    }
    Some(&body[start + 1..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_secret_exact_bytes() {
        // base64("secret") == "c2VjcmV0"
        assert_eq!(encode_secret("secret"), "{gilight}_c2VjcmV0");
        // Empty secret still carries the prefix.
        assert_eq!(encode_secret(""), "{gilight}_");
    }

    #[test]
    fn test_encode_secret_multibyte() {
        // UTF-8 bytes are encoded as-is, no normalization.
        assert_eq!(encode_secret("密码"), format!("{{gilight}}_{}", "5a+G56CB"));
    }

    #[test]
    fn test_strip_jsonp_callback() {
        let body = r#"callback({"lt":"LT-1234","execution":"e1s1"})"#;
        assert_eq!(
            strip_jsonp(body),
            Some(r#"{"lt":"LT-1234","execution":"e1s1"}"#)
        );
    }

    #[test]
    fn test_strip_jsonp_anonymous_wrapper() {
        let body = r#"({"lt":"LT-9","execution":"e2s4"});"#;
        assert_eq!(strip_jsonp(body), Some(r#"{"lt":"LT-9","execution":"e2s4"}"#));
    }

    #[test]
    fn test_strip_jsonp_plain_json_rejected() {
        assert!(strip_jsonp(r#"{"lt":"LT-1","execution":"e1s1"}"#).is_none());
        assert!(strip_jsonp("").is_none());
        assert!(strip_jsonp(")(").is_none());
    }

    #[test]
    fn test_login_ticket_parses_from_stripped_body() {
        let body = r#"jsonpcallback({"lt":"LT-55-abcdef","execution":"e1s1"})"#;
        let ticket: LoginTicket = serde_json::from_str(strip_jsonp(body).unwrap()).unwrap();
        assert_eq!(ticket.lt, "LT-55-abcdef");
        assert_eq!(ticket.execution, "e1s1");
    }

    // ---- Full-flow tests against a mock portal ----

    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn portal_config(server: &MockServer) -> PortalConfig {
        let service = format!("{}/portal/login", server.uri());
        PortalConfig::with_bases(&server.uri(), &service, &server.uri(), &server.uri())
    }

    fn credentials() -> Credentials {
        Credentials {
            account: "2021001".to_string(),
            secret: "secret".to_string(),
        }
    }

    async fn mount_ticket_endpoint(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/cas/login"))
            .and(query_param("action", "getlt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"jsonpcallback({"lt":"LT-1","execution":"e1s1"})"#,
            ))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_acquire_session_full_handshake() {
        let server = MockServer::start().await;
        mount_ticket_endpoint(&server).await;

        let ticket_location = format!("{}/portal/login?ticket=ST-77", server.uri());
        Mock::given(method("POST"))
            .and(path("/cas/login"))
            .and(body_string_contains("username=2021001"))
            .and(body_string_contains("password=%7Bgilight%7D_c2VjcmV0"))
            .and(body_string_contains("lt=LT-1"))
            .and(body_string_contains("execution=e1s1"))
            .and(body_string_contains("_eventId=submit"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", ticket_location.as_str()),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/portal/login"))
            .and(query_param("ticket", "ST-77"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("Set-Cookie", "JSESSIONID=SESS-123; Path=/")
                    .append_header("Set-Cookie", "route=cas-node-1; Path=/"),
            )
            .mount(&server)
            .await;

        let client = SsoHandshakeClient::new(portal_config(&server), TransportFactory::new());
        let tokens = client.acquire_session(&credentials()).await.unwrap();
        assert_eq!(tokens.session_id, "SESS-123");
        assert_eq!(tokens.route.as_deref(), Some("cas-node-1"));
    }

    #[tokio::test]
    async fn test_acquire_session_rejects_bad_credentials() {
        let server = MockServer::start().await;
        mount_ticket_endpoint(&server).await;

        // A re-rendered login form (status 200) means rejection.
        Mock::given(method("POST"))
            .and(path("/cas/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let client = SsoHandshakeClient::new(portal_config(&server), TransportFactory::new());
        let err = client.acquire_session(&credentials()).await.unwrap_err();
        assert!(matches!(err, Error::Auth { .. }));
    }

    #[tokio::test]
    async fn test_acquire_session_requires_service_ticket() {
        let server = MockServer::start().await;
        mount_ticket_endpoint(&server).await;

        let bare_location = format!("{}/portal/login", server.uri());
        Mock::given(method("POST"))
            .and(path("/cas/login"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", bare_location.as_str()),
            )
            .mount(&server)
            .await;

        let client = SsoHandshakeClient::new(portal_config(&server), TransportFactory::new());
        let err = client.acquire_session(&credentials()).await.unwrap_err();
        match err {
            Error::Handshake { stage, .. } => assert_eq!(stage, "no-ticket"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_acquire_session_ticket_endpoint_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cas/login"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = SsoHandshakeClient::new(portal_config(&server), TransportFactory::new());
        let err = client.acquire_session(&credentials()).await.unwrap_err();
        match err {
            Error::Handshake { stage, .. } => assert_eq!(stage, "ticket-fetch"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
