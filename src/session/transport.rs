//! Per-user transport construction.
//!
//! Every handshake gets its own client and cookie jar so concurrent users can
//! never observe each other's session state. Redirect following is disabled on
//! handshake and crawl clients: the protocol inspects 3xx statuses and
//! `Location` headers directly, and auto-following would swallow the service
//! ticket.

use crate::error::Result;
use crate::session::cookies;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use std::sync::Arc;

/// Browser user agent presented to every portal endpoint.
pub const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Transport handle plus cookie jar scoped to one user's handshake.
///
/// Created per handshake attempt and discarded once the derived tokens are
/// extracted. The jar is never shared across users.
pub struct HttpSessionContext {
    client: reqwest::Client,
    jar: Arc<Jar>,
}

impl HttpSessionContext {
    /// The jar-backed client (redirects disabled).
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Look up a cookie by name among those the jar would send to `url`.
    pub fn cookie_value(&self, url: &str, name: &str) -> Result<Option<String>> {
        let parsed = reqwest::Url::parse(url)?;
        let Some(header) = self.jar.cookies(&parsed) else {
            return Ok(None);
        };
        let Ok(rendered) = header.to_str() else {
            return Ok(None);
        };
        Ok(cookies::cookie_from_header(rendered, name))
    }
}

/// Builds the transport handles used by portal operations.
///
/// Injected rather than global so each call site constructs exactly the
/// client it needs and no hidden state survives between users.
#[derive(Debug, Clone)]
pub struct TransportFactory {
    user_agent: String,
}

impl Default for TransportFactory {
    fn default() -> Self {
        Self {
            user_agent: DESKTOP_UA.to_string(),
        }
    }
}

impl TransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh jar-backed context for one handshake. Redirects disabled.
    pub fn session_context(&self) -> Result<HttpSessionContext> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .redirect(Policy::none())
            .cookie_provider(jar.clone())
            .build()?;
        Ok(HttpSessionContext { client, jar })
    }

    /// Jarless client with redirects disabled, for crawl hops and data
    /// fetches that render their `Cookie` header manually.
    pub fn bare_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .redirect(Policy::none())
            .build()?;
        Ok(client)
    }

    /// Jarless client with default redirect handling, for the booking
    /// portal's plain JSON API.
    pub fn api_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .build()?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_build() {
        let factory = TransportFactory::new();
        assert!(factory.session_context().is_ok());
        assert!(factory.bare_client().is_ok());
        assert!(factory.api_client().is_ok());
    }

    #[test]
    fn test_cookie_value_reads_jar() {
        let factory = TransportFactory::new();
        let ctx = factory.session_context().unwrap();
        let url = reqwest::Url::parse("https://portal.example.edu/login").unwrap();
        ctx.jar.add_cookie_str("JSESSIONID=abc123; Path=/", &url);

        let found = ctx
            .cookie_value("https://portal.example.edu/login", "JSESSIONID")
            .unwrap();
        assert_eq!(found.as_deref(), Some("abc123"));

        let missing = ctx
            .cookie_value("https://portal.example.edu/login", "route")
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_cookie_value_scoped_by_domain() {
        let factory = TransportFactory::new();
        let ctx = factory.session_context().unwrap();
        let url = reqwest::Url::parse("https://portal.example.edu/").unwrap();
        ctx.jar.add_cookie_str("JSESSIONID=abc123; Path=/", &url);

        let other = ctx
            .cookie_value("https://elsewhere.example.org/", "JSESSIONID")
            .unwrap();
        assert!(other.is_none());
    }

    #[test]
    fn test_separate_contexts_have_separate_jars() {
        let factory = TransportFactory::new();
        let a = factory.session_context().unwrap();
        let b = factory.session_context().unwrap();
        let url = reqwest::Url::parse("https://portal.example.edu/").unwrap();
        a.jar.add_cookie_str("JSESSIONID=user-a; Path=/", &url);

        let b_sees = b
            .cookie_value("https://portal.example.edu/", "JSESSIONID")
            .unwrap();
        assert!(b_sees.is_none());
    }
}
