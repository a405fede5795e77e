//! Portal entry crawl: bounded redirect walk that harvests session cookies.
//!
//! After the CAS handshake, the academic system still needs its own cookie
//! set (notably the sticky-routing `route` cookie). The crawl starts at the
//! SSO entry URL with only the primary session id, follows each redirect
//! while folding every `Set-Cookie` into the working set, and stops at the
//! first response it cannot follow further: a non-redirect status, or a
//! redirect carrying no `Location`. A hard hop ceiling protects against
//! redirect loops.

use crate::config::PortalConfig;
use crate::error::{Error, Result};
use crate::session::cookies::{parse_set_cookies, render_cookie_header, resolve_location};
use crate::session::transport::TransportFactory;
use crate::sso::handshake::SessionTokens;
use reqwest::header::{COOKIE, LOCATION};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Body substrings that indicate the terminal page rendered signed-in
/// content. Best-effort signal for logging only.
const SIGNED_IN_MARKERS: [&str; 3] = ["欢迎", "jsxsd", "学生"];

/// Walks the academic system's entry redirect chain and harvests cookies.
pub struct PortalEntryCrawler {
    config: PortalConfig,
    transport: TransportFactory,
}

impl PortalEntryCrawler {
    pub fn new(config: PortalConfig, transport: TransportFactory) -> Self {
        Self { config, transport }
    }

    /// Follow the entry chain and return every cookie set along the way,
    /// seeded with the primary session id.
    ///
    /// The `Cookie` header is rendered manually on each hop from the cookies
    /// collected so far; a later `Set-Cookie` for the same name overwrites
    /// the earlier value. A redirect with no usable `Location` ends the
    /// chain like a terminal page. Exceeding the hop ceiling without
    /// reaching a terminal response fails with `RedirectLimit`.
    pub async fn harvest_cookies(
        &self,
        tokens: &SessionTokens,
    ) -> Result<HashMap<String, String>> {
        let client = self.transport.bare_client()?;

        let mut cookies = HashMap::new();
        cookies.insert("JSESSIONID".to_string(), tokens.session_id.clone());
        if let Some(route) = &tokens.route {
            cookies.insert("route".to_string(), route.clone());
        }

        let mut current = self.config.academic_entry_url();
        for hop in 1..=self.config.hop_limit {
            let resp = client
                .get(&current)
                .header(COOKIE, render_cookie_header(&cookies))
                .timeout(self.config.handshake_timeout)
                .send()
                .await?;

            let status = resp.status();
            for (name, value) in parse_set_cookies(resp.headers()) {
                debug!(hop, cookie = %name, "harvested cookie");
                cookies.insert(name, value);
            }

            if status.is_redirection() {
                // A redirect without a Location header is the end of the
                // chain, not a loop back to the same URL.
                let Some(location) = resp.headers().get(LOCATION).and_then(|v| v.to_str().ok())
                else {
                    debug!(
                        hop,
                        %status,
                        harvested = cookies.len(),
                        "entry redirect carried no location, ending crawl"
                    );
                    return Ok(cookies);
                };
                let next = resolve_location(&current, location);
                debug!(hop, %status, to = %next, "following entry redirect");
                current = next;
                continue;
            }

            // Terminal response: sniff the body for signed-in markers, but
            // treat their absence as a warning, not a failure.
            let body = resp.text().await.unwrap_or_default();
            if SIGNED_IN_MARKERS.iter().any(|m| body.contains(m)) {
                debug!(hop, harvested = cookies.len(), "entry chain reached signed-in page");
            } else {
                warn!(
                    hop,
                    harvested = cookies.len(),
                    "entry chain terminal page shows no signed-in marker"
                );
            }
            return Ok(cookies);
        }

        Err(Error::RedirectLimit {
            limit: self.config.hop_limit,
        })
    }
}
