//! Portal endpoints and operational tunables.
//!
//! Defaults match the production deployment; every base URL can be overridden
//! through `CAMPANILE_*` environment variables so tests and alternate campuses
//! can point the client elsewhere without a rebuild.

use std::time::Duration;

/// Endpoint bases and tunables shared across portal operations.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// CAS identity-provider base (ticket fetch + login live under `/cas`).
    pub cas_base: String,
    /// Service URL the CAS login redirects back to; also the `service`
    /// query parameter on every CAS request.
    pub service_url: String,
    /// Academic administration system base (grades, timetable, SSO entry).
    pub academic_base: String,
    /// Library booking portal API base.
    pub library_base: String,
    /// Timeout for handshake and crawl requests.
    pub handshake_timeout: Duration,
    /// Read timeout for data-fetch requests (grades, timetable, booking).
    pub read_timeout: Duration,
    /// Timeout for seat-catalog queries.
    pub catalog_timeout: Duration,
    /// Redirect hop ceiling for the entry crawl.
    pub hop_limit: usize,
    /// Catalog query attempts before a lookup gives up.
    pub catalog_attempts: u32,
    /// Booking attempts per dispatched task.
    pub booking_attempts: u32,
    /// Seconds before a window's start time at which the scheduler fires.
    pub trigger_lead_secs: u32,
    /// Hour (24h, local) closing the same-day catalog query window.
    pub catalog_day_end_hour: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            cas_base: "https://mapp.haut.edu.cn".to_string(),
            service_url: "https://portal.haut.edu.cn/portal-pc/login/pcLogin".to_string(),
            academic_base: "https://jwglxt.haut.edu.cn".to_string(),
            library_base: "https://wslib.haut.edu.cn/stage-api".to_string(),
            handshake_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(15),
            catalog_timeout: Duration::from_secs(5),
            hop_limit: 10,
            catalog_attempts: 2,
            booking_attempts: 20,
            trigger_lead_secs: 5,
            catalog_day_end_hour: 22,
        }
    }
}

impl PortalConfig {
    /// Default config with base URLs overridden from the environment
    /// (`CAMPANILE_CAS_BASE`, `CAMPANILE_SERVICE_URL`,
    /// `CAMPANILE_ACADEMIC_BASE`, `CAMPANILE_LIBRARY_BASE`).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("CAMPANILE_CAS_BASE") {
            cfg.cas_base = v;
        }
        if let Ok(v) = std::env::var("CAMPANILE_SERVICE_URL") {
            cfg.service_url = v;
        }
        if let Ok(v) = std::env::var("CAMPANILE_ACADEMIC_BASE") {
            cfg.academic_base = v;
        }
        if let Ok(v) = std::env::var("CAMPANILE_LIBRARY_BASE") {
            cfg.library_base = v;
        }
        cfg
    }

    /// Config pointed at explicit bases, keeping default tunables.
    pub fn with_bases(
        cas_base: &str,
        service_url: &str,
        academic_base: &str,
        library_base: &str,
    ) -> Self {
        Self {
            cas_base: cas_base.to_string(),
            service_url: service_url.to_string(),
            academic_base: academic_base.to_string(),
            library_base: library_base.to_string(),
            ..Self::default()
        }
    }

    /// One-time ticket endpoint (`lt` + `execution`, JSONP-wrapped).
    pub fn ticket_url(&self) -> String {
        format!(
            "{}/cas/login?action=getlt&service={}",
            self.cas_base,
            urlencode(&self.service_url)
        )
    }

    /// CAS login submission endpoint. The `submit` marker is part of the
    /// upstream contract and must stay percent-encoded exactly as sent by
    /// the portal's own login page.
    pub fn login_url(&self) -> String {
        format!(
            "{}/cas/login?submit=%E7%99%BB++%E5%BD%95&service={}",
            self.cas_base,
            urlencode(&self.service_url)
        )
    }

    /// SSO entry point of the academic system; start of the cookie crawl.
    pub fn academic_entry_url(&self) -> String {
        format!("{}/sso/jhlogin", self.academic_base)
    }

    /// Grade query endpoint (form POST).
    pub fn grade_query_url(&self) -> String {
        format!(
            "{}/jwglxt/cjcx/cjcx_cxXsgrcj.html?doType=query&gnmkdm=N305005",
            self.academic_base
        )
    }

    /// Mobile timetable endpoint (form POST).
    pub fn timetable_url(&self) -> String {
        format!(
            "{}/jwglxt/kbcx/xskbcxMobile_cxXsKb.html?gnmkdm=N2154",
            self.academic_base
        )
    }

    /// Captcha bootstrap endpoint of the booking portal (yields the login uuid).
    pub fn captcha_url(&self) -> String {
        format!("{}/captchaImage", self.library_base)
    }

    /// JSON login endpoint of the booking portal.
    pub fn library_login_url(&self) -> String {
        format!("{}/login", self.library_base)
    }

    /// Seat catalog layout endpoint (query parameters appended by the caller).
    pub fn catalog_layout_url(&self) -> String {
        format!("{}/api/seatbook/layout/query", self.library_base)
    }

    /// Reservation endpoint (query parameters appended by the caller).
    pub fn booking_add_url(&self) -> String {
        format!("{}/api/seatbook/user/addbooking", self.library_base)
    }
}

/// Form-urlencode a string for use as a query parameter value.
pub fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
