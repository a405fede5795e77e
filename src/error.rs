//! Error taxonomy for portal and booking operations.
//!
//! Errors are classified by what the caller can do about them: `Auth` means
//! the credentials are wrong and retrying is pointless; `Handshake` means a
//! protocol invariant broke mid-flow and the whole exchange must be restarted
//! from scratch (one-time tickets cannot be replayed); `SessionExpired` means
//! the server dropped a previously valid session. A seat label that matches
//! nothing is not an error at all -- resolution returns `None`.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by portal, catalog, and booking operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The identity provider rejected the credentials.
    #[error("authentication rejected: {reason}")]
    Auth {
        /// Human-readable rejection reason.
        reason: String,
    },

    /// A handshake stage violated the expected protocol shape.
    ///
    /// Never retried: by the time a stage fails, its one-time ticket has
    /// already been consumed, so a silent restart cannot succeed.
    #[error("handshake failed at {stage}: {detail}")]
    Handshake {
        /// Which fixed stage broke (`ticket-fetch`, `no-ticket`,
        /// `session-cookie-missing`).
        stage: &'static str,
        /// What was observed instead of the expected shape.
        detail: String,
    },

    /// The entry crawl exceeded its redirect hop ceiling.
    #[error("redirect chain exceeded {limit} hops")]
    RedirectLimit {
        /// The configured hop ceiling.
        limit: usize,
    },

    /// A downstream call discovered the session is no longer valid.
    #[error("portal session expired")]
    SessionExpired,

    /// The upstream replied but refused the request.
    #[error("upstream refused: {message}")]
    Upstream {
        /// Message extracted from the upstream payload.
        message: String,
        /// Raw payload kept for diagnostics.
        raw: String,
    },

    /// Network-level failure on a single HTTP call.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body could not be parsed as JSON.
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL failed to parse.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Response parsed but did not have the expected shape.
    #[error("unexpected payload: {0}")]
    Payload(String),
}

impl Error {
    /// Build a `Handshake` error for the given stage.
    pub fn handshake(stage: &'static str, detail: impl Into<String>) -> Self {
        Error::Handshake {
            stage,
            detail: detail.into(),
        }
    }

    /// Build an `Auth` error with the given reason.
    pub fn auth(reason: impl Into<String>) -> Self {
        Error::Auth {
            reason: reason.into(),
        }
    }
}
