//! Campus portal automation: CAS single sign-on, academic system queries,
//! and a second-precision library seat booking scheduler.
//!
//! The crate is organized around the portal surfaces it talks to:
//!
//! - [`sso`] drives the CAS handshake and the cookie-harvesting entry crawl
//! - [`academic`] queries grades and timetables over a harvested session
//! - [`library`] resolves seat labels, books seats, and runs the scheduler
//! - [`store`] persists booking profiles and reservation windows
//! - [`session`] holds the shared transport and cookie plumbing
//!
//! Every network operation is driven by a [`config::PortalConfig`], so tests
//! point the whole stack at a local mock portal.

pub mod academic;
pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod session;
pub mod sso;
pub mod store;

pub use config::PortalConfig;
pub use error::{Error, Result};
