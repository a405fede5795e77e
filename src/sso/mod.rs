//! SSO protocol drivers: the CAS handshake and the portal entry crawl.

pub mod entry;
pub mod handshake;
