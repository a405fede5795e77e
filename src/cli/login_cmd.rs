//! `campanile login <student-id>` -- run the single sign-on handshake and
//! the entry crawl, then report the harvested session.

use crate::cli::output::{self, Styled};
use crate::config::PortalConfig;
use crate::session::transport::TransportFactory;
use crate::sso::entry::PortalEntryCrawler;
use crate::sso::handshake::{Credentials, SsoHandshakeClient};
use crate::store::{ProfileStore, SqliteStore};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;

/// Resolve the password for a student: explicit flag first, then the
/// `CAMPANILE_PASSWORD` environment variable, then the saved profile.
pub fn resolve_password(flag: Option<String>, student_id: &str) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    if let Ok(password) = std::env::var("CAMPANILE_PASSWORD") {
        return Ok(password);
    }
    saved_password(&SqliteStore::open_default()?, student_id)
}

/// Final fallback of the password chain: the saved profile.
fn saved_password(store: &SqliteStore, student_id: &str) -> Result<String> {
    if let Some(profile) = store.profile(student_id)? {
        return Ok(profile.password);
    }
    bail!(
        "no password for {student_id}: pass --password, set CAMPANILE_PASSWORD, \
         or save a profile first"
    );
}

/// Full sign-on: CAS handshake followed by the entry crawl. Returns the
/// harvested cookie set ready for academic queries.
pub async fn establish_session(
    config: &PortalConfig,
    student_id: &str,
    password: &str,
) -> Result<HashMap<String, String>> {
    let transport = TransportFactory::new();
    let credentials = Credentials {
        account: student_id.to_string(),
        secret: password.to_string(),
    };

    let handshake = SsoHandshakeClient::new(config.clone(), transport.clone());
    let tokens = handshake
        .acquire_session(&credentials)
        .await
        .context("single sign-on handshake failed")?;

    let crawler = PortalEntryCrawler::new(config.clone(), transport);
    let cookies = crawler
        .harvest_cookies(&tokens)
        .await
        .context("portal entry crawl failed")?;
    Ok(cookies)
}

/// Run the login command.
pub async fn run(student_id: &str, password: Option<String>) -> Result<()> {
    let s = Styled::new();
    let password = resolve_password(password, student_id)?;
    let config = PortalConfig::from_env();

    let cookies = establish_session(&config, student_id, &password).await?;

    let mut names: Vec<&String> = cookies.keys().collect();
    names.sort();

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "student_id": student_id,
            "session": "established",
            "cookies": names,
        }));
        return Ok(());
    }

    if !output::is_quiet() {
        eprintln!(
            "  {} Signed in as {} ({} cookies harvested)",
            s.ok_sym(),
            s.bold(student_id),
            cookies.len()
        );
        for name in names {
            if output::is_verbose() {
                let value = cookies.get(name).map(String::as_str).unwrap_or("");
                output::print_check(s.ok_sym(), name, &s.dim(value));
            } else {
                output::print_check(s.ok_sym(), name, "");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("booking.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_resolve_password_prefers_flag() {
        let resolved = resolve_password(Some("from-flag".into()), "2021001").unwrap();
        assert_eq!(resolved, "from-flag");
    }

    #[test]
    fn test_saved_password_reads_profile() {
        let (_dir, store) = temp_store();
        store
            .upsert_profile("2021001", "hunter2", "04ES12C", None)
            .unwrap();
        assert_eq!(saved_password(&store, "2021001").unwrap(), "hunter2");
    }

    #[test]
    fn test_saved_password_names_the_alternatives() {
        let (_dir, store) = temp_store();
        let err = saved_password(&store, "2021001").unwrap_err();
        assert!(err.to_string().contains("--password"));
        assert!(err.to_string().contains("CAMPANILE_PASSWORD"));
    }
}
