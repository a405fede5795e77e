//! `campanile watch` -- run the autonomous booking scheduler in the
//! foreground until interrupted.

use crate::cli::output::{self, Styled};
use crate::config::PortalConfig;
use crate::library::booking::BookingClient;
use crate::library::scheduler::{BookingScheduler, PortalBookingRunner};
use crate::session::transport::TransportFactory;
use crate::store::{ProfileStore, SqliteStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Run the watch command.
pub async fn run() -> Result<()> {
    let s = Styled::new();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("campanile=info".parse().unwrap()),
        )
        .init();

    info!("starting campanile v{}", env!("CARGO_PKG_VERSION"));

    let config = PortalConfig::from_env();
    let store = Arc::new(SqliteStore::open_default()?);

    let enabled = store.auto_enabled_profiles()?.len();
    if !output::is_quiet() {
        eprintln!(
            "  {} campanile v{} watching ({enabled} auto-enabled profiles)",
            s.ok_sym(),
            env!("CARGO_PKG_VERSION")
        );
        eprintln!("  {}", s.dim("Ctrl-C to stop."));
    }

    let client = BookingClient::new(config.clone(), TransportFactory::new());
    let runner = Arc::new(PortalBookingRunner::new(client, config.booking_attempts));
    let scheduler = BookingScheduler::new(store, runner, config.trigger_lead_secs);

    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            if !output::is_quiet() {
                eprintln!("  {} campanile stopped.", s.ok_sym());
            }
        }
    }
    Ok(())
}
