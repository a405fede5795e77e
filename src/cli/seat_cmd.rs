//! `campanile seat <label>` -- resolve a seat label against the live
//! catalog and print the numeric seat id the portal books by.

use crate::cli::output::{self, Styled};
use crate::config::PortalConfig;
use crate::library::catalog::SeatCatalogResolver;
use crate::library::seat::SeatLabel;
use crate::session::transport::TransportFactory;
use anyhow::{bail, Result};

/// Run the seat command.
pub async fn run(label: &str) -> Result<()> {
    let s = Styled::new();

    let Some(parsed) = SeatLabel::parse(label) else {
        bail!("'{label}' is not a seat label (expected e.g. 04ES12C)");
    };
    let region = parsed.region_display_name();

    let config = PortalConfig::from_env();
    let resolver = SeatCatalogResolver::new(config, TransportFactory::new());
    let seat_id = resolver.resolve(label).await;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "label": label,
            "region": region,
            "seat_id": seat_id,
        }));
        if seat_id.is_none() {
            std::process::exit(1);
        }
        return Ok(());
    }

    match seat_id {
        Some(id) => {
            if !output::is_quiet() {
                eprintln!(
                    "  {} {} -> seat id {} ({region})",
                    s.ok_sym(),
                    s.bold(label),
                    s.cyan(&id.to_string())
                );
            }
            Ok(())
        }
        None => {
            eprintln!("  {} {} not found in the live catalog ({region})", s.fail_sym(), label);
            eprintln!("  {}", s.dim("The catalog only lists seats for the current day."));
            std::process::exit(1);
        }
    }
}
