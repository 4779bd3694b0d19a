//! Migrate command handler

use std::path::Path;

use anyhow::{bail, Context, Result};

use retrieve_core::store::dialect::redact;
use retrieve_core::{Config, Dialect, Migration, Store};

use crate::output::Output;

/// Copy every block from an embedded store into a distributed store
pub async fn run(config: &Config, embedded: &str, distributed: &str, output: &Output) -> Result<()> {
    check_endpoints(embedded, distributed)?;

    let source = Store::open(embedded)
        .await
        .context("Failed to open source store")?;
    let dest = match Store::open_with_options(distributed, config.store_options()).await {
        Ok(dest) => dest,
        Err(e) => {
            source.close().await;
            return Err(e).context("Failed to open destination store");
        }
    };

    let result = Migration::new(&source, &dest).run().await;
    source.close().await;
    dest.close().await;

    let report = result.context("Migration aborted; run it again to finish the copy")?;
    output.print_migration(&report);
    Ok(())
}

/// The source must be an existing embedded database and the destination a
/// distributed connection string
fn check_endpoints(embedded: &str, distributed: &str) -> Result<()> {
    if Dialect::from_connection_string(embedded) != Dialect::Embedded {
        bail!(
            "Source must be an embedded store path, got '{}'",
            redact(embedded)
        );
    }
    if !Path::new(embedded).exists() {
        bail!("Source store not found: {}", embedded);
    }
    if Dialect::from_connection_string(distributed) != Dialect::Distributed {
        bail!(
            "Destination must be a postgres:// connection string, got '{}'",
            distributed
        );
    }
    Ok(())
}
