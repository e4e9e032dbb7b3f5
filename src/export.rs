//! Export the catalog as JSON.
//!
//! The output is a JSON array in the same shape the API serves, so it can be
//! fed back to `foodcat import`.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::store::CatalogStore;

/// Export all products ordered by barcode.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let products = store.all_products().await;
    store.close().await;
    let products = products?;

    let json = serde_json::to_string_pretty(&products)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            info!("Exported {} products to {}", products.len(), path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}
