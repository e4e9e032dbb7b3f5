//! Product lookup by barcode for `foodcat get`.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::models::Product;
use crate::sqlite_store::SqliteStore;
use crate::store::CatalogStore;

pub async fn run_get(config: &Config, barcode: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let product = store.get_product(barcode).await;
    store.close().await;

    match product? {
        Some(p) => print!("{}", describe(&p)),
        None => bail!("product not found: {}", barcode),
    }
    Ok(())
}

fn describe(p: &Product) -> String {
    let mut out = String::new();
    out.push_str("--- Product ---\n");
    out.push_str(&format!("barcode:    {}\n", p.barcode));
    out.push_str(&format!("name:       {}\n", p.name));
    out.push_str(&format!("brand:      {}\n", p.brand));
    out.push_str(&format!("categories: {}\n", p.category_string()));
    out.push_str(&format!(
        "nutriscore: {}\n",
        p.nutriscore.map(|g| g.as_str()).unwrap_or("unknown")
    ));
    out.push_str(&format!("labels:     {}\n", p.labels.join(", ")));
    if !p.source_url.is_empty() {
        out.push_str(&format!("source_url: {}\n", p.source_url));
    }
    out.push_str(&format!(
        "created_at: {}\n",
        p.created_at.format("%Y-%m-%dT%H:%M:%SZ")
    ));
    out.push_str(&format!(
        "updated_at: {}\n",
        p.updated_at.format("%Y-%m-%dT%H:%M:%SZ")
    ));
    out
}
