//! Product ingestion.
//!
//! Reads product records from a JSON array or a JSON-lines file, cleans
//! them and upserts them by barcode. Category and label strings are split
//! into tag lists here, once, so nothing downstream re-parses them.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{Grade, ProductRecord};
use crate::sqlite_store::SqliteStore;
use crate::store::{CatalogStore, UpsertOutcome};

/// Counters reported at the end of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub read: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Parse either a JSON array of records or one JSON object per line.
pub fn parse_records(content: &str) -> Result<Vec<ProductRecord>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse JSON array of products");
    }

    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: ProductRecord = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse product on line {}", i + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Clean and upsert `records`. Records without a barcode are skipped.
pub async fn import_records(
    store: &dyn CatalogStore,
    records: Vec<ProductRecord>,
) -> Result<ImportSummary> {
    let total = records.len();
    let mut summary = ImportSummary {
        read: total,
        ..ImportSummary::default()
    };

    for (i, record) in records.into_iter().enumerate() {
        ingest_record(store, record, i + 1, total, &mut summary).await?;
    }

    Ok(summary)
}

/// Clean and upsert one record, updating `summary` and logging
/// `[position/total] barcode: OK`. Shared by file import and remote fetch.
pub async fn ingest_record(
    store: &dyn CatalogStore,
    record: ProductRecord,
    position: usize,
    total: usize,
    summary: &mut ImportSummary,
) -> Result<()> {
    let raw_grade = record.nutriscore.trim().to_string();
    let product = match record.clean() {
        Some(p) => p,
        None => {
            warn!("[{}/{}] record without barcode, skipping", position, total);
            summary.skipped += 1;
            return Ok(());
        }
    };

    if !raw_grade.is_empty() && Grade::parse_lenient(&raw_grade).is_none() {
        warn!(
            "[{}/{}] {}: unrecognized nutriscore '{}', stored as unknown",
            position, total, product.barcode, raw_grade
        );
    }

    match store.upsert_product(&product).await? {
        UpsertOutcome::Inserted => summary.inserted += 1,
        UpsertOutcome::Updated => summary.updated += 1,
    }
    info!("[{}/{}] {}: OK", position, total, product.barcode);
    Ok(())
}

/// CLI entry point for `foodcat import <file>`.
pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    let records = parse_records(&content)?;

    let store = SqliteStore::open(config).await?;
    let result = import_records(&store, records).await;
    store.close().await;
    let summary = result?;

    println!("import {}", path.display());
    println!("  records read: {}", summary.read);
    println!("  inserted: {}", summary.inserted);
    println!("  updated: {}", summary.updated);
    println!("  skipped: {}", summary.skipped);
    println!("ok");

    Ok(())
}
