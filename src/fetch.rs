//! Remote product fetch from OpenFoodFacts (`foodcat fetch`).
//!
//! Each barcode is requested from the product API
//! (`{base_url}/api/v2/product/{barcode}.json`), mapped to a
//! [`ProductRecord`] and ingested through the same cleaning and upsert path
//! as file imports.
//!
//! # Retries
//!
//! Transport errors, `429` and `5xx` answers are retried up to
//! `[fetch].retries` times, waiting `backoff_ms * attempt` between tries.
//! A `404` or a body with `status: 0` means the product does not exist and
//! is not retried. A product that still fails after the last retry is
//! counted and skipped; the run continues with the next barcode.

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{Config, FetchConfig};
use crate::ingest::{self, ImportSummary};
use crate::models::{Grade, ProductRecord};
use crate::sqlite_store::SqliteStore;
use crate::store::CatalogStore;

#[derive(Debug, Deserialize)]
struct ProductResponse {
    #[serde(default)]
    status: i64,
    product: Option<RemoteProduct>,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    categories: Option<String>,
    #[serde(default)]
    nutriscore_grade: Option<String>,
    #[serde(default)]
    labels: Option<String>,
}

impl RemoteProduct {
    fn into_record(self, barcode: &str, source_url: String) -> ProductRecord {
        // The API reports "unknown" or "not-applicable" for ungraded products.
        let nutriscore = self
            .nutriscore_grade
            .as_deref()
            .and_then(Grade::parse_lenient)
            .map(|g| g.as_str().to_string())
            .unwrap_or_default();

        ProductRecord {
            barcode: barcode.to_string(),
            nom: self.product_name.unwrap_or_default(),
            marque: self.brands.unwrap_or_default(),
            categorie: self.categories.unwrap_or_default(),
            nutriscore,
            labels: self.labels.unwrap_or_default(),
            source_url,
        }
    }
}

/// Counters reported at the end of a fetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub requested: usize,
    pub not_found: usize,
    pub failed: usize,
    pub ingested: ImportSummary,
}

/// HTTP client for the remote product source.
pub struct ProductFetcher {
    http: reqwest::Client,
    base: Url,
    retries: u32,
    backoff: Duration,
    delay: Duration,
}

impl ProductFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("foodcat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base = Url::parse(config.base_url.trim_end_matches('/'))?;
        if base.cannot_be_a_base() {
            bail!("fetch.base_url cannot hold a path: {}", config.base_url);
        }

        Ok(Self {
            http,
            base,
            retries: config.retries,
            backoff: Duration::from_millis(config.backoff_ms),
            delay: Duration::from_millis(config.delay_ms),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("fetch.base_url cannot hold a path: {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Human-facing product page, stored as `source_url`.
    pub fn page_url(&self, barcode: &str) -> Result<Url> {
        self.url(&["product", barcode])
    }

    fn api_url(&self, barcode: &str) -> Result<Url> {
        self.url(&["api", "v2", "product", format!("{}.json", barcode).as_str()])
    }

    /// GET with bounded retry. `Ok(None)` on 404.
    async fn get_with_retry(&self, url: Url) -> Result<Option<reqwest::Response>> {
        let mut last_err = anyhow!("no request made to {}", url);

        for attempt in 0..=self.retries {
            if attempt > 0 {
                tokio::time::sleep(self.backoff * attempt).await;
            }

            match self.http.get(url.clone()).send().await {
                Ok(resp) if resp.status() == StatusCode::NOT_FOUND => return Ok(None),
                Ok(resp) if resp.status().is_success() => return Ok(Some(resp)),
                Ok(resp) => {
                    let status = resp.status();
                    if !(status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS) {
                        bail!("{} answered {}", url, status);
                    }
                    last_err = anyhow!("{} answered {}", url, status);
                }
                Err(e) => last_err = anyhow!("request to {} failed: {}", url, e),
            }
            debug!("attempt {}/{}: {}", attempt + 1, self.retries + 1, last_err);
        }

        Err(last_err)
    }

    /// Fetch one product. `Ok(None)` when the source does not know it.
    pub async fn fetch_product(&self, barcode: &str) -> Result<Option<ProductRecord>> {
        let resp = match self.get_with_retry(self.api_url(barcode)?).await? {
            Some(resp) => resp,
            None => return Ok(None),
        };

        let body: ProductResponse = resp.json().await?;
        match body.product {
            Some(product) if body.status != 0 => {
                let source_url = self.page_url(barcode)?.to_string();
                Ok(Some(product.into_record(barcode, source_url)))
            }
            _ => Ok(None),
        }
    }
}

/// Fetch and upsert each barcode in order.
///
/// Missing products and products that keep failing are counted and
/// skipped; only store failures abort the run.
pub async fn fetch_products(
    fetcher: &ProductFetcher,
    store: &dyn CatalogStore,
    barcodes: &[String],
) -> Result<FetchSummary> {
    let total = barcodes.len();
    let mut summary = FetchSummary {
        requested: total,
        ..FetchSummary::default()
    };

    for (i, barcode) in barcodes.iter().enumerate() {
        let position = i + 1;
        if i > 0 && !fetcher.delay.is_zero() {
            tokio::time::sleep(fetcher.delay).await;
        }

        match fetcher.fetch_product(barcode).await {
            Ok(Some(record)) => {
                summary.ingested.read += 1;
                ingest::ingest_record(store, record, position, total, &mut summary.ingested)
                    .await?;
            }
            Ok(None) => {
                warn!("[{}/{}] {}: not found", position, total, barcode);
                summary.not_found += 1;
            }
            Err(e) => {
                warn!("[{}/{}] {}: {:#}", position, total, barcode, e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

/// CLI entry point for `foodcat fetch <barcode>...`.
pub async fn run_fetch(config: &Config, barcodes: &[String]) -> Result<()> {
    let fetcher = ProductFetcher::new(&config.fetch)?;
    info!("Fetching {} products from {}", barcodes.len(), fetcher.base);

    let store = SqliteStore::open(config).await?;
    let result = fetch_products(&fetcher, &store, barcodes).await;
    store.close().await;
    let summary = result?;

    println!("fetch {}", fetcher.base);
    println!("  requested: {}", summary.requested);
    println!("  not found: {}", summary.not_found);
    println!("  failed: {}", summary.failed);
    println!("  inserted: {}", summary.ingested.inserted);
    println!("  updated: {}", summary.ingested.updated);
    println!("ok");

    Ok(())
}
