//! HTTP client for the Query Service, used by the terminal browser.

use anyhow::{anyhow, bail, Result};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::catalog::ProductPage;
use crate::models::Product;
use crate::query::ListParams;
use crate::store::{CategoryCount, GradeCount};

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Thin typed wrapper over the `/api` routes.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base: String,
}

impl CatalogClient {
    pub fn new(api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn list_products(&self, params: &ListParams) -> Result<ProductPage> {
        let resp = self
            .http
            .get(self.url("/api/products"))
            .query(params)
            .send()
            .await?;
        decode(resp).await
    }

    /// `/api/products/{barcode}` with the barcode escaped as one path segment.
    fn product_url(&self, barcode: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("api base cannot hold a path: {}", self.base))?
            .pop_if_empty()
            .extend(["api", "products", barcode]);
        Ok(url)
    }

    /// Look up one product; `Ok(None)` when the server answers 404.
    pub async fn get_product(&self, barcode: &str) -> Result<Option<Product>> {
        let resp = self.http.get(self.product_url(barcode)?).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(resp).await.map(Some)
    }

    pub async fn nutriscore_stats(&self) -> Result<Vec<GradeCount>> {
        let resp = self.http.get(self.url("/api/stats/nutriscore")).send().await?;
        decode(resp).await
    }

    pub async fn category_stats(&self, top: i64) -> Result<Vec<CategoryCount>> {
        let resp = self
            .http
            .get(self.url("/api/stats/categories"))
            .query(&[("top", top)])
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn health(&self) -> Result<bool> {
        #[derive(Deserialize)]
        struct Health {
            ok: bool,
        }
        let resp = self.http.get(self.url("/api/health")).send().await?;
        Ok(decode::<Health>(resp).await?.ok)
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        bail!("server returned {}: {}", status.as_u16(), message);
    }
    Ok(resp.json().await?)
}
