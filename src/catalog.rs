//! Catalog read operations shared by the HTTP server and the CLI.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::Product;
use crate::query::ProductQuery;
use crate::store::CatalogStore;

/// Response body of `GET /api/products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub data: Vec<Product>,
    /// Number of products matching the filter, across all pages.
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl ProductPage {
    pub fn total_pages(&self) -> i64 {
        total_pages(self.total, self.limit)
    }
}

/// `ceil(total / limit)`, never less than 1 so an empty result still has a page.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit < 1 {
        return 1;
    }
    (total / limit + i64::from(total % limit != 0)).max(1)
}

/// Fetch one page of products plus the total over the same filter.
///
/// The page and the count are two separate store queries and are not
/// atomic with respect to concurrent imports.
pub async fn list_products(store: &dyn CatalogStore, query: &ProductQuery) -> Result<ProductPage> {
    let data = store
        .find_products(&query.filter, query.sort, query.skip(), query.limit)
        .await?;
    let total = store.count_products(&query.filter).await?;

    Ok(ProductPage {
        data,
        total,
        page: query.page,
        limit: query.limit,
    })
}
