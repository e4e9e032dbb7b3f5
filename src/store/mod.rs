//! Storage abstraction for the product catalog.
//!
//! The [`CatalogStore`] trait defines every operation the Query Service,
//! the ingestion command and the CLI need, so handlers receive the store as
//! an explicit dependency instead of reaching for a global connection.
//!
//! | Backend | Module | Use |
//! |---------|--------|-----|
//! | SQLite | [`crate::sqlite_store`] | production |
//! | In-memory | [`memory`] | tests, embedding |
//!
//! Implementations must be `Send + Sync` to be shared across handlers.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{NewProduct, Product};
use crate::query::{ProductFilter, SortOrder};

/// Bucket used for products without a nutrition grade.
pub const UNKNOWN_GRADE: &str = "UNKNOWN";

/// One row of the grade distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCount {
    pub nutriscore: String,
    pub count: i64,
}

/// One row of the category tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Whether an upsert created a new record or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Abstract product store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_products`](CatalogStore::find_products) | One page of filtered, sorted products |
/// | [`count_products`](CatalogStore::count_products) | Count over the same filter |
/// | [`grade_distribution`](CatalogStore::grade_distribution) | Products per grade, `UNKNOWN` for missing |
/// | [`category_distribution`](CatalogStore::category_distribution) | Top-N category tally |
/// | [`get_product`](CatalogStore::get_product) | Lookup by barcode |
/// | [`all_products`](CatalogStore::all_products) | Full dump, ordered by barcode |
/// | [`upsert_product`](CatalogStore::upsert_product) | Ingestion write path |
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Return at most `limit` products matching `filter`, skipping the first
    /// `skip` in `sort` order. Ties are broken by ascending barcode.
    async fn find_products(
        &self,
        filter: &ProductFilter,
        sort: SortOrder,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Product>>;

    async fn count_products(&self, filter: &ProductFilter) -> Result<i64>;

    /// Count products per grade, ordered by grade label ascending.
    async fn grade_distribution(&self) -> Result<Vec<GradeCount>>;

    /// Tally category tags across all products and return the `top` most
    /// frequent, by descending count then ascending category name.
    async fn category_distribution(&self, top: i64) -> Result<Vec<CategoryCount>>;

    async fn get_product(&self, barcode: &str) -> Result<Option<Product>>;

    async fn all_products(&self) -> Result<Vec<Product>>;

    /// Insert or replace a product keyed by barcode. The creation timestamp
    /// of an existing record is preserved.
    async fn upsert_product(&self, product: &NewProduct) -> Result<UpsertOutcome>;

    /// Release any held resources. The default does nothing.
    async fn close(&self) {}
}
