//! In-memory [`CatalogStore`] implementation for tests and embedding.
//!
//! Products live in a `BTreeMap` keyed by barcode behind a
//! `std::sync::RwLock`. Filtering, sorting and tallies are computed over a
//! full scan.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::{NewProduct, Product};
use crate::query::{ProductFilter, SortOrder};

use super::{CategoryCount, CatalogStore, GradeCount, UpsertOutcome, UNKNOWN_GRADE};

/// In-memory product store.
pub struct InMemoryStore {
    products: RwLock<BTreeMap<String, Product>>,
    clock: RwLock<DateTime<Utc>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            products: RwLock::new(BTreeMap::new()),
            clock: RwLock::new(Utc::now()),
        }
    }

    /// Build a store pre-populated with `products`, inserted in order.
    pub async fn with_products(products: impl IntoIterator<Item = NewProduct>) -> Result<Self> {
        let store = Self::new();
        for p in products {
            store.upsert_product(&p).await?;
        }
        Ok(store)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Product>>> {
        self.products
            .read()
            .map_err(|_| anyhow!("product store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Product>>> {
        self.products
            .write()
            .map_err(|_| anyhow!("product store lock poisoned"))
    }

    // Strictly increasing timestamps, so insertion order is preserved by
    // the newest-first sort even within one clock tick.
    fn tick(&self) -> Result<DateTime<Utc>> {
        let mut clock = self
            .clock
            .write()
            .map_err(|_| anyhow!("store clock lock poisoned"))?;
        let now = Utc::now();
        *clock = if now > *clock {
            now
        } else {
            *clock + Duration::milliseconds(1)
        };
        Ok(*clock)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_products(products: &mut [Product], sort: SortOrder) {
    match sort {
        SortOrder::Name => products.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.barcode.cmp(&b.barcode))
        }),
        SortOrder::Newest => products.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.barcode.cmp(&b.barcode))
        }),
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn find_products(
        &self,
        filter: &ProductFilter,
        sort: SortOrder,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Product>> {
        let mut matched: Vec<Product> = self
            .read()?
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        sort_products(&mut matched, sort);

        Ok(matched
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<i64> {
        Ok(self.read()?.values().filter(|p| filter.matches(p)).count() as i64)
    }

    async fn grade_distribution(&self) -> Result<Vec<GradeCount>> {
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for p in self.read()?.values() {
            let grade = p
                .nutriscore
                .map(|g| g.as_str().to_string())
                .unwrap_or_else(|| UNKNOWN_GRADE.to_string());
            *counts.entry(grade).or_insert(0) += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(nutriscore, count)| GradeCount { nutriscore, count })
            .collect())
    }

    async fn category_distribution(&self, top: i64) -> Result<Vec<CategoryCount>> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for p in self.read()?.values() {
            for category in &p.categories {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }

        let mut tally: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        tally.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        tally.truncate(top.max(0) as usize);
        Ok(tally)
    }

    async fn get_product(&self, barcode: &str) -> Result<Option<Product>> {
        Ok(self.read()?.get(barcode).cloned())
    }

    async fn all_products(&self) -> Result<Vec<Product>> {
        Ok(self.read()?.values().cloned().collect())
    }

    async fn upsert_product(&self, product: &NewProduct) -> Result<UpsertOutcome> {
        let now = self.tick()?;
        let mut products = self.write()?;
        let (created_at, outcome) = match products.get(&product.barcode) {
            Some(existing) => (existing.created_at, UpsertOutcome::Updated),
            None => (now, UpsertOutcome::Inserted),
        };
        products.insert(
            product.barcode.clone(),
            product.clone().into_product(created_at, now),
        );
        Ok(outcome)
    }
}
