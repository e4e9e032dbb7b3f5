//! SQLite-backed [`CatalogStore`] implementation.
//!
//! Filters are assembled with [`QueryBuilder`] so every user-supplied value
//! is bound, never interpolated. Substring matching uses
//! `instr(lower(col), lower(?))`, which treats `%` and `_` literally;
//! note that SQLite's `lower()` only folds ASCII letters.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::{join_tags, Grade, NewProduct, Product, TagKind};
use crate::query::{ProductFilter, SortOrder};
use crate::store::{CatalogStore, CategoryCount, GradeCount, UpsertOutcome, UNKNOWN_GRADE};

const PRODUCT_COLUMNS: &str = "barcode, nom, marque, nutriscore, source_url, created_at, updated_at";

/// SQLite implementation of the [`CatalogStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Load category and label lists, keyed by barcode. `None` loads all.
    async fn load_tags(
        &self,
        barcodes: Option<&[String]>,
    ) -> Result<HashMap<String, (Vec<String>, Vec<String>)>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT barcode, kind, tag FROM product_tags");
        if let Some(codes) = barcodes {
            if codes.is_empty() {
                return Ok(HashMap::new());
            }
            qb.push(" WHERE barcode IN (");
            let mut separated = qb.separated(", ");
            for code in codes {
                separated.push_bind(code.clone());
            }
            separated.push_unseparated(")");
        }
        qb.push(" ORDER BY barcode, kind, position");

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut tags: HashMap<String, (Vec<String>, Vec<String>)> = HashMap::new();
        for row in &rows {
            let barcode: String = row.get("barcode");
            let kind: String = row.get("kind");
            let tag: String = row.get("tag");
            let entry = tags.entry(barcode).or_default();
            if kind == TagKind::Category.as_str() {
                entry.0.push(tag);
            } else if kind == TagKind::Label.as_str() {
                entry.1.push(tag);
            }
        }
        Ok(tags)
    }

    async fn hydrate(&self, rows: Vec<SqliteRow>, all: bool) -> Result<Vec<Product>> {
        let barcodes: Vec<String> = rows.iter().map(|r| r.get("barcode")).collect();
        let mut tags = if all {
            self.load_tags(None).await?
        } else {
            self.load_tags(Some(barcodes.as_slice())).await?
        };

        Ok(rows
            .iter()
            .map(|row| {
                let barcode: String = row.get("barcode");
                let (categories, labels) = tags.remove(&barcode).unwrap_or_default();
                let nutriscore: Option<String> = row.get("nutriscore");
                Product {
                    barcode,
                    name: row.get("nom"),
                    brand: row.get("marque"),
                    categories,
                    nutriscore: nutriscore.as_deref().and_then(Grade::parse_lenient),
                    labels,
                    source_url: row.get("source_url"),
                    created_at: from_millis(row.get("created_at")),
                    updated_at: from_millis(row.get("updated_at")),
                }
            })
            .collect())
    }
}

fn from_millis(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts).unwrap_or_default()
}

fn push_contains(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, needle: &str) {
    qb.push(format!("instr(lower({column}), lower("));
    qb.push_bind(needle.to_string());
    qb.push(")) > 0");
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(q) = &filter.q {
        qb.push(" AND (");
        push_contains(qb, "nom", q);
        qb.push(" OR ");
        push_contains(qb, "marque", q);
        qb.push(" OR ");
        push_contains(qb, "categorie", q);
        qb.push(")");
    }
    if let Some(grade) = &filter.nutriscore {
        qb.push(" AND nutriscore = ");
        qb.push_bind(grade.clone());
    }
    if let Some(brand) = &filter.brand {
        qb.push(" AND ");
        push_contains(qb, "marque", brand);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND ");
        push_contains(qb, "categorie", category);
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn find_products(
        &self,
        filter: &ProductFilter,
        sort: SortOrder,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Product>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filter(&mut qb, filter);
        qb.push(match sort {
            SortOrder::Name => " ORDER BY nom ASC, barcode ASC",
            SortOrder::Newest => " ORDER BY created_at DESC, barcode ASC",
        });
        qb.push(" LIMIT ");
        qb.push_bind(limit.max(0));
        qb.push(" OFFSET ");
        qb.push_bind(skip.max(0));

        let rows = qb.build().fetch_all(&self.pool).await?;
        debug!("find_products matched {} rows", rows.len());
        self.hydrate(rows, false).await
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<i64> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filter(&mut qb, filter);
        let total: i64 = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn grade_distribution(&self) -> Result<Vec<GradeCount>> {
        let rows = sqlx::query(
            r#"
            SELECT COALESCE(NULLIF(nutriscore, ''), ?) AS grade, COUNT(*) AS count
            FROM products
            GROUP BY grade
            ORDER BY grade ASC
            "#,
        )
        .bind(UNKNOWN_GRADE)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| GradeCount {
                nutriscore: row.get("grade"),
                count: row.get("count"),
            })
            .collect())
    }

    async fn category_distribution(&self, top: i64) -> Result<Vec<CategoryCount>> {
        let rows = sqlx::query(
            r#"
            SELECT tag, COUNT(*) AS count
            FROM product_tags
            WHERE kind = ? AND tag != ''
            GROUP BY tag
            ORDER BY count DESC, tag ASC
            LIMIT ?
            "#,
        )
        .bind(TagKind::Category.as_str())
        .bind(top.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CategoryCount {
                category: row.get("tag"),
                count: row.get("count"),
            })
            .collect())
    }

    async fn get_product(&self, barcode: &str) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?"
        ))
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row], false).await?.pop()),
            None => Ok(None),
        }
    }

    async fn all_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY barcode ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows, true).await
    }

    async fn upsert_product(&self, product: &NewProduct) -> Result<UpsertOutcome> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM products WHERE barcode = ?")
            .bind(&product.barcode)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO products (barcode, nom, marque, categorie, nutriscore, source_url,
                                  created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(barcode) DO UPDATE SET
                nom = excluded.nom,
                marque = excluded.marque,
                categorie = excluded.categorie,
                nutriscore = excluded.nutriscore,
                source_url = excluded.source_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(join_tags(&product.categories))
        .bind(product.nutriscore.map(|g| g.as_str()))
        .bind(&product.source_url)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM product_tags WHERE barcode = ?")
            .bind(&product.barcode)
            .execute(&mut *tx)
            .await?;

        let tag_lists = [
            (TagKind::Category, &product.categories),
            (TagKind::Label, &product.labels),
        ];
        for (kind, tags) in tag_lists {
            for (position, tag) in tags.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO product_tags (barcode, kind, position, tag) VALUES (?, ?, ?, ?)",
                )
                .bind(&product.barcode)
                .bind(kind.as_str())
                .bind(position as i64)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(if exists {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
