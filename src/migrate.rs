//! Database schema migrations (idempotent).
//!
//! - `products`: one row per barcode. `categorie` keeps the joined category
//!   string for substring filtering; timestamps are Unix milliseconds.
//! - `product_tags`: categories and labels split once at ingestion, one row
//!   per tag with its position in the list.

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            barcode TEXT PRIMARY KEY,
            nom TEXT NOT NULL DEFAULT '',
            marque TEXT NOT NULL DEFAULT '',
            categorie TEXT NOT NULL DEFAULT '',
            nutriscore TEXT,
            source_url TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_tags (
            barcode TEXT NOT NULL,
            kind TEXT NOT NULL,
            position INTEGER NOT NULL,
            tag TEXT NOT NULL,
            PRIMARY KEY (barcode, kind, position),
            FOREIGN KEY (barcode) REFERENCES products(barcode) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_nom ON products(nom)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_created_at ON products(created_at DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_nutriscore ON products(nutriscore)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_product_tags_kind_tag ON product_tags(kind, tag)")
        .execute(pool)
        .await?;

    Ok(())
}
