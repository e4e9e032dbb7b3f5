//! Catalog statistics overview.
//!
//! Prints record count, grade distribution and the top categories, the same
//! aggregates the API exposes under `/api/stats`, with simple text bars.

use anyhow::Result;

use crate::config::Config;
use crate::query::ProductFilter;
use crate::sqlite_store::SqliteStore;
use crate::store::{CatalogStore, CategoryCount, GradeCount};

const BAR_WIDTH: usize = 30;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config, top: Option<i64>) -> Result<()> {
    let top = top.filter(|t| *t >= 1).unwrap_or(config.api.default_top);

    let store = SqliteStore::open(config).await?;
    let result = collect(&store, top).await;
    store.close().await;
    let (total, grades, categories) = result?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Food Catalog Stats");
    println!("====================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Products:    {}", total);
    println!();
    print!("{}", render_grades(&grades, total));
    println!();
    print!("{}", render_categories(&categories, top));
    println!();

    Ok(())
}

async fn collect(
    store: &dyn CatalogStore,
    top: i64,
) -> Result<(i64, Vec<GradeCount>, Vec<CategoryCount>)> {
    let total = store.count_products(&ProductFilter::default()).await?;
    let grades = store.grade_distribution().await?;
    let categories = store.category_distribution(top).await?;
    Ok((total, grades, categories))
}

fn bar(count: i64, max: i64) -> String {
    if max <= 0 {
        return String::new();
    }
    let width = ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(width.max(1))
}

fn render_grades(grades: &[GradeCount], total: i64) -> String {
    let mut out = String::from("  By nutriscore:\n");
    if grades.is_empty() {
        out.push_str("  (no products)\n");
        return out;
    }
    let max = grades.iter().map(|g| g.count).max().unwrap_or(0);
    for g in grades {
        let pct = if total > 0 { (g.count * 100) / total } else { 0 };
        out.push_str(&format!(
            "  {:<8} {:>6} {:>4}%  {}\n",
            g.nutriscore,
            g.count,
            pct,
            bar(g.count, max)
        ));
    }
    out
}

fn render_categories(categories: &[CategoryCount], top: i64) -> String {
    let mut out = format!("  Top {} categories:\n", top);
    if categories.is_empty() {
        out.push_str("  (no categories)\n");
        return out;
    }
    let max = categories.iter().map(|c| c.count).max().unwrap_or(0);
    for c in categories {
        out.push_str(&format!(
            "  {:<32} {:>6}  {}\n",
            c.category,
            c.count,
            bar(c.count, max)
        ));
    }
    out
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
