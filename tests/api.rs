//! HTTP-level tests for the query API and its client.
//!
//! Each test starts the router on an ephemeral port in a background task and
//! talks to it over real HTTP with reqwest.

use std::sync::Arc;

use food_catalog::catalog::ProductPage;
use food_catalog::client::CatalogClient;
use food_catalog::config::{ApiConfig, Config};
use food_catalog::ingest;
use food_catalog::query::{ListParams, ParamPolicy};
use food_catalog::server::{self, AppState};
use food_catalog::sqlite_store::SqliteStore;
use food_catalog::store::memory::InMemoryStore;
use food_catalog::store::{CatalogStore, CategoryCount, GradeCount};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

const SCENARIO: &str = r#"[
  {"barcode": "1", "nom": "Chips", "marque": "Acme", "categorie": "Snacks, Salty", "nutriscore": "D"},
  {"barcode": "2", "nom": "Apple", "marque": "Farm", "categorie": "Fruits", "nutriscore": "A"},
  {"barcode": "3", "nom": "Cookies", "marque": "Acme", "categorie": "Snacks, Sweet", "nutriscore": ""}
]"#;

// ─── Helpers ────────────────────────────────────────────────────────

struct TestServer {
    base: String,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn seed(store: &dyn CatalogStore, records: &str) {
    let records = ingest::parse_records(records).unwrap();
    ingest::import_records(store, records).await.unwrap();
}

async fn start_server(store: Arc<dyn CatalogStore>, api: ApiConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let state = AppState::new(store, api);
    let handle = tokio::spawn(async move {
        let _ = server::serve(listener, state, std::future::pending()).await;
    });

    wait_for_server(port).await;
    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        handle,
    }
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/api/health", port);
    for _ in 0..50 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn scenario_server() -> TestServer {
    let store = InMemoryStore::new();
    seed(&store, SCENARIO).await;
    start_server(Arc::new(store), ApiConfig::default()).await
}

async fn many_products_server(n: usize) -> TestServer {
    let records: Vec<Value> = (1..=n)
        .map(|i| {
            serde_json::json!({
                "barcode": format!("{i:04}"),
                "nom": format!("Item {i:04}"),
                "marque": if i % 3 == 0 { "Trio" } else { "Other" },
                "categorie": "Bulk",
                "nutriscore": (["A", "B", "C", "D", "E"][i % 5]),
            })
        })
        .collect();
    let store = InMemoryStore::new();
    seed(&store, &serde_json::to_string(&records).unwrap()).await;
    start_server(Arc::new(store), ApiConfig::default()).await
}

async fn get_json(url: &str) -> (reqwest::StatusCode, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status();
    let body: Value = resp.json().await.unwrap();
    (status, body)
}

fn barcodes(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["barcode"].as_str().unwrap().to_string())
        .collect()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let srv = scenario_server().await;
    let (status, body) = get_json(&format!("{}/api/health", srv.base)).await;
    assert_eq!(status, 200);
    assert_eq!(body, serde_json::json!({ "ok": true }));
}

#[tokio::test]
async fn test_brand_filter_scenario() {
    let srv = scenario_server().await;
    let (status, body) = get_json(&format!("{}/api/products?brand=Acme", srv.base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 20);

    let mut codes = barcodes(&body);
    codes.sort();
    assert_eq!(codes, vec!["1", "3"]);
}

#[tokio::test]
async fn test_nutriscore_stats_scenario() {
    let srv = scenario_server().await;
    let (status, body) = get_json(&format!("{}/api/stats/nutriscore", srv.base)).await;
    assert_eq!(status, 200);
    let stats: Vec<GradeCount> = serde_json::from_value(body).unwrap();
    let pairs: Vec<(&str, i64)> = stats.iter().map(|g| (g.nutriscore.as_str(), g.count)).collect();
    assert_eq!(pairs, vec![("A", 1), ("D", 1), ("UNKNOWN", 1)]);
}

#[tokio::test]
async fn test_category_stats_scenario() {
    let srv = scenario_server().await;
    let (status, body) = get_json(&format!("{}/api/stats/categories?top=2", srv.base)).await;
    assert_eq!(status, 200);
    let stats: Vec<CategoryCount> = serde_json::from_value(body).unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].category, "Snacks");
    assert_eq!(stats[0].count, 2);
    assert_eq!(stats[1].category, "Fruits");
    assert_eq!(stats[1].count, 1);
}

#[tokio::test]
async fn test_category_stats_default_top() {
    let srv = many_products_server(3).await;
    let (_, body) = get_json(&format!("{}/api/stats/categories?top=abc", srv.base)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["category"], "Bulk");
    assert_eq!(body[0]["count"], 3);
}

const ODD_CATEGORIES: &str = r#"[
  {"barcode": "1", "nom": "Chips", "categorie": "Snacks|Salty"},
  {"barcode": "2", "nom": "Mix", "categorie": "Fruits,Vegetables"},
  {"barcode": "3", "nom": "Double", "categorie": "Snacks, Snacks"}
]"#;

async fn assert_category_tokens(srv: &TestServer) {
    let (_, body) = get_json(&format!("{}/api/stats/categories", srv.base)).await;
    assert_eq!(
        body,
        serde_json::json!([
            { "category": "Snacks", "count": 2 },
            { "category": "Fruits,Vegetables", "count": 1 },
            { "category": "Snacks|Salty", "count": 1 }
        ])
    );

    let (_, body) = get_json(&format!("{}/api/products/1", srv.base)).await;
    assert_eq!(body["categorie"], "Snacks|Salty");
    let (_, body) = get_json(&format!("{}/api/products/3", srv.base)).await;
    assert_eq!(body["categorie"], "Snacks, Snacks");
}

#[tokio::test]
async fn test_categories_split_on_comma_space_only() {
    let store = InMemoryStore::new();
    seed(&store, ODD_CATEGORIES).await;
    let srv = start_server(Arc::new(store), ApiConfig::default()).await;
    assert_category_tokens(&srv).await;

    let tmp = TempDir::new().unwrap();
    let mut config = Config::minimal();
    config.db.path = tmp.path().join("tokens.sqlite");
    let store = SqliteStore::open(&config).await.unwrap();
    seed(&store, ODD_CATEGORIES).await;
    let srv = start_server(Arc::new(store), ApiConfig::default()).await;
    assert_category_tokens(&srv).await;
}

#[tokio::test]
async fn test_product_wire_shape() {
    let srv = scenario_server().await;
    let (status, body) = get_json(&format!("{}/api/products/1", srv.base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["nom"], "Chips");
    assert_eq!(body["marque"], "Acme");
    assert_eq!(body["categorie"], "Snacks, Salty");
    assert_eq!(body["nutriscore"], "D");
    assert!(body["createdAt"].is_string());
    assert!(body["updatedAt"].is_string());

    let (_, body) = get_json(&format!("{}/api/products/3", srv.base)).await;
    assert!(body["nutriscore"].is_null());
}

#[tokio::test]
async fn test_unknown_barcode_is_404() {
    let srv = scenario_server().await;
    let (status, body) = get_json(&format!("{}/api/products/nope", srv.base)).await;
    assert_eq!(status, 404);
    assert_eq!(body, serde_json::json!({ "error": "Not found" }));
}

#[tokio::test]
async fn test_page_never_exceeds_limit() {
    let srv = many_products_server(25).await;
    for (page, expected) in [(1, 10), (2, 10), (3, 5), (4, 0)] {
        let (_, body) = get_json(&format!(
            "{}/api/products?limit=10&page={}",
            srv.base, page
        ))
        .await;
        assert_eq!(barcodes(&body).len(), expected, "page {}", page);
        assert_eq!(body["total"], 25);
    }
}

#[tokio::test]
async fn test_pages_are_contiguous_in_name_order() {
    let srv = many_products_server(12).await;
    let (_, first) = get_json(&format!("{}/api/products?limit=5&page=1", srv.base)).await;
    let (_, second) = get_json(&format!("{}/api/products?limit=5&page=2", srv.base)).await;
    assert_eq!(barcodes(&first), vec!["0001", "0002", "0003", "0004", "0005"]);
    assert_eq!(barcodes(&second), vec!["0006", "0007", "0008", "0009", "0010"]);
}

#[tokio::test]
async fn test_total_ignores_paging() {
    let srv = many_products_server(30).await;
    let (_, a) = get_json(&format!("{}/api/products?brand=trio&limit=2&page=1", srv.base)).await;
    let (_, b) = get_json(&format!("{}/api/products?brand=trio&limit=7&page=3", srv.base)).await;
    assert_eq!(a["total"], 10);
    assert_eq!(b["total"], 10);
}

#[tokio::test]
async fn test_grade_filter_ignores_case() {
    let srv = many_products_server(20).await;
    let (_, lower) = get_json(&format!("{}/api/products?nutri=a", srv.base)).await;
    let (_, upper) = get_json(&format!("{}/api/products?nutri=A", srv.base)).await;
    assert_eq!(lower["data"], upper["data"]);
    assert_eq!(lower["total"], 4);
}

#[tokio::test]
async fn test_newest_sort() {
    let srv = many_products_server(5).await;
    let (_, body) = get_json(&format!("{}/api/products?sort=recent", srv.base)).await;
    assert_eq!(barcodes(&body), vec!["0005", "0004", "0003", "0002", "0001"]);
}

#[tokio::test]
async fn test_lenient_params_fall_back() {
    let srv = many_products_server(3).await;
    let (status, body) =
        get_json(&format!("{}/api/products?page=abc&limit=-3", srv.base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 1);
    assert_eq!(barcodes(&body).len(), 1);
}

#[tokio::test]
async fn test_extreme_paging_values() {
    let srv = many_products_server(5).await;

    let (status, body) = get_json(&format!(
        "{}/api/products?page=9223372036854775807&limit=2",
        srv.base
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["page"], serde_json::json!(i64::MAX));
    assert_eq!(body["total"], 5);
    assert!(barcodes(&body).is_empty());

    let (status, body) =
        get_json(&format!("{}/api/products?limit=9223372036854775807", srv.base)).await;
    assert_eq!(status, 200);
    assert_eq!(barcodes(&body).len(), 5);
}

#[tokio::test]
async fn test_extreme_paging_values_sqlite() {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::minimal();
    config.db.path = tmp.path().join("paging.sqlite");
    let store = SqliteStore::open(&config).await.unwrap();
    seed(&store, SCENARIO).await;
    let srv = start_server(Arc::new(store), ApiConfig::default()).await;

    let (status, body) = get_json(&format!(
        "{}/api/products?page=9223372036854775807&limit=2",
        srv.base
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 3);
    assert!(barcodes(&body).is_empty());
}

#[tokio::test]
async fn test_strict_params_reject() {
    let store = InMemoryStore::new();
    seed(&store, SCENARIO).await;
    let api = ApiConfig {
        param_policy: ParamPolicy::Strict,
        ..ApiConfig::default()
    };
    let srv = start_server(Arc::new(store), api).await;

    let (status, body) = get_json(&format!("{}/api/products?page=abc", srv.base)).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("page"));

    let (status, _) = get_json(&format!("{}/api/stats/categories?top=0", srv.base)).await;
    assert_eq!(status, 400);

    let (status, body) = get_json(&format!(
        "{}/api/products?page=9223372036854775807&limit=2",
        srv.base
    ))
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("too large"));

    let (status, _) = get_json(&format!("{}/api/products?page=1&limit=2", srv.base)).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let srv = scenario_server().await;
    let resp = reqwest::Client::new()
        .get(format!("{}/api/health", srv.base))
        .header("Origin", "http://elsewhere.example")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_sqlite_backend_scenario() {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::minimal();
    config.db.path = tmp.path().join("api.sqlite");
    let store = SqliteStore::open(&config).await.unwrap();
    seed(&store, SCENARIO).await;
    let srv = start_server(Arc::new(store), ApiConfig::default()).await;

    let (_, body) = get_json(&format!("{}/api/products?brand=acme&sort=name", srv.base)).await;
    assert_eq!(barcodes(&body), vec!["1", "3"]);

    let (_, body) = get_json(&format!("{}/api/products?q=sweet", srv.base)).await;
    assert_eq!(barcodes(&body), vec!["3"]);

    let (_, body) = get_json(&format!("{}/api/stats/nutriscore", srv.base)).await;
    assert_eq!(
        body,
        serde_json::json!([
            { "nutriscore": "A", "count": 1 },
            { "nutriscore": "D", "count": 1 },
            { "nutriscore": "UNKNOWN", "count": 1 }
        ])
    );

    let (_, body) = get_json(&format!("{}/api/stats/categories?top=2", srv.base)).await;
    assert_eq!(
        body,
        serde_json::json!([
            { "category": "Snacks", "count": 2 },
            { "category": "Fruits", "count": 1 }
        ])
    );
}

#[tokio::test]
async fn test_client_roundtrip() {
    let srv = scenario_server().await;
    let client = CatalogClient::new(&format!("{}/", srv.base));

    assert!(client.health().await.unwrap());

    let params = ListParams {
        category: Some("snacks".into()),
        limit: Some("1".into()),
        ..ListParams::default()
    };
    let page: ProductPage = client.list_products(&params).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.data[0].name, "Chips");
    assert_eq!(page.data[0].categories, vec!["Snacks", "Salty"]);

    let product = client.get_product("2").await.unwrap().unwrap();
    assert_eq!(product.brand, "Farm");
    assert!(client.get_product("404").await.unwrap().is_none());

    let grades = client.nutriscore_stats().await.unwrap();
    assert_eq!(grades.len(), 3);
    let cats = client.category_stats(1).await.unwrap();
    assert_eq!(cats[0].category, "Snacks");
}

#[tokio::test]
async fn test_client_escapes_barcode_in_path() {
    let store = InMemoryStore::new();
    seed(
        &store,
        r#"[{"barcode": "1", "nom": "Plain"}, {"barcode": "A/B", "nom": "Slashed"}]"#,
    )
    .await;
    let srv = start_server(Arc::new(store), ApiConfig::default()).await;
    let client = CatalogClient::new(&srv.base);

    let slashed = client.get_product("A/B").await.unwrap().unwrap();
    assert_eq!(slashed.name, "Slashed");
    assert!(client.get_product("1?x").await.unwrap().is_none());
    assert!(client.get_product("1#x").await.unwrap().is_none());
}

#[tokio::test]
async fn test_client_surfaces_error_body() {
    let store = InMemoryStore::new();
    let api = ApiConfig {
        param_policy: ParamPolicy::Strict,
        ..ApiConfig::default()
    };
    let srv = start_server(Arc::new(store), api).await;
    let client = CatalogClient::new(&srv.base);

    let params = ListParams {
        limit: Some("zero".into()),
        ..ListParams::default()
    };
    let err = client.list_products(&params).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("400"), "{msg}");
    assert!(msg.contains("limit"), "{msg}");
}
