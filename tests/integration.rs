use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const PRODUCTS: &str = r#"[
  {"barcode": "1", "nom": "Choco Bar", "marque": "Acme", "categorie": "Snacks, Sweet",
   "nutriscore": "d", "labels": "Fair trade", "source_url": "https://example.org/1"},
  {"barcode": "2", "nom": "Green Tea", "marque": "Leaf", "categorie": "Drinks",
   "nutriscore": "A", "labels": "Bio|Vegan"},
  {"barcode": "3", "nom": "Salted Chips", "marque": "Acme", "categorie": "Snacks",
   "nutriscore": ""},
  {"nom": "No barcode", "marque": "Ghost"}
]"#;

fn foodcat_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("foodcat");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    fs::write(root.join("products.json"), PRODUCTS).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/foodcat.sqlite"

[server]
bind = "127.0.0.1:0"
"#,
        root.display()
    );

    let config_path = config_dir.join("foodcat.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_foodcat(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = foodcat_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("FOODCAT_DB_PATH")
        .env_remove("FOODCAT_BIND")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run foodcat binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn import_fixture(tmp: &TempDir, config_path: &Path) -> String {
    let file = tmp.path().join("products.json");
    let (stdout, stderr, success) = run_foodcat(config_path, &["import", file.to_str().unwrap()]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_foodcat(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/foodcat.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_foodcat(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_foodcat(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_import_reports_counts() {
    let (tmp, config_path) = setup_test_env();

    let stdout = import_fixture(&tmp, &config_path);
    assert!(stdout.contains("records read: 4"));
    assert!(stdout.contains("inserted: 3"));
    assert!(stdout.contains("skipped: 1"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_reimport_updates_without_duplicates() {
    let (tmp, config_path) = setup_test_env();

    import_fixture(&tmp, &config_path);
    let stdout = import_fixture(&tmp, &config_path);
    assert!(stdout.contains("inserted: 0"));
    assert!(stdout.contains("updated: 3"));

    let (stdout, _, success) = run_foodcat(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Products:    3"));
}

#[test]
fn test_get_product() {
    let (tmp, config_path) = setup_test_env();
    import_fixture(&tmp, &config_path);

    let (stdout, stderr, success) = run_foodcat(&config_path, &["get", "2"]);
    assert!(success, "get failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Green Tea"));
    assert!(stdout.contains("nutriscore: A"));
    assert!(stdout.contains("labels:     Bio, Vegan"));
}

#[test]
fn test_get_missing_product_fails() {
    let (tmp, config_path) = setup_test_env();
    import_fixture(&tmp, &config_path);

    let (_, stderr, success) = run_foodcat(&config_path, &["get", "999"]);
    assert!(!success, "get of an unknown barcode should fail");
    assert!(stderr.contains("product not found: 999"));
}

#[test]
fn test_stats_output() {
    let (tmp, config_path) = setup_test_env();
    import_fixture(&tmp, &config_path);

    let (stdout, stderr, success) = run_foodcat(&config_path, &["stats", "--top", "2"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Products:    3"));
    assert!(stdout.contains("UNKNOWN"));
    assert!(stdout.contains("Top 2 categories"));
    assert!(stdout.contains("Snacks"));
}

#[test]
fn test_export_to_stdout_and_file() {
    let (tmp, config_path) = setup_test_env();
    import_fixture(&tmp, &config_path);

    let (stdout, _, success) = run_foodcat(&config_path, &["export"]);
    assert!(success);
    let exported: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let items = exported.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["barcode"], "1");
    assert_eq!(items[0]["categorie"], "Snacks, Sweet");
    assert!(items[2]["nutriscore"].is_null());

    let out = tmp.path().join("out/products.json");
    let (_, _, success) = run_foodcat(&config_path, &["export", "--output", out.to_str().unwrap()]);
    assert!(success);
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written, exported);
}

#[test]
fn test_exported_file_reimports() {
    let (tmp, config_path) = setup_test_env();
    import_fixture(&tmp, &config_path);

    let out = tmp.path().join("dump.json");
    run_foodcat(&config_path, &["export", "--output", out.to_str().unwrap()]);

    let (stdout, stderr, success) = run_foodcat(&config_path, &["import", out.to_str().unwrap()]);
    assert!(success, "reimport failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("updated: 3"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_foodcat(&missing, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
