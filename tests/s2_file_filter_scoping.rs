use astcache::cache::AstCache;
use astcache::config::IndexingConfig;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn analyze_respects_include_and_exclude_globs() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    fs::write(root.join("main.go"), "package main\nfunc main() {}\n").unwrap();
    fs::write(root.join("main_test.go"), "package main\nfunc TestMain(t *testing.T) {}\n").unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/handler.go"), "package src\nfunc Handle() {}\n").unwrap();
    fs::create_dir_all(root.join("vendor")).unwrap();
    fs::write(root.join("vendor/lib.go"), "package vendor\nfunc Lib() {}\n").unwrap();

    let config = IndexingConfig {
        max_workers: 2,
        include: vec!["*.go".to_string()],
        exclude: vec!["*_test.go".to_string(), "vendor/**".to_string()],
        no_cache: false,
        cache_ttl_secs: 0,
        file_timeout_ms: None,
    };

    let cache = Arc::new(AstCache::new());
    let summary = astcache::coordinator::analyze(&cache, root, &config).unwrap();
    assert_eq!(summary.extracted, 2, "expected only main.go and src/handler.go");
    assert!(summary.errors.is_empty());

    let files: Vec<_> = cache.all_nodes().into_iter().map(|n| n.file_path).collect();
    assert!(files.iter().any(|f| f.ends_with("main.go")));
    assert!(files.iter().any(|f| f.ends_with("handler.go")));
    assert!(!files.iter().any(|f| f.ends_with("main_test.go")));
    assert!(!files.iter().any(|f| f.ends_with("lib.go")));
}
