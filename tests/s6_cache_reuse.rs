use astcache::cache::AstCache;
use astcache::config::IndexingConfig;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn config() -> IndexingConfig {
    IndexingConfig {
        max_workers: 2,
        include: vec![],
        exclude: vec![],
        no_cache: false,
        cache_ttl_secs: 0,
        file_timeout_ms: None,
    }
}

#[test]
fn second_analyze_reuses_cache_until_mtime_advances() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let file = root.join("main.go");
    fs::write(&file, "package main\nfunc main() {}\n").unwrap();

    let cache = Arc::new(AstCache::new());
    let first = astcache::coordinator::analyze(&cache, root, &config()).unwrap();
    assert_eq!(first.extracted, 1);
    assert!(astcache::diagnostics::cache_stats(&cache).total_nodes > 0);

    let second = astcache::coordinator::analyze(&cache, root, &config()).unwrap();
    assert_eq!(second.extracted, 0);
    assert_eq!(second.cached, 1);

    let future = SystemTime::now() + Duration::from_secs(5);
    fs::File::options().write(true).open(&file).unwrap().set_modified(future).unwrap();

    let third = astcache::coordinator::analyze(&cache, root, &config()).unwrap();
    assert_eq!(third.extracted, 1);
    assert_eq!(third.cached, 0);
}
