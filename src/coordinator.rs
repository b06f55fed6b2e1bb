//! The extraction coordinator: discover files, consult the cache, dispatch
//! the remainder to a bounded worker pool, and collect results.
//!
//! Grounded on the teacher's indexing pipeline shape (walk, filter, bounded
//! channel, fixed worker pool) generalized from a single-language indexer to
//! the five-language dispatch in [`crate::parsing`].

use crate::cache::AstCache;
use crate::config::IndexingConfig;
use crate::error::AstCacheError;
use crate::model::Language;
use crate::utils::mtime_to_utc;
use crossbeam_channel::{bounded, Sender};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

const BUILTIN_PRUNE: &[&str] = &[
    ".git",
    "vendor",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    "target",
    "dist",
    "build",
];

#[derive(Debug, Default, Clone)]
pub struct AnalysisSummary {
    pub extracted: usize,
    pub cached: usize,
    pub errors: Vec<(PathBuf, String)>,
}

impl AnalysisSummary {
    pub fn total_considered(&self) -> usize {
        self.extracted + self.cached + self.errors.len()
    }
}

struct WorkItem {
    path: PathBuf,
    language: Language,
    mtime: chrono::DateTime<chrono::Utc>,
}

/// Walks `root`, filters by include/exclude globs plus the built-in prune
/// list, gates each file against the cache's `needs_reanalysis`, and runs
/// the remainder through a fixed-size worker pool.
pub fn analyze(
    cache: &Arc<AstCache>,
    root: &Path,
    config: &IndexingConfig,
) -> Result<AnalysisSummary, AstCacheError> {
    run(cache, root, config, false)
}

/// Like [`analyze`] but ignores the cache's freshness check entirely,
/// re-extracting every discovered file.
pub fn rebuild(
    cache: &Arc<AstCache>,
    root: &Path,
    config: &IndexingConfig,
) -> Result<AnalysisSummary, AstCacheError> {
    run(cache, root, config, true)
}

fn run(
    cache: &Arc<AstCache>,
    root: &Path,
    config: &IndexingConfig,
    force: bool,
) -> Result<AnalysisSummary, AstCacheError> {
    let candidates = discover(root, config)?;

    let mut pending = Vec::new();
    let mut cached = 0usize;
    for path in candidates {
        let Some(language) = Language::from_path(&path) else {
            continue;
        };
        let mtime = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(m) => mtime_to_utc(m),
            Err(_) => continue,
        };
        if !force && !cache.needs_reanalysis(&path, mtime, config.cache_ttl_secs) {
            cached += 1;
            continue;
        }
        pending.push(WorkItem { path, language, mtime });
    }

    let worker_count = config.max_workers.max(1).min(pending.len().max(1));
    let (tx, rx) = bounded::<WorkItem>(worker_count * 4);
    let (result_tx, result_rx) = bounded::<(PathBuf, Result<usize, String>)>(worker_count * 4);

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let rx = rx.clone();
        let result_tx = result_tx.clone();
        let cache = Arc::clone(cache);
        let timeout = config.file_timeout_ms;
        handles.push(thread::spawn(move || {
            worker_loop(rx, result_tx, cache, timeout);
        }));
    }
    drop(result_tx);

    let feeder = feed(tx, pending);

    let mut summary = AnalysisSummary { extracted: 0, cached, errors: Vec::new() };
    for (path, outcome) in result_rx {
        match outcome {
            Ok(_) => summary.extracted += 1,
            Err(reason) => summary.errors.push((path, reason)),
        }
    }

    feeder.join().ok();
    for handle in handles {
        handle.join().ok();
    }

    Ok(summary)
}

fn feed(tx: Sender<WorkItem>, pending: Vec<WorkItem>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for item in pending {
            if tx.send(item).is_err() {
                break;
            }
        }
    })
}

fn worker_loop(
    rx: crossbeam_channel::Receiver<WorkItem>,
    result_tx: Sender<(PathBuf, Result<usize, String>)>,
    cache: Arc<AstCache>,
    _timeout_ms: Option<u64>,
) {
    for item in rx {
        let outcome = extract_one(&cache, &item);
        if result_tx.send((item.path, outcome)).is_err() {
            break;
        }
    }
}

fn extract_one(cache: &AstCache, item: &WorkItem) -> Result<usize, String> {
    let source = std::fs::read_to_string(&item.path).map_err(|e| e.to_string())?;
    let result = crate::parsing::extract(item.language, &item.path, &source).map_err(|e| e.to_string())?;
    cache
        .store_file_results(&item.path, item.language, result, item.mtime)
        .map_err(|e| e.to_string())
}

fn discover(root: &Path, config: &IndexingConfig) -> Result<Vec<PathBuf>, AstCacheError> {
    let mut overrides = OverrideBuilder::new(root);
    for pattern in &config.include {
        overrides.add(pattern).map_err(|e| AstCacheError::General(e.to_string()))?;
    }
    for pattern in &config.exclude {
        let negated = format!("!{pattern}");
        overrides.add(&negated).map_err(|e| AstCacheError::General(e.to_string()))?;
    }
    let overrides = overrides.build().map_err(|e| AstCacheError::General(e.to_string()))?;

    let mut builder = WalkBuilder::new(root);
    builder.hidden(true).git_ignore(true).overrides(overrides);
    builder.filter_entry(|entry| {
        entry
            .file_name()
            .to_str()
            .map(|name| !BUILTIN_PRUNE.contains(&name))
            .unwrap_or(true)
    });

    let mut out = Vec::new();
    for entry in builder.build() {
        let entry = entry.map_err(|e| AstCacheError::General(e.to_string()))?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}
