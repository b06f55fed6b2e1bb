//! The thin `astcache` front-end: argument parsing and output formatting
//! over the library's core subsystems. Exit-code mapping lives here, not in
//! `main.rs`, so it can be unit-tested without spawning a process.

use crate::cache::AstCache;
use crate::config::Settings;
use crate::error::AstCacheError;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "astcache", version, about = "Polyglot AST extraction, caching, and query engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default `.astcache/settings.toml` in the current directory.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Walk a tree and extract every supported file not already fresh in the cache.
    Analyze {
        root: PathBuf,
        #[arg(long = "include")]
        include: Vec<String>,
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        #[arg(long = "no-cache")]
        no_cache: bool,
        #[arg(long = "workers")]
        workers: Option<usize>,
        #[arg(long = "ttl")]
        ttl: Option<u64>,
    },
    /// Like `analyze`, but ignores cache freshness and re-extracts everything.
    Rebuild { root: PathBuf },
    /// Run an AQL expression or bare pattern against the cache.
    Query {
        expr: String,
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Evaluate a TOML rule set against the cache.
    Rules {
        ruleset: PathBuf,
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Print the node-kind histogram.
    Overview {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Print cache freshness and size statistics.
    Stats {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

/// Runs the parsed command; returns the process exit code (0/1/2 per spec).
pub fn run(cli: Cli) -> i32 {
    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            for suggestion in err.recovery_suggestions() {
                tracing::info!("hint: {suggestion}");
            }
            err.exit_code()
        }
    }
}

fn dispatch(cli: Cli) -> Result<i32, AstCacheError> {
    match cli.command {
        Command::Init { force } => {
            Settings::init_config_file(force).map_err(|e| AstCacheError::General(e.to_string()))?;
            println!("wrote .astcache/settings.toml");
            Ok(0)
        }
        Command::Analyze { root, include, exclude, no_cache, workers, ttl } => {
            let mut settings = Settings::load()?;
            if !include.is_empty() {
                settings.indexing.include = include;
            }
            if !exclude.is_empty() {
                settings.indexing.exclude = exclude;
            }
            if no_cache {
                settings.indexing.no_cache = true;
            }
            if let Some(workers) = workers {
                settings.indexing.max_workers = workers;
            }
            if let Some(ttl) = ttl {
                settings.indexing.cache_ttl_secs = ttl;
            }

            let cache = Arc::new(open_cache(&settings, no_cache)?);
            let summary = crate::coordinator::analyze(&cache, &root, &settings.indexing)?;
            if !no_cache {
                cache.save(&settings.cache_path)?;
            }
            println!(
                "extracted {} cached {} errors {}",
                summary.extracted,
                summary.cached,
                summary.errors.len()
            );
            for (path, reason) in &summary.errors {
                eprintln!("{}: {}", path.display(), reason);
            }
            Ok(if summary.errors.is_empty() { 0 } else { 1 })
        }
        Command::Rebuild { root } => {
            let settings = Settings::load()?;
            let cache = Arc::new(AstCache::new());
            crate::library::seed(&cache);
            let summary = crate::coordinator::rebuild(&cache, &root, &settings.indexing)?;
            cache.save(&settings.cache_path)?;
            println!("rebuilt {} nodes across {} files", cache.total_nodes(), cache.total_files());
            Ok(if summary.errors.is_empty() { 0 } else { 1 })
        }
        Command::Query { expr, root } => {
            let settings = Settings::load()?;
            let cache = load_cache(&settings)?;
            let nodes = crate::query::execute(&cache, &expr, &absolute(&root))?;
            for node in &nodes {
                println!("{}", node.fingerprint());
            }
            Ok(0)
        }
        Command::Rules { ruleset, root } => {
            let settings = Settings::load()?;
            let cache = load_cache(&settings)?;
            let rules = crate::rules::RuleSet::load(&ruleset)?;
            let violations = crate::rules::evaluate_rules(&cache, &rules, &absolute(&root))?;
            for v in &violations {
                println!("{}:{}: [{}] {}", v.file.display(), v.line, v.rule_name, v.message);
            }
            Ok(if violations.is_empty() { 0 } else { 1 })
        }
        Command::Overview { root: _ } => {
            let settings = Settings::load()?;
            let cache = load_cache(&settings)?;
            let overview = crate::diagnostics::overview(&cache);
            println!("total nodes: {}", overview.total_nodes);
            let mut kinds: Vec<_> = overview.by_kind.into_iter().collect();
            kinds.sort();
            for (kind, count) in kinds {
                println!("  {kind}: {count}");
            }
            Ok(0)
        }
        Command::Stats { root: _ } => {
            let settings = Settings::load()?;
            let cache = load_cache(&settings)?;
            let stats = crate::diagnostics::cache_stats(&cache);
            println!("files: {}", stats.total_files);
            println!("cached files: {}", stats.cached_files);
            println!("nodes: {}", stats.total_nodes);
            match stats.last_updated {
                Some(t) => println!("last updated: {t}"),
                None => println!("last updated: never"),
            }
            Ok(0)
        }
    }
}

fn open_cache(settings: &Settings, no_cache: bool) -> Result<AstCache, AstCacheError> {
    let cache = if !no_cache && AstCache::exists(&settings.cache_path) {
        AstCache::load(&settings.cache_path)?
    } else {
        AstCache::new()
    };
    crate::library::seed(&cache);
    Ok(cache)
}

fn load_cache(settings: &Settings) -> Result<AstCache, AstCacheError> {
    if AstCache::exists(&settings.cache_path) {
        let cache = AstCache::load(&settings.cache_path)?;
        crate::library::seed(&cache);
        Ok(cache)
    } else {
        let cache = AstCache::new();
        crate::library::seed(&cache);
        Ok(cache)
    }
}

/// Clap's own usage-error exit (2) is already what clap returns on
/// `Cli::try_parse` failure; this helper makes that contract explicit at
/// the call site in `main`.
pub fn usage_error_exit_code() -> i32 {
    2
}

/// Canonicalizes `root` so it compares correctly against the absolute
/// `file_path`s stored on every cached node (see `CompiledPattern::matches_scoped`).
/// Falls back to the path as given if it doesn't exist yet.
fn absolute(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}
