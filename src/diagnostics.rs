//! Read-only introspection over the cache: histograms, counts, freshness.

use crate::cache::AstCache;
use crate::model::NodeKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub struct Overview {
    pub total_nodes: usize,
    pub by_kind: HashMap<String, usize>,
}

pub fn overview(cache: &AstCache) -> Overview {
    let histogram = cache.node_kind_histogram();
    let by_kind = histogram
        .into_iter()
        .map(|(kind, count)| (kind.as_str().to_string(), count))
        .collect();
    Overview { total_nodes: cache.total_nodes(), by_kind }
}

#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub total_files: usize,
    pub cached_files: usize,
    pub total_nodes: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

pub fn cache_stats(cache: &AstCache) -> CacheStats {
    let total_files = cache.total_files();
    CacheStats {
        total_files,
        cached_files: total_files,
        total_nodes: cache.total_nodes(),
        last_updated: cache.last_updated(),
    }
}

#[derive(Debug, Serialize)]
pub struct SourceSummary {
    pub kind: String,
    pub name: String,
    pub node_count: usize,
}

/// One row per distinct `(kind, name)` pair across every cached node, where
/// `name` is the node's kind-appropriate primary field (mirrors the bare
/// name pattern's field selection in [`crate::pattern`]).
pub fn analysis_sources(cache: &AstCache) -> Vec<SourceSummary> {
    let mut counts: HashMap<(NodeKind, String), usize> = HashMap::new();
    for node in cache.all_nodes() {
        let name = match node.kind {
            NodeKind::Package => node.package.to_string(),
            NodeKind::Type => node.type_name.to_string(),
            NodeKind::Method => node.method.to_string(),
            NodeKind::Field => node.field.to_string(),
            NodeKind::Variable => {
                if !node.field.is_empty() {
                    node.field.to_string()
                } else {
                    node.method.to_string()
                }
            }
        };
        *counts.entry((node.kind, name)).or_insert(0) += 1;
    }

    let mut out: Vec<SourceSummary> = counts
        .into_iter()
        .map(|((kind, name), node_count)| SourceSummary { kind: kind.as_str().to_string(), name, node_count })
        .collect();
    out.sort_by(|a, b| (a.kind.as_str(), a.name.as_str()).cmp(&(b.kind.as_str(), b.name.as_str())));
    out
}
