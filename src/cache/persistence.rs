//! Whole-snapshot atomic persistence for [`AstCache`](super::AstCache).
//!
//! Grounded on the teacher's own save/load pattern: serialize with
//! `bincode`, write to a temp file beside the destination, then rename.
//! Rename is atomic on the same filesystem, so readers of the old file
//! never observe a half-written new one.

use crate::error::CacheError;
use crate::model::{AstNode, AstRelationship, LibraryNode, LibraryRelationship};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::AstCache;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    next_node_id: u32,
    next_file_id: u32,
    nodes: Vec<AstNode>,
    relationships: Vec<AstRelationship>,
    library_nodes: Vec<LibraryNode>,
    library_relationships: Vec<LibraryRelationship>,
}

impl AstCache {
    /// Serializes the full cache and writes it atomically to `path`.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let snapshot = Snapshot {
            next_node_id: self.node_ids.peek(),
            next_file_id: self.file_ids.load(std::sync::atomic::Ordering::Relaxed),
            nodes: self.nodes.iter().map(|e| e.value().clone()).collect(),
            relationships: self.relationships.iter().map(|e| e.value().clone()).collect(),
            library_nodes: self.library_nodes.iter().map(|e| e.value().clone()).collect(),
            library_relationships: self.library_relationships.iter().map(|e| e.value().clone()).collect(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let bytes = bincode::serialize(&snapshot)?;

        let temp_path = temp_path_for(path);
        fs::write(&temp_path, &bytes).map_err(|source| CacheError::Io {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }

    /// Loads a cache snapshot from `path`, rebuilding every index.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let bytes = fs::read(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Snapshot = bincode::deserialize(&bytes)?;

        let cache = AstCache::new();
        cache.node_ids.reset(snapshot.next_node_id);
        cache
            .file_ids
            .store(snapshot.next_file_id.max(1), std::sync::atomic::Ordering::Relaxed);

        for node in snapshot.nodes {
            cache.logical_index.insert(node.logical_key(), node.id);
            cache
                .nodes_by_file
                .entry(node.file_path.clone())
                .or_default()
                .push(node.id);
            cache.nodes.insert(node.id, node);
        }
        for rel in snapshot.relationships {
            cache.relationships_by_from.entry(rel.from_id).or_default().push(rel.id);
            cache.relationships.insert(rel.id, rel);
        }
        for lib_node in snapshot.library_nodes {
            cache.library_nodes.insert(lib_node.id, lib_node);
        }
        for lib_rel in snapshot.library_relationships {
            cache
                .library_relationships_by_ast
                .entry(lib_rel.ast_id)
                .or_default()
                .push(lib_rel.id);
            cache.library_relationships.insert(lib_rel.id, lib_rel);
        }

        cache.rebuild_file_records();

        Ok(cache)
    }

    /// Derives `file_records` from the loaded nodes (the snapshot stores
    /// nodes, not file records directly; one node per file is enough to
    /// recover `last_modified` since every node for a file shares it).
    fn rebuild_file_records(&self) {
        for entry in self.nodes_by_file.iter() {
            let path = entry.key().clone();
            if let Some(first_id) = entry.value().first() {
                if let Some(node) = self.nodes.get(first_id) {
                    self.file_records.insert(
                        path,
                        super::FileRecord {
                            file_id: node.file_id,
                            last_modified: node.last_modified,
                            stored_at: node.last_modified,
                        },
                    );
                }
            }
        }
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    path.with_extension("tmp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExportKind, ExtractionResult, Language, NodeFlags, NodeKind, RawNode};
    use crate::types::compact_string;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn save_then_load_round_trips_nodes() {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("cache.bin");

        let cache = AstCache::new();
        let file_path = PathBuf::from("/repo/main.go");
        let mut result = ExtractionResult::new(file_path.clone(), "main", Language::Go);
        result.nodes.push(RawNode {
            package: compact_string("main"),
            type_name: compact_string("Calculator"),
            method: compact_string(""),
            field: compact_string(""),
            kind: NodeKind::Type,
            start_line: 1,
            end_line: 3,
            cyclomatic: 0,
            parameters: vec![],
            returns: vec![],
            flags: NodeFlags::empty(),
            export_kind: ExportKind::None,
        });
        cache.store_file_results(&file_path, Language::Go, result, Utc::now()).unwrap();

        cache.save(&cache_path).unwrap();
        assert!(cache_path.exists());

        let loaded = AstCache::load(&cache_path).unwrap();
        assert_eq!(loaded.total_nodes(), 1);
        assert_eq!(loaded.get_nodes_by_file(&file_path).len(), 1);
        assert!(!loaded.needs_reanalysis(&file_path, Utc::now() - chrono::Duration::seconds(1), 0));
    }

    #[test]
    fn load_missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist.bin");
        assert!(AstCache::load(&missing).is_err());
    }
}
