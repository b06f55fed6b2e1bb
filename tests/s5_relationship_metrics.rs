use astcache::cache::AstCache;
use astcache::model::{
    ExportKind, ExtractionResult, Language, NodeFlags, NodeKind, RawNode, RawRelationship, RawTarget,
    RelationshipKind,
};
use astcache::types::compact_string;
use chrono::Utc;
use std::path::PathBuf;

#[test]
fn import_and_call_counts_match_emitted_edges() {
    let cache = AstCache::new();
    let path = PathBuf::from("svc.go");
    let mut result = ExtractionResult::new(path.clone(), "svc", Language::Go);

    let emitter = RawNode {
        package: compact_string("svc"),
        type_name: compact_string(""),
        method: compact_string("Emitter"),
        field: compact_string(""),
        kind: NodeKind::Method,
        start_line: 1,
        end_line: 20,
        cyclomatic: 1,
        parameters: vec![],
        returns: vec![],
        flags: NodeFlags::empty(),
        export_kind: ExportKind::None,
    };
    let peer = RawNode {
        package: compact_string("svc"),
        type_name: compact_string(""),
        method: compact_string("Peer"),
        field: compact_string(""),
        kind: NodeKind::Method,
        start_line: 22,
        end_line: 24,
        cyclomatic: 1,
        parameters: vec![],
        returns: vec![],
        flags: NodeFlags::empty(),
        export_kind: ExportKind::None,
    };

    let emitter_key = emitter.logical_key(&path);
    let peer_key = peer.logical_key(&path);
    result.nodes.push(emitter);
    result.nodes.push(peer);

    for i in 0..3 {
        result.relationships.push(RawRelationship {
            from: emitter_key.clone(),
            target: RawTarget::External,
            line_no: 2 + i,
            kind: RelationshipKind::Import,
            text: compact_string(format!("pkg{i}")),
        });
    }
    result.relationships.push(RawRelationship {
        from: emitter_key.clone(),
        target: RawTarget::SameFile(peer_key.clone()),
        line_no: 10,
        kind: RelationshipKind::Call,
        text: compact_string("Peer"),
    });
    result.relationships.push(RawRelationship {
        from: emitter_key.clone(),
        target: RawTarget::External,
        line_no: 11,
        kind: RelationshipKind::Call,
        text: compact_string("external.Do"),
    });

    cache.store_file_results(&path, Language::Go, result, Utc::now()).unwrap();

    let workdir = PathBuf::from("");
    let imports_hit = astcache::query::execute(&cache, "imports(*) > 2", &workdir).unwrap();
    assert_eq!(imports_hit.len(), 1);
    assert_eq!(imports_hit[0].method.as_ref(), "Emitter");

    let calls_hit = astcache::query::execute(&cache, "calls(*) >= 2", &workdir).unwrap();
    assert_eq!(calls_hit.len(), 1);
    assert_eq!(calls_hit[0].method.as_ref(), "Emitter");

    let zero_imports = astcache::query::execute(&cache, "imports(*) == 0", &workdir).unwrap();
    assert!(zero_imports.iter().any(|n| n.method.as_ref() == "Peer"));
}
