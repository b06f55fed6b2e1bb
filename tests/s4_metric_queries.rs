use astcache::cache::AstCache;
use astcache::model::{ExportKind, ExtractionResult, Language, NodeFlags, NodeKind, Parameter, RawNode};
use astcache::types::compact_string;
use chrono::Utc;
use std::path::PathBuf;

fn seeded_cache() -> AstCache {
    let cache = AstCache::new();
    let path = PathBuf::from("svc.go");
    let mut result = ExtractionResult::new(path.clone(), "svc", Language::Go);

    let six_params: Vec<Parameter> = (0..6).map(|i| Parameter::new(Some(&format!("p{i}")), Some("int"), false)).collect();

    result.nodes.push(method_node("Big", 150, 12, vec![]));
    result.nodes.push(method_node("Medium", 50, 3, vec![]));
    result.nodes.push(method_node("Small", 25, 5, six_params));

    cache.store_file_results(&path, Language::Go, result, Utc::now()).unwrap();
    cache
}

fn method_node(name: &str, lines: u32, cyclomatic: u32, parameters: Vec<Parameter>) -> RawNode {
    RawNode {
        package: compact_string("svc"),
        type_name: compact_string(""),
        method: compact_string(name),
        field: compact_string(""),
        kind: NodeKind::Method,
        start_line: 1,
        end_line: lines,
        cyclomatic,
        parameters,
        returns: vec![],
        flags: NodeFlags::empty(),
        export_kind: ExportKind::None,
    }
}

#[test]
fn lines_over_100_returns_only_the_150_line_method() {
    let cache = seeded_cache();
    let hits = astcache::query::execute(&cache, "lines(*) > 100", &PathBuf::from("")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].method.as_ref(), "Big");
}

#[test]
fn cyclomatic_at_least_5_returns_two_methods() {
    let cache = seeded_cache();
    let hits = astcache::query::execute(&cache, "cyclomatic(*) >= 5", &PathBuf::from("")).unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn params_over_4_returns_the_six_parameter_method() {
    let cache = seeded_cache();
    let hits = astcache::query::execute(&cache, "params(*) > 4", &PathBuf::from("")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].method.as_ref(), "Small");
}
