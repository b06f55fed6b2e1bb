use astcache::cache::AstCache;
use astcache::model::{Language, NodeKind};
use chrono::Utc;
use std::path::PathBuf;

const SOURCE: &str = r#"
package main

type Calculator struct {
	total int
}

func (c *Calculator) Add(x int) error {
	if x < 0 {
		return fmt.Errorf("negative")
	}
	c.total += x
	return nil
}

func (c *Calculator) Multiply(x, y int) int {
	result := 0
	for i := 0; i < y; i++ {
		if x < 0 {
			result -= x
		} else {
			result += x
		}
	}
	return result
}

func main() {
	c := &Calculator{}
	c.Add(5)
}
"#;

#[test]
fn extracts_calculator_struct_and_methods_with_expected_complexity() {
    let path = PathBuf::from("calculator.go");
    let result = astcache::parsing::extract(Language::Go, &path, SOURCE).unwrap();

    let cache = AstCache::new();
    cache.store_file_results(&path, Language::Go, result, Utc::now()).unwrap();

    let nodes = cache.get_nodes_by_file(&path);

    let calculator_type = nodes
        .iter()
        .find(|n| n.kind == NodeKind::Type && n.type_name.as_ref() == "Calculator")
        .expect("Calculator type node");
    assert_eq!(calculator_type.type_name.as_ref(), "Calculator");

    let add = nodes
        .iter()
        .find(|n| n.kind == NodeKind::Method && n.method.as_ref() == "Add")
        .expect("Add method node");
    assert!(add.cyclomatic >= 2, "Add complexity {} should be >= 2", add.cyclomatic);

    let multiply = nodes
        .iter()
        .find(|n| n.kind == NodeKind::Method && n.method.as_ref() == "Multiply")
        .expect("Multiply method node");
    assert!(multiply.cyclomatic >= 3, "Multiply complexity {} should be >= 3", multiply.cyclomatic);

    assert!(nodes.iter().any(|n| n.kind == NodeKind::Method && n.method.as_ref() == "main"));
}

#[test]
fn query_pattern_finds_calculator_type_and_high_complexity_methods() {
    let path = PathBuf::from("calculator.go");
    let result = astcache::parsing::extract(Language::Go, &path, SOURCE).unwrap();

    let cache = AstCache::new();
    cache.store_file_results(&path, Language::Go, result, Utc::now()).unwrap();

    let workdir = PathBuf::from("");
    let type_hits = astcache::query::query_pattern(&cache, "*Calculator", &workdir).unwrap();
    assert!(type_hits.iter().any(|n| n.kind == NodeKind::Type && n.type_name.as_ref() == "Calculator"));

    let complex_hits = astcache::query::execute(&cache, "cyclomatic(*) >= 3", &workdir).unwrap();
    assert!(complex_hits.iter().any(|n| n.method.as_ref() == "Multiply"));
}
