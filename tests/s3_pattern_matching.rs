use astcache::cache::AstCache;
use astcache::model::Language;
use chrono::Utc;
use std::path::PathBuf;

const USER_CONTROLLER: &str = r#"
package main

type UserController struct{}

func (u *UserController) GetUser(id int) error {
	return nil
}

func (u *UserController) CreateUser(name string) error {
	return nil
}
"#;

const ORDER_CONTROLLER: &str = r#"
package main

type OrderController struct{}

func (o *OrderController) GetOrder(id int) error {
	return nil
}
"#;

const USER_SERVICE: &str = r#"
package main

type UserService struct{}

func (s *UserService) FindUser(id int) error {
	return nil
}
"#;

fn build_cache() -> AstCache {
    let cache = AstCache::new();
    for (name, source) in [
        ("user_controller.go", USER_CONTROLLER),
        ("order_controller.go", ORDER_CONTROLLER),
        ("user_service.go", USER_SERVICE),
    ] {
        let path = PathBuf::from(name);
        let result = astcache::parsing::extract(Language::Go, &path, source).unwrap();
        cache.store_file_results(&path, Language::Go, result, Utc::now()).unwrap();
    }
    cache
}

#[test]
fn bare_controller_pattern_returns_exactly_the_two_controller_types() {
    let cache = build_cache();
    let workdir = PathBuf::from("");
    let hits = astcache::query::query_pattern(&cache, "*Controller*", &workdir).unwrap();

    let type_hits: Vec<_> = hits
        .iter()
        .filter(|n| n.kind == astcache::model::NodeKind::Type)
        .collect();
    assert_eq!(type_hits.len(), 2);
    assert!(type_hits.iter().any(|n| n.type_name.as_ref() == "UserController"));
    assert!(type_hits.iter().any(|n| n.type_name.as_ref() == "OrderController"));
}

#[test]
fn positional_get_pattern_returns_exactly_getuser_and_getorder() {
    let cache = build_cache();
    let workdir = PathBuf::from("");
    let hits = astcache::query::query_pattern(&cache, "*:*:Get*", &workdir).unwrap();

    assert_eq!(hits.len(), 2);
    assert!(hits.iter().any(|n| n.method.as_ref() == "GetUser"));
    assert!(hits.iter().any(|n| n.method.as_ref() == "GetOrder"));
    assert!(!hits.iter().any(|n| n.method.as_ref() == "FindUser"));
}
