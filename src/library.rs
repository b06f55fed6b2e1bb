//! Curated catalog of well-known external symbols.
//!
//! Seeded into the cache's library-node table exactly once per process,
//! mirroring the teacher's idempotent-seed idiom for process-wide state.

use crate::cache::AstCache;
use crate::model::{Language, NodeKind};
use std::sync::Once;

static SEED: Once = Once::new();

/// A single catalog entry describing a well-known external symbol.
pub struct CatalogEntry {
    pub language: Language,
    pub package: &'static str,
    pub class: &'static str,
    pub method: &'static str,
    pub framework: &'static str,
}

/// The curated list of standard-library and popular-framework symbols for
/// each natively supported language. Not exhaustive; covers the surfaces
/// most commonly call-sited in real source.
pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry { language: Language::Go, package: "fmt", class: "", method: "Println", framework: "stdlib" },
    CatalogEntry { language: Language::Go, package: "fmt", class: "", method: "Printf", framework: "stdlib" },
    CatalogEntry { language: Language::Go, package: "fmt", class: "", method: "Errorf", framework: "stdlib" },
    CatalogEntry { language: Language::Go, package: "fmt", class: "", method: "Sprintf", framework: "stdlib" },
    CatalogEntry { language: Language::Go, package: "errors", class: "", method: "New", framework: "stdlib" },
    CatalogEntry { language: Language::Go, package: "net/http", class: "", method: "HandleFunc", framework: "stdlib" },
    CatalogEntry { language: Language::Go, package: "net/http", class: "", method: "ListenAndServe", framework: "stdlib" },
    CatalogEntry { language: Language::Go, package: "os", class: "", method: "Exit", framework: "stdlib" },
    CatalogEntry { language: Language::Go, package: "strings", class: "", method: "Join", framework: "stdlib" },
    CatalogEntry { language: Language::Go, package: "strings", class: "", method: "Split", framework: "stdlib" },

    CatalogEntry { language: Language::Python, package: "os", class: "", method: "path", framework: "stdlib" },
    CatalogEntry { language: Language::Python, package: "os", class: "", method: "environ", framework: "stdlib" },
    CatalogEntry { language: Language::Python, package: "json", class: "", method: "loads", framework: "stdlib" },
    CatalogEntry { language: Language::Python, package: "json", class: "", method: "dumps", framework: "stdlib" },
    CatalogEntry { language: Language::Python, package: "sys", class: "", method: "exit", framework: "stdlib" },
    CatalogEntry { language: Language::Python, package: "logging", class: "", method: "getLogger", framework: "stdlib" },
    CatalogEntry { language: Language::Python, package: "re", class: "", method: "match", framework: "stdlib" },
    CatalogEntry { language: Language::Python, package: "re", class: "", method: "sub", framework: "stdlib" },

    CatalogEntry { language: Language::JavaScript, package: "console", class: "", method: "log", framework: "ecma" },
    CatalogEntry { language: Language::JavaScript, package: "console", class: "", method: "error", framework: "ecma" },
    CatalogEntry { language: Language::JavaScript, package: "Array", class: "", method: "isArray", framework: "ecma" },
    CatalogEntry { language: Language::JavaScript, package: "JSON", class: "", method: "parse", framework: "ecma" },
    CatalogEntry { language: Language::JavaScript, package: "JSON", class: "", method: "stringify", framework: "ecma" },
    CatalogEntry { language: Language::JavaScript, package: "Object", class: "", method: "keys", framework: "ecma" },
    CatalogEntry { language: Language::JavaScript, package: "Promise", class: "", method: "all", framework: "ecma" },

    CatalogEntry { language: Language::TypeScript, package: "console", class: "", method: "log", framework: "ecma" },
    CatalogEntry { language: Language::TypeScript, package: "JSON", class: "", method: "parse", framework: "ecma" },
    CatalogEntry { language: Language::TypeScript, package: "JSON", class: "", method: "stringify", framework: "ecma" },
];

/// Looks up a catalog entry matching a call's package hint and method name
/// for the given language.
pub fn lookup(language: Language, package: &str, method: &str) -> Option<&'static CatalogEntry> {
    CATALOG
        .iter()
        .find(|e| e.language == language && e.package == package && e.method == method)
}

/// Seeds the cache's library-node table from [`CATALOG`]. Safe to call
/// multiple times; only the first call per process has effect.
pub fn seed(cache: &AstCache) {
    SEED.call_once(|| {
        for entry in CATALOG {
            cache.insert_library_node(
                entry.package,
                entry.class,
                entry.method,
                "",
                NodeKind::Method,
                entry.language,
                entry.framework,
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_known_go_symbol() {
        let entry = lookup(Language::Go, "fmt", "Println").unwrap();
        assert_eq!(entry.framework, "stdlib");
    }

    #[test]
    fn lookup_misses_unknown_symbol() {
        assert!(lookup(Language::Go, "fmt", "NotARealFunction").is_none());
    }
}
