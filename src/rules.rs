//! The LIMIT/FORBID/REQUIRE rule engine: TOML-declared clauses evaluated
//! against the cache via [`crate::query`].

use crate::cache::AstCache;
use crate::error::RuleError;
use crate::model::AstNode;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct RuleSet {
    #[serde(default, rename = "rule")]
    pub rules: Vec<Clause>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Clause {
    Limit { name: String, metric_expr: String },
    Forbid { name: String, caller: String, callee: String },
    Require { name: String, source: String, target: String },
}

impl Clause {
    fn name(&self) -> &str {
        match self {
            Clause::Limit { name, .. } => name,
            Clause::Forbid { name, .. } => name,
            Clause::Require { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub rule_name: String,
    pub file: std::path::PathBuf,
    pub line: u32,
    pub caller: Option<String>,
    pub callee: Option<String>,
    pub message: String,
}

impl RuleSet {
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RuleError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&raw).map_err(|source| RuleError::Toml { path: path.to_path_buf(), source })
    }
}

/// Evaluates every clause in `rules` against `cache`, scoped to `workdir`.
pub fn evaluate_rules(cache: &AstCache, rules: &RuleSet, workdir: &Path) -> Result<Vec<Violation>, RuleError> {
    let mut violations = Vec::new();
    for clause in &rules.rules {
        match clause {
            Clause::Limit { name, metric_expr } => {
                let hits = crate::query::execute(cache, metric_expr, workdir)?;
                for node in hits {
                    violations.push(limit_violation(name, metric_expr, &node));
                }
            }
            Clause::Forbid { name, caller, callee } => {
                violations.extend(forbid_violations(cache, name, caller, callee, workdir)?);
            }
            Clause::Require { name, source, target } => {
                violations.extend(require_violations(cache, name, source, target, workdir)?);
            }
        }
    }
    Ok(violations)
}

fn limit_violation(rule_name: &str, metric_expr: &str, node: &AstNode) -> Violation {
    Violation {
        rule_name: rule_name.to_string(),
        file: node.file_path.clone(),
        line: node.start_line,
        caller: Some(node.short_fingerprint()),
        callee: None,
        message: format!("{} violates `{}`", node.short_fingerprint(), metric_expr),
    }
}

fn forbid_violations(
    cache: &AstCache,
    rule_name: &str,
    caller_pattern: &str,
    callee_pattern: &str,
    workdir: &Path,
) -> Result<Vec<Violation>, RuleError> {
    let callers = crate::query::query_pattern(cache, caller_pattern, workdir)?;
    let callee_matcher = crate::pattern::CompiledPattern::parse(callee_pattern)?;

    let mut out = Vec::new();
    for caller in callers {
        for rel in cache.get_ast_relationships(caller.id, Some(crate::model::RelationshipKind::Call)) {
            let Some(to_id) = rel.to_id else { continue };
            let Some(callee_node) = cache.find_node(to_id) else { continue };
            if callee_matcher.matches(&callee_node) {
                out.push(Violation {
                    rule_name: rule_name.to_string(),
                    file: caller.file_path.clone(),
                    line: rel.line_no,
                    caller: Some(caller.short_fingerprint()),
                    callee: Some(callee_node.short_fingerprint()),
                    message: format!(
                        "{} calls forbidden {} (rule `{}`)",
                        caller.short_fingerprint(),
                        callee_node.short_fingerprint(),
                        rule_name
                    ),
                });
            }
        }
    }
    Ok(out)
}

fn require_violations(
    cache: &AstCache,
    rule_name: &str,
    source_pattern: &str,
    target_pattern: &str,
    workdir: &Path,
) -> Result<Vec<Violation>, RuleError> {
    let sources = crate::query::query_pattern(cache, source_pattern, workdir)?;
    let target_matcher = crate::pattern::CompiledPattern::parse(target_pattern)?;

    let mut out = Vec::new();
    for source in sources {
        let has_match = cache.get_ast_relationships(source.id, None).into_iter().any(|rel| {
            rel.to_id.and_then(|id| cache.find_node(id)).map(|target| target_matcher.matches(&target)).unwrap_or(false)
        });
        if !has_match {
            out.push(Violation {
                rule_name: rule_name.to_string(),
                file: source.file_path.clone(),
                line: source.start_line,
                caller: Some(source.short_fingerprint()),
                callee: None,
                message: format!(
                    "{} has no relationship matching required `{}` (rule `{}`)",
                    source.short_fingerprint(),
                    target_pattern,
                    rule_name
                ),
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ExportKind, ExtractionResult, Language, NodeFlags, NodeKind, RawNode, RawRelationship, RawTarget,
        RelationshipKind,
    };
    use crate::types::compact_string;
    use std::path::PathBuf;

    #[test]
    fn parses_limit_clause_from_toml() {
        let raw = r#"
            [[rule]]
            kind = "limit"
            name = "no-huge-functions"
            metric_expr = "lines(*) > 300"
        "#;
        let parsed: RuleSet = toml::from_str(raw).unwrap();
        assert_eq!(parsed.rules.len(), 1);
        assert_eq!(parsed.rules[0].name(), "no-huge-functions");
    }

    #[test]
    fn parses_require_clause_from_toml() {
        let raw = r#"
            [[rule]]
            kind = "require"
            name = "controllers-log"
            source = "*Controller*"
            target = "*Logger*"
        "#;
        let parsed: RuleSet = toml::from_str(raw).unwrap();
        assert_eq!(parsed.rules.len(), 1);
        assert_eq!(parsed.rules[0].name(), "controllers-log");
        assert!(matches!(&parsed.rules[0], Clause::Require { .. }));
    }

    fn method_node(method: &str, kind: NodeKind) -> RawNode {
        RawNode {
            package: compact_string("svc"),
            type_name: compact_string(""),
            method: compact_string(method),
            field: compact_string(""),
            kind,
            start_line: 1,
            end_line: 5,
            cyclomatic: 1,
            parameters: vec![],
            returns: vec![],
            flags: NodeFlags::empty(),
            export_kind: ExportKind::None,
        }
    }

    #[test]
    fn require_flags_only_the_source_with_no_matching_relationship() {
        let cache = AstCache::new();
        let path = PathBuf::from("svc.go");
        let mut result = ExtractionResult::new(path.clone(), "svc", Language::Go);

        let logging_controller = method_node("LoggingController", NodeKind::Method);
        let silent_controller = method_node("SilentController", NodeKind::Method);
        let logger = method_node("Logger", NodeKind::Method);

        let logging_key = logging_controller.logical_key(&path);
        let silent_key = silent_controller.logical_key(&path);
        let logger_key = logger.logical_key(&path);

        result.nodes.push(logging_controller);
        result.nodes.push(silent_controller);
        result.nodes.push(logger);

        result.relationships.push(RawRelationship {
            from: logging_key,
            target: RawTarget::SameFile(logger_key),
            line_no: 3,
            kind: RelationshipKind::Call,
            text: compact_string("Logger"),
        });
        let _ = silent_key;

        cache.store_file_results(&path, Language::Go, result, chrono::Utc::now()).unwrap();

        let rules = RuleSet {
            rules: vec![Clause::Require {
                name: "controllers-log".to_string(),
                source: "*Controller*".to_string(),
                target: "*Logger*".to_string(),
            }],
        };

        let violations = evaluate_rules(&cache, &rules, &PathBuf::from("")).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].caller.as_deref(), Some("svc::SilentController:"));
    }
}
