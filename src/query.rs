//! AQL: the metric-query language layered over the pattern engine.
//!
//! Two forms share one surface: a bare pattern (`"*Controller*"`) returns
//! matching nodes directly; a metric expression (`"cyclomatic(*) >= 3"`)
//! filters pattern matches by a numeric predicate over one of
//! `{lines, cyclomatic, parameters|params, returns, len, imports, calls}`.

use crate::cache::AstCache;
use crate::error::QueryError;
use crate::model::AstNode;
use crate::pattern::CompiledPattern;
use std::path::Path;

const METRICS: &[&str] = &["lines", "cyclomatic", "parameters", "params", "returns", "len", "imports", "calls"];

/// Longest-token-first so `>=` is tried before `>` and isn't cut short.
const OPERATORS: &[&str] = &[">=", "<=", "!=", "==", ">", "<"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Ge,
    Le,
    Ne,
    Eq,
    Gt,
    Lt,
}

impl Op {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            ">=" => Some(Op::Ge),
            "<=" => Some(Op::Le),
            "!=" => Some(Op::Ne),
            "==" => Some(Op::Eq),
            ">" => Some(Op::Gt),
            "<" => Some(Op::Lt),
            _ => None,
        }
    }

    fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Op::Ge => lhs >= rhs,
            Op::Le => lhs <= rhs,
            Op::Ne => (lhs - rhs).abs() > f64::EPSILON,
            Op::Eq => (lhs - rhs).abs() <= f64::EPSILON,
            Op::Gt => lhs > rhs,
            Op::Lt => lhs < rhs,
        }
    }
}

#[derive(Debug)]
pub enum QueryExpr {
    Pattern(CompiledPattern),
    Metric { metric: String, pattern: CompiledPattern, op: Op, value: f64 },
}

pub fn parse(expr: &str) -> Result<QueryExpr, QueryError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(QueryError::Empty);
    }

    let Some(paren_start) = trimmed.find('(') else {
        return Ok(QueryExpr::Pattern(CompiledPattern::parse(trimmed)?));
    };

    let metric_name = trimmed[..paren_start].trim();
    if !METRICS.contains(&metric_name) {
        return Err(QueryError::InvalidMetric { metric: metric_name.to_string() });
    }

    let Some(paren_end_rel) = trimmed[paren_start..].find(')') else {
        return Err(QueryError::UnterminatedParen { expr: trimmed.to_string() });
    };
    let paren_end = paren_start + paren_end_rel;

    let pattern_str = trimmed[paren_start + 1..paren_end].trim();
    let pattern_str = if pattern_str.is_empty() { "*" } else { pattern_str };
    let pattern = CompiledPattern::parse(pattern_str)?;

    let remainder = trimmed[paren_end + 1..].trim();
    if remainder.is_empty() {
        return Err(QueryError::MissingOperator { expr: trimmed.to_string() });
    }

    let op_token = OPERATORS
        .iter()
        .find(|token| remainder.starts_with(*token))
        .ok_or_else(|| QueryError::InvalidOperator { operator: remainder.to_string() })?;
    let op = Op::from_token(op_token).expect("token drawn from OPERATORS always maps");

    let value_str = remainder[op_token.len()..].trim();
    let value: f64 = value_str
        .parse()
        .map_err(|_| QueryError::InvalidValue { value: value_str.to_string(), expr: trimmed.to_string() })?;

    Ok(QueryExpr::Metric { metric: metric_name.to_string(), pattern, op, value })
}

pub fn execute(cache: &AstCache, expr: &str, workdir: &Path) -> Result<Vec<AstNode>, QueryError> {
    match parse(expr)? {
        QueryExpr::Pattern(pattern) => Ok(cache.query_nodes(&pattern, workdir)),
        QueryExpr::Metric { metric, pattern, op, value } => {
            let candidates = cache.query_nodes(&pattern, workdir);
            Ok(candidates
                .into_iter()
                .filter(|node| op.apply(metric_value(cache, node, &metric), value))
                .collect())
        }
    }
}

pub fn query_pattern(cache: &AstCache, pattern: &str, workdir: &Path) -> Result<Vec<AstNode>, QueryError> {
    let compiled = CompiledPattern::parse(pattern)?;
    Ok(cache.query_nodes(&compiled, workdir))
}

fn metric_value(cache: &AstCache, node: &AstNode, metric: &str) -> f64 {
    match metric {
        "lines" => node.line_count as f64,
        "cyclomatic" => node.cyclomatic as f64,
        "parameters" | "params" => node.parameter_count as f64,
        "returns" => node.return_count as f64,
        "len" => node.fingerprint().len() as f64,
        "imports" => cache.count_imports(node.id) as f64,
        "calls" => cache.count_calls(node.id) as f64,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metric_expression_with_ge_operator() {
        let expr = parse("cyclomatic(*) >= 3").unwrap();
        match expr {
            QueryExpr::Metric { metric, op, value, .. } => {
                assert_eq!(metric, "cyclomatic");
                assert_eq!(op, Op::Ge);
                assert_eq!(value, 3.0);
            }
            _ => panic!("expected metric expression"),
        }
    }

    #[test]
    fn ge_is_chosen_over_gt_for_prefix_match() {
        let expr = parse("lines(*) >= 100").unwrap();
        match expr {
            QueryExpr::Metric { op, .. } => assert_eq!(op, Op::Ge),
            _ => panic!("expected metric expression"),
        }
    }

    #[test]
    fn empty_parens_default_pattern_to_wildcard() {
        let expr = parse("params() > 4").unwrap();
        match expr {
            QueryExpr::Metric { pattern, .. } => assert!(pattern.matches(&sample_node())),
            _ => panic!("expected metric expression"),
        }
    }

    #[test]
    fn bare_pattern_has_no_metric() {
        assert!(matches!(parse("*Controller*").unwrap(), QueryExpr::Pattern(_)));
    }

    #[test]
    fn unknown_metric_is_rejected() {
        assert!(matches!(parse("bogus(*) > 1"), Err(QueryError::InvalidMetric { .. })));
    }

    #[test]
    fn missing_operator_is_rejected() {
        assert!(matches!(parse("cyclomatic(*)"), Err(QueryError::MissingOperator { .. })));
    }

    fn sample_node() -> AstNode {
        use crate::model::{ExportKind, Language, NodeFlags, NodeKind};
        use crate::types::{compact_string, FileId, NodeId};
        AstNode {
            id: NodeId::new(1).unwrap(),
            file_id: FileId::new(1).unwrap(),
            file_path: "/repo/main.go".into(),
            package: compact_string("main"),
            type_name: compact_string(""),
            method: compact_string("Handle"),
            field: compact_string(""),
            kind: NodeKind::Method,
            language: Language::Go,
            start_line: 1,
            end_line: 10,
            line_count: 10,
            cyclomatic: 2,
            parameter_count: 6,
            return_count: 1,
            parameters: vec![],
            returns: vec![],
            flags: NodeFlags::empty(),
            export_kind: ExportKind::None,
            last_modified: chrono::Utc::now(),
        }
    }
}
