//! Node patterns: `package:type:method:field` with globbing.
//!
//! Compiled once at parse time into a [`CompiledPattern`] so repeated scans
//! over the cache never re-parse the same string.

use crate::error::QueryError;
use crate::model::{AstNode, NodeKind};
use glob::{MatchOptions, Pattern};
use std::path::Path;

const GLOB_OPTS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
pub enum FieldMatcher {
    Any,
    Exact(Box<str>),
    Glob(Pattern),
}

impl FieldMatcher {
    fn compile(segment: &str) -> Self {
        if segment.is_empty() {
            FieldMatcher::Any
        } else if segment.contains('*') || segment.contains('?') || segment.contains('[') {
            match Pattern::new(segment) {
                Ok(p) => FieldMatcher::Glob(p),
                Err(_) => FieldMatcher::Exact(segment.into()),
            }
        } else {
            FieldMatcher::Exact(segment.into())
        }
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            FieldMatcher::Any => true,
            FieldMatcher::Exact(s) => s.as_ref() == value,
            FieldMatcher::Glob(p) => p.matches_with(value, GLOB_OPTS),
        }
    }
}

/// A compiled node pattern. Either a positional four-field pattern
/// (`package:type:method:field`) or a bare name pattern matched against
/// whichever field is the node's primary identifying name for its kind.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    Positional {
        negated: bool,
        language: Option<FieldMatcher>,
        package: FieldMatcher,
        type_name: FieldMatcher,
        method: FieldMatcher,
        field: FieldMatcher,
    },
    Name {
        negated: bool,
        name: FieldMatcher,
    },
}

impl CompiledPattern {
    /// Parses a pattern string. `*` alone matches every node in scope.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let (negated, body) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        if body.is_empty() {
            return Err(QueryError::InvalidPattern {
                pattern: raw.to_string(),
                reason: "pattern must not be empty".to_string(),
            });
        }

        if !body.contains(':') {
            return Ok(CompiledPattern::Name {
                negated,
                name: FieldMatcher::compile(body),
            });
        }

        let mut segments = body.splitn(4, ':');
        let package = FieldMatcher::compile(segments.next().unwrap_or(""));
        let type_name = FieldMatcher::compile(segments.next().unwrap_or(""));
        let method = FieldMatcher::compile(segments.next().unwrap_or(""));
        let field = FieldMatcher::compile(segments.next().unwrap_or(""));

        Ok(CompiledPattern::Positional {
            negated,
            language: None,
            package,
            type_name,
            method,
            field,
        })
    }

    pub fn with_language(self, language: FieldMatcher) -> Self {
        match self {
            CompiledPattern::Positional { negated, package, type_name, method, field, .. } => {
                CompiledPattern::Positional {
                    negated,
                    language: Some(language),
                    package,
                    type_name,
                    method,
                    field,
                }
            }
            other => other,
        }
    }

    fn raw_matches(&self, node: &AstNode) -> bool {
        match self {
            CompiledPattern::Name { name, .. } => {
                let value = match node.kind {
                    NodeKind::Package => node.package.as_ref(),
                    NodeKind::Type => node.type_name.as_ref(),
                    NodeKind::Method => node.method.as_ref(),
                    NodeKind::Field => node.field.as_ref(),
                    NodeKind::Variable => {
                        if !node.field.is_empty() {
                            node.field.as_ref()
                        } else {
                            node.method.as_ref()
                        }
                    }
                };
                name.matches(value)
            }
            CompiledPattern::Positional {
                language,
                package,
                type_name,
                method,
                field,
                ..
            } => {
                if let Some(lang) = language {
                    if !lang.matches(node.language.as_str()) {
                        return false;
                    }
                }
                package.matches(node.package.as_ref())
                    && type_name.matches(node.type_name.as_ref())
                    && method.matches(node.method.as_ref())
                    && field.matches(node.field.as_ref())
            }
        }
    }

    fn negated(&self) -> bool {
        match self {
            CompiledPattern::Name { negated, .. } => *negated,
            CompiledPattern::Positional { negated, .. } => *negated,
        }
    }

    pub fn matches(&self, node: &AstNode) -> bool {
        self.raw_matches(node) != self.negated()
    }

    /// Matches and additionally scopes by working-directory prefix.
    pub fn matches_scoped(&self, node: &AstNode, workdir: &Path) -> bool {
        node.file_path.starts_with(workdir) && self.matches(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExportKind, Language, NodeFlags};
    use crate::types::{compact_string, FileId, NodeId};
    use std::path::PathBuf;

    fn node(kind: NodeKind, package: &str, type_name: &str, method: &str, field: &str) -> AstNode {
        AstNode {
            id: NodeId::new(1).unwrap(),
            file_id: FileId::new(1).unwrap(),
            file_path: PathBuf::from("/repo/src/main.go"),
            package: compact_string(package),
            type_name: compact_string(type_name),
            method: compact_string(method),
            field: compact_string(field),
            kind,
            language: Language::Go,
            start_line: 1,
            end_line: 2,
            line_count: 2,
            cyclomatic: 1,
            parameter_count: 0,
            return_count: 0,
            parameters: vec![],
            returns: vec![],
            flags: NodeFlags::empty(),
            export_kind: ExportKind::None,
            last_modified: chrono::Utc::now(),
        }
    }

    #[test]
    fn bare_star_matches_everything() {
        let pat = CompiledPattern::parse("*").unwrap();
        assert!(pat.matches(&node(NodeKind::Type, "main", "Calculator", "", "")));
        assert!(pat.matches(&node(NodeKind::Method, "main", "Calculator", "Add", "")));
    }

    #[test]
    fn bare_name_pattern_matches_kind_appropriate_field() {
        let pat = CompiledPattern::parse("*Controller*").unwrap();
        assert!(pat.matches(&node(NodeKind::Type, "pkg", "UserController", "", "")));
        assert!(!pat.matches(&node(NodeKind::Method, "pkg", "UserController", "GetUser", "")));
    }

    #[test]
    fn positional_pattern_matches_method_prefix_across_types() {
        let pat = CompiledPattern::parse("*:*:Get*").unwrap();
        assert!(pat.matches(&node(NodeKind::Method, "pkg", "UserController", "GetUser", "")));
        assert!(pat.matches(&node(NodeKind::Method, "pkg", "OrderController", "GetOrder", "")));
        assert!(!pat.matches(&node(NodeKind::Method, "pkg", "UserService", "FindUser", "")));
    }

    #[test]
    fn negation_inverts_match() {
        let pat = CompiledPattern::parse("!*Controller*").unwrap();
        assert!(!pat.matches(&node(NodeKind::Type, "pkg", "UserController", "", "")));
        assert!(pat.matches(&node(NodeKind::Type, "pkg", "UserService", "", "")));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(CompiledPattern::parse("").is_err());
    }
}
