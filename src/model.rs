//! The uniform AST model: nodes, relationships, and the library catalog.
//!
//! This is the data every language extractor produces and every cache query
//! consumes. See spec §3 for the authoritative invariants.

use crate::types::{compact_string, CompactString, FileId, NodeId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Package,
    Type,
    Method,
    Field,
    Variable,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Package => "package",
            NodeKind::Type => "type",
            NodeKind::Method => "method",
            NodeKind::Field => "field",
            NodeKind::Variable => "variable",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    Call,
    Import,
    Extends,
    Reference,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Call => "call",
            RelationshipKind::Import => "import",
            RelationshipKind::Extends => "extends",
            RelationshipKind::Reference => "reference",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Go,
    Python,
    JavaScript,
    TypeScript,
    Markdown,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "go" => Some(Language::Go),
            "py" | "pyi" => Some(Language::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" => Some(Language::TypeScript),
            "md" | "mdx" | "markdown" => Some(Language::Markdown),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Markdown => "markdown",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Carried-through JS/TS syntactic flags that no AQL metric currently
    /// consumes (open question in spec §9, resolved by keeping them).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct NodeFlags: u8 {
        const ASYNC     = 0b0001;
        const GENERATOR = 0b0010;
        const ARROW     = 0b0100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportKind {
    Default,
    Named,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: Option<CompactString>,
    pub type_name: Option<CompactString>,
    pub has_default: bool,
}

impl Parameter {
    pub fn new(name: Option<&str>, type_name: Option<&str>, has_default: bool) -> Self {
        Self {
            name: name.map(compact_string),
            type_name: type_name.map(compact_string),
            has_default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnValue {
    pub name: Option<CompactString>,
    pub type_name: Option<CompactString>,
}

impl ReturnValue {
    pub fn new(name: Option<&str>, type_name: Option<&str>) -> Self {
        Self {
            name: name.map(compact_string),
            type_name: type_name.map(compact_string),
        }
    }
}

/// The logical key identifying a node regardless of surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalKey {
    pub file_path: PathBuf,
    pub package: CompactString,
    pub type_name: CompactString,
    pub method: CompactString,
    pub field: CompactString,
    pub kind: NodeKind,
}

/// A named syntactic entity extracted from a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    pub id: NodeId,
    pub file_id: FileId,
    pub file_path: PathBuf,
    pub package: CompactString,
    pub type_name: CompactString,
    pub method: CompactString,
    pub field: CompactString,
    pub kind: NodeKind,
    pub language: Language,

    pub start_line: u32,
    pub end_line: u32,
    pub line_count: u32,

    pub cyclomatic: u32,
    pub parameter_count: u32,
    pub return_count: u32,

    pub parameters: Vec<Parameter>,
    pub returns: Vec<ReturnValue>,

    pub flags: NodeFlags,
    pub export_kind: ExportKind,

    /// Mirrors the source file's mtime at extraction time.
    pub last_modified: chrono::DateTime<chrono::Utc>,
}

impl AstNode {
    pub fn logical_key(&self) -> LogicalKey {
        LogicalKey {
            file_path: self.file_path.clone(),
            package: self.package.clone(),
            type_name: self.type_name.clone(),
            method: self.method.clone(),
            field: self.field.clone(),
            kind: self.kind,
        }
    }

    /// `package:type:method:field [kind]` — the textual fingerprint the
    /// `len` metric measures, verbatim, trailing annotation included.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}:{} [{}]",
            self.package, self.type_name, self.method, self.field, self.kind
        )
    }

    /// Fingerprint without the trailing `[kind]` annotation, used for
    /// violation messages and display, not for the `len` metric.
    pub fn short_fingerprint(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.package, self.type_name, self.method, self.field
        )
    }
}

/// A directed edge between two AST nodes, or from a node to an external
/// (unresolved) target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstRelationship {
    pub id: NodeId,
    pub from_id: NodeId,
    pub to_id: Option<NodeId>,
    pub line_no: u32,
    pub kind: RelationshipKind,
    pub text: CompactString,
}

/// A catalog entry for an external (library/framework) symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryNode {
    pub id: NodeId,
    pub package: CompactString,
    pub class: CompactString,
    pub method: CompactString,
    pub field: CompactString,
    pub kind: NodeKind,
    pub language: Language,
    pub framework: CompactString,
}

/// An edge from an `AstNode` to a `LibraryNode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryRelationship {
    pub id: NodeId,
    pub ast_id: NodeId,
    pub library_id: NodeId,
    pub line_no: u32,
    pub kind: RelationshipKind,
    pub text: CompactString,
}

/// A relationship target that hasn't been assigned a surrogate id yet: it
/// may point at another node in the same extraction result (resolved by
/// logical key at cache-commit time), at a known library symbol, or nowhere
/// (an unresolved external call).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RawTarget {
    /// Resolved against another node produced by the same extraction.
    SameFile(LogicalKey),
    /// A known external namespace; resolved against the library catalog.
    Library {
        package: CompactString,
        class: CompactString,
        method: CompactString,
    },
    /// Unresolved external reference; recorded with descriptive text only.
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRelationship {
    pub from: LogicalKey,
    pub target: RawTarget,
    pub line_no: u32,
    pub kind: RelationshipKind,
    pub text: CompactString,
}

/// A single extracted node before surrogate-id assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub package: CompactString,
    pub type_name: CompactString,
    pub method: CompactString,
    pub field: CompactString,
    pub kind: NodeKind,
    pub start_line: u32,
    pub end_line: u32,
    pub cyclomatic: u32,
    pub parameters: Vec<Parameter>,
    pub returns: Vec<ReturnValue>,
    pub flags: NodeFlags,
    pub export_kind: ExportKind,
}

impl RawNode {
    pub fn logical_key(&self, file_path: &Path) -> LogicalKey {
        LogicalKey {
            file_path: file_path.to_path_buf(),
            package: self.package.clone(),
            type_name: self.type_name.clone(),
            method: self.method.clone(),
            field: self.field.clone(),
            kind: self.kind,
        }
    }
}

/// What a language extractor produces for one file. Mirrors the uniform
/// JSON contract in spec §6, minus the subprocess indirection: every
/// extractor in this crate runs in-process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub file_path: PathBuf,
    pub package_name: CompactString,
    pub language: Language,
    pub nodes: Vec<RawNode>,
    pub relationships: Vec<RawRelationship>,
}

impl ExtractionResult {
    pub fn new(file_path: PathBuf, package_name: impl Into<CompactString>, language: Language) -> Self {
        Self {
            file_path,
            package_name: package_name.into(),
            language,
            nodes: Vec::new(),
            relationships: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> AstNode {
        AstNode {
            id: NodeId::new(1).unwrap(),
            file_id: FileId::new(1).unwrap(),
            file_path: PathBuf::from("/repo/main.go"),
            package: compact_string("main"),
            type_name: compact_string("Calculator"),
            method: compact_string("Add"),
            field: compact_string(""),
            kind: NodeKind::Method,
            language: Language::Go,
            start_line: 10,
            end_line: 14,
            line_count: 5,
            cyclomatic: 2,
            parameter_count: 1,
            return_count: 1,
            parameters: vec![],
            returns: vec![],
            flags: NodeFlags::empty(),
            export_kind: ExportKind::None,
            last_modified: chrono::Utc::now(),
        }
    }

    #[test]
    fn fingerprint_includes_kind_annotation() {
        let node = sample_node();
        assert_eq!(node.fingerprint(), "main:Calculator:Add: [method]");
    }

    #[test]
    fn short_fingerprint_omits_kind() {
        let node = sample_node();
        assert_eq!(node.short_fingerprint(), "main:Calculator:Add:");
    }

    #[test]
    fn language_detected_by_extension_for_every_spec_listed_suffix() {
        for (ext, lang) in [
            ("go", Language::Go),
            ("py", Language::Python),
            ("pyi", Language::Python),
            ("js", Language::JavaScript),
            ("jsx", Language::JavaScript),
            ("mjs", Language::JavaScript),
            ("cjs", Language::JavaScript),
            ("ts", Language::TypeScript),
            ("tsx", Language::TypeScript),
            ("md", Language::Markdown),
            ("mdx", Language::Markdown),
            ("markdown", Language::Markdown),
        ] {
            assert_eq!(Language::from_extension(ext), Some(lang));
        }
        assert_eq!(Language::from_extension("rs"), None);
    }
}
