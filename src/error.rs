//! Error types for the AST cache and query engine.
//!
//! Structured error types using `thiserror`, one enum per subsystem, each
//! convertible into the top-level [`AstCacheError`] at the CLI boundary.

use crate::types::{FileId, NodeId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from a single-file extraction attempt. Recoverable: the
/// coordinator records these and continues with the next file.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid UTF-8 in '{path}'")]
    InvalidUtf8 { path: PathBuf },

    #[error("failed to parse {language} file '{path}': {reason}")]
    Syntax {
        path: PathBuf,
        language: String,
        reason: String,
    },

    #[error("unsupported file extension '{extension}' for file '{path}'")]
    UnsupportedLanguage { path: PathBuf, extension: String },

    /// Kept for interface fidelity with the external single-file parser
    /// contract described in the spec; unused by any in-process extractor.
    #[error("external parser for '{path}' exited with {status}: {stderr}")]
    ExternalParser {
        path: PathBuf,
        status: i32,
        stderr: String,
    },
}

/// Errors from the cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to read cache file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize cache snapshot: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("cache integrity violation: {reason}")]
    Integrity { reason: String },

    #[error("node {id} not found in cache")]
    NodeNotFound { id: NodeId },

    #[error("file {id:?} not found in cache")]
    FileNotFound { id: FileId },
}

/// Errors from compiling or evaluating an AQL expression. Recoverable at
/// the query-caller boundary: no cache state is mutated.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("unknown metric '{metric}', expected one of: lines, cyclomatic, parameters, returns, len, imports, calls")]
    InvalidMetric { metric: String },

    #[error("invalid comparison operator '{operator}'")]
    InvalidOperator { operator: String },

    #[error("invalid numeric value '{value}' in expression '{expr}'")]
    InvalidValue { value: String, expr: String },

    #[error("expression '{expr}' is missing a comparison operator")]
    MissingOperator { expr: String },

    #[error("unterminated parenthesis in expression '{expr}'")]
    UnterminatedParen { expr: String },

    #[error("empty query expression")]
    Empty,
}

/// Errors from rule-set parsing and evaluation.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("invalid clause '{name}': {reason}")]
    InvalidClause { name: String, reason: String },

    #[error("failed to parse rule set '{path}': {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to read rule set '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Top-level error type for the CLI boundary.
#[derive(Error, Debug)]
pub enum AstCacheError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("cancelled")]
    Cancelled,

    #[error("operation on '{path}' timed out after {elapsed_ms}ms")]
    Timeout { path: PathBuf, elapsed_ms: u64 },

    #[error("{0}")]
    General(String),
}

impl AstCacheError {
    /// Recovery suggestions surfaced by the CLI alongside the error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Cache(CacheError::Integrity { .. }) => vec![
                "run 'astcache rebuild' to regenerate the cache from scratch",
                "check disk space and permissions in the workspace directory",
            ],
            Self::Cache(CacheError::Io { .. }) => vec![
                "check that the cache file exists and is readable",
                "run 'astcache rebuild' if the cache file is missing",
            ],
            Self::Extract(ExtractError::UnsupportedLanguage { .. }) => vec![
                "supported extensions are .go, .py, .js, .jsx, .mjs, .cjs, .ts, .tsx, .md, .mdx, .markdown",
            ],
            Self::Query(_) => vec!["see 'astcache query --help' for pattern and metric syntax"],
            Self::Timeout { .. } => vec!["increase the per-file timeout in settings.toml"],
            _ => vec![],
        }
    }

    /// Maps this error onto the CLI exit code it should produce.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;
pub type CacheResult<T> = Result<T, CacheError>;
pub type QueryResult<T> = Result<T, QueryError>;
pub type RuleResult<T> = Result<T, RuleError>;
pub type AstCacheResult<T> = Result<T, AstCacheError>;

/// Helper trait for attaching file-path context to a foreign error.
pub trait ErrorContext<T> {
    fn with_path(self, path: &std::path::Path) -> Result<T, ExtractError>;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_path(self, path: &std::path::Path) -> Result<T, ExtractError> {
        self.map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
