//! Per-language extractors producing a normalized [`ExtractionResult`].
//!
//! A narrow, tagged-variant dispatch rather than a `dyn` trait object
//! hierarchy: five concrete extractors, one per [`Language`], matching the
//! design note that the per-language abstraction should stay small and
//! uniform rather than grow a deep hierarchy.

pub mod complexity;
pub mod go;
pub mod javascript;
pub mod markdown;
pub mod python;
pub mod typescript;

use crate::error::ExtractError;
use crate::model::{ExtractionResult, Language};
use std::path::Path;

/// Selects the extractor for `language` and runs it over `source`.
pub fn extract(language: Language, path: &Path, source: &str) -> Result<ExtractionResult, ExtractError> {
    match language {
        Language::Go => go::extract(path, source),
        Language::Python => python::extract(path, source),
        Language::JavaScript => javascript::extract(path, source),
        Language::TypeScript => typescript::extract(path, source),
        Language::Markdown => markdown::extract(path, source),
    }
}

/// Derives a package name from a file's directory hierarchy: the
/// immediate parent directory name, or `"."` at the analysis root.
pub(crate) fn package_name_from_path(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(".")
        .to_string()
}
