//! TypeScript extractor. Reuses [`javascript::extract_with_language`]: the
//! two grammars share enough shape (classes, methods, calls, imports) that a
//! second hand-written walk would just be the first one copied.

use crate::error::ExtractError;
use crate::model::{ExtractionResult, Language};
use crate::parsing::javascript;
use std::path::Path;

pub fn extract(path: &Path, source: &str) -> Result<ExtractionResult, ExtractError> {
    let is_tsx = path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("tsx")).unwrap_or(false);
    let ts_language = if is_tsx {
        tree_sitter_typescript::LANGUAGE_TSX.into()
    } else {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    };
    javascript::extract_with_language(path, source, Language::TypeScript, ts_language)
}
