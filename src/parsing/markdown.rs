//! Markdown extractor, backed by `pulldown-cmark` rather than tree-sitter:
//! Markdown has no call graph or cyclomatic complexity, only a heading
//! hierarchy, so it is modeled as a tree of `type` (H1) and `field` (H2+)
//! nodes, with link targets recorded as `reference` edges from the nearest
//! enclosing H1.

use crate::error::ExtractError;
use crate::model::{
    ExportKind, ExtractionResult, Language, LogicalKey, NodeFlags, NodeKind, RawNode,
    RawRelationship, RawTarget, RelationshipKind,
};
use crate::types::compact_string;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::path::Path;

pub fn extract(path: &Path, source: &str) -> Result<ExtractionResult, ExtractError> {
    let package_name = crate::parsing::package_name_from_path(path);
    let mut result = ExtractionResult::new(path.to_path_buf(), package_name.clone(), Language::Markdown);

    let mut current_top = String::new();
    let mut line_no: u32 = 1;
    let mut heading_text = String::new();
    let mut heading_level: Option<HeadingLevel> = None;

    for (event, range) in Parser::new(source).into_offset_iter() {
        line_no = 1 + source[..range.start].matches('\n').count() as u32;

        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading_level = Some(level);
                heading_text.clear();
            }
            Event::End(TagEnd::Heading(_)) => {
                let title = heading_text.trim().to_string();
                if let (false, Some(level)) = (title.is_empty(), heading_level.take()) {
                    if level == HeadingLevel::H1 {
                        current_top = title.clone();
                        result.nodes.push(RawNode {
                            package: compact_string(&package_name),
                            type_name: compact_string(&title),
                            method: compact_string(""),
                            field: compact_string(""),
                            kind: NodeKind::Type,
                            start_line: line_no,
                            end_line: line_no,
                            cyclomatic: 0,
                            parameters: vec![],
                            returns: vec![],
                            flags: NodeFlags::empty(),
                            export_kind: ExportKind::None,
                        });
                    } else {
                        result.nodes.push(RawNode {
                            package: compact_string(&package_name),
                            type_name: compact_string(&current_top),
                            method: compact_string(""),
                            field: compact_string(&title),
                            kind: NodeKind::Field,
                            start_line: line_no,
                            end_line: line_no,
                            cyclomatic: 0,
                            parameters: vec![],
                            returns: vec![],
                            flags: NodeFlags::empty(),
                            export_kind: ExportKind::None,
                        });
                    }
                }
            }
            Event::Text(text) if heading_level.is_some() => heading_text.push_str(&text),
            Event::Code(text) if heading_level.is_some() => heading_text.push_str(&text),
            Event::Start(Tag::Link { dest_url, .. }) => {
                if !current_top.is_empty() {
                    result.relationships.push(RawRelationship {
                        from: LogicalKey {
                            file_path: path.to_path_buf(),
                            package: compact_string(&package_name),
                            type_name: compact_string(&current_top),
                            method: compact_string(""),
                            field: compact_string(""),
                            kind: NodeKind::Type,
                        },
                        target: RawTarget::External,
                        line_no,
                        kind: RelationshipKind::Reference,
                        text: compact_string(dest_url.as_ref()),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(result)
}
