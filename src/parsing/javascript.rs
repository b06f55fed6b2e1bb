//! JavaScript extractor, backed by `tree-sitter-javascript`.
//!
//! [`extract_with_language`] is shared with the TypeScript extractor: the
//! two grammars agree closely enough on class/function/call shapes that a
//! single tagged walk covers both, parameterized only by which
//! `tree_sitter::Language` to parse with and which [`Language`] tag to stamp
//! on the result.

use crate::error::ExtractError;
use crate::model::{
    ExportKind, ExtractionResult, Language, LogicalKey, NodeFlags, NodeKind, Parameter, RawNode,
    RawRelationship, RawTarget, RelationshipKind, ReturnValue,
};
use crate::parsing::complexity::{cyclomatic_complexity, ComplexityRule};
use crate::types::compact_string;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Globals callable without an import. A bare call to one of these never
/// resolves to a node extracted from source and must not be treated as a
/// same-file target.
const BUILTINS: &[&str] = &[
    "parseInt", "parseFloat", "isNaN", "isFinite", "encodeURIComponent", "decodeURIComponent",
    "encodeURI", "decodeURI", "require", "Array", "Object", "Promise", "Map", "Set", "WeakMap",
    "WeakSet", "Symbol", "Boolean", "Number", "String", "RegExp", "Error", "TypeError",
    "RangeError", "SyntaxError", "structuredClone", "fetch", "setTimeout", "setInterval",
    "clearTimeout", "clearInterval", "queueMicrotask", "Date", "Proxy", "Reflect",
];

/// Base classes reachable without a local definition: common library and
/// runtime bases. A bare `extends` naming one of these is not a same-file
/// target.
const KNOWN_EXTERNAL_BASES: &[&str] =
    &["Error", "EventEmitter", "Component", "PureComponent", "Map", "Set", "Array", "Object"];

const DECISION_RULE: ComplexityRule = ComplexityRule {
    statement_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_case",
        "catch_clause",
        "ternary_expression",
    ],
    logical_operator_kind: "binary_expression",
    operator_field: "operator",
    logical_operators: &["&&", "||", "??"],
};

pub fn extract(path: &Path, source: &str) -> Result<ExtractionResult, ExtractError> {
    extract_with_language(path, source, Language::JavaScript, tree_sitter_javascript::LANGUAGE.into())
}

pub(crate) fn extract_with_language(
    path: &Path,
    source: &str,
    language: Language,
    ts_language: tree_sitter::Language,
) -> Result<ExtractionResult, ExtractError> {
    let mut parser = Parser::new();
    parser.set_language(&ts_language).map_err(|e| ExtractError::Syntax {
        path: path.to_path_buf(),
        language: language.as_str().to_string(),
        reason: e.to_string(),
    })?;

    let bytes = source.as_bytes();
    let tree = parser.parse(bytes, None).ok_or_else(|| ExtractError::Syntax {
        path: path.to_path_buf(),
        language: language.as_str().to_string(),
        reason: "tree-sitter produced no parse tree".to_string(),
    })?;
    let root = tree.root_node();

    let package_name = crate::parsing::package_name_from_path(path);
    let mut result = ExtractionResult::new(path.to_path_buf(), package_name.clone(), language);

    let file_key = LogicalKey {
        file_path: path.to_path_buf(),
        package: compact_string(&package_name),
        type_name: compact_string(""),
        method: compact_string(""),
        field: compact_string(""),
        kind: NodeKind::Package,
    };
    result.nodes.push(RawNode {
        package: compact_string(&package_name),
        type_name: compact_string(""),
        method: compact_string(""),
        field: compact_string(""),
        kind: NodeKind::Package,
        start_line: 1,
        end_line: (root.end_position().row + 1) as u32,
        cyclomatic: 0,
        parameters: vec![],
        returns: vec![],
        flags: NodeFlags::empty(),
        export_kind: ExportKind::None,
    });

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        walk_toplevel(child, bytes, &package_name, path, &file_key, &mut result, false);
    }

    Ok(result)
}

fn text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn walk_toplevel(
    node: Node,
    source: &[u8],
    package: &str,
    path: &Path,
    file_key: &LogicalKey,
    result: &mut ExtractionResult,
    exported: bool,
) {
    match node.kind() {
        "import_statement" => extract_import(node, source, file_key, result),
        "class_declaration" => extract_class(node, source, package, path, result, exported),
        "function_declaration" | "generator_function_declaration" => {
            extract_function(node, source, package, None, path, result, exported)
        }
        "lexical_declaration" | "variable_declaration" => {
            extract_toplevel_variable(node, source, package, path, result)
        }
        "export_statement" => {
            let is_default = node.child(1).map(|c| c.kind() == "default").unwrap_or(false);
            if let Some(decl) = node.child_by_field_name("declaration") {
                walk_toplevel(decl, source, package, path, file_key, result, true);
                if is_default {
                    if let Some(last) = result.nodes.last_mut() {
                        last.export_kind = ExportKind::Default;
                    }
                }
            }
        }
        _ => {}
    }
}

fn extract_import(node: Node, source: &[u8], from_key: &LogicalKey, result: &mut ExtractionResult) {
    if let Some(source_node) = node.child_by_field_name("source") {
        let module = text(source_node, source).trim_matches(|c| c == '"' || c == '\'');
        result.relationships.push(RawRelationship {
            from: from_key.clone(),
            target: RawTarget::External,
            line_no: (node.start_position().row + 1) as u32,
            kind: RelationshipKind::Import,
            text: compact_string(module),
        });
    }
}

fn extract_class(
    node: Node,
    source: &[u8],
    package: &str,
    path: &Path,
    result: &mut ExtractionResult,
    exported: bool,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let type_name = text(name_node, source);

    result.nodes.push(RawNode {
        package: compact_string(package),
        type_name: compact_string(type_name),
        method: compact_string(""),
        field: compact_string(""),
        kind: NodeKind::Type,
        start_line: (node.start_position().row + 1) as u32,
        end_line: (node.end_position().row + 1) as u32,
        cyclomatic: 0,
        parameters: vec![],
        returns: vec![],
        flags: NodeFlags::empty(),
        export_kind: if exported { ExportKind::Named } else { ExportKind::None },
    });

    if let Some(heritage) = node.child_by_field_name("superclass") {
        let super_name = text(heritage, source);
        let target = if heritage.kind() != "identifier" || KNOWN_EXTERNAL_BASES.contains(&super_name) {
            RawTarget::External
        } else {
            RawTarget::SameFile(LogicalKey {
                file_path: path.to_path_buf(),
                package: compact_string(package),
                type_name: compact_string(super_name),
                method: compact_string(""),
                field: compact_string(""),
                kind: NodeKind::Type,
            })
        };
        result.relationships.push(RawRelationship {
            from: LogicalKey {
                file_path: path.to_path_buf(),
                package: compact_string(package),
                type_name: compact_string(type_name),
                method: compact_string(""),
                field: compact_string(""),
                kind: NodeKind::Type,
            },
            target,
            line_no: (heritage.start_position().row + 1) as u32,
            kind: RelationshipKind::Extends,
            text: compact_string(super_name),
        });
    }

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            match member.kind() {
                "method_definition" => extract_method(member, source, package, type_name, path, result),
                "field_definition" | "public_field_definition" => {
                    extract_class_field(member, source, package, type_name, result)
                }
                _ => {}
            }
        }
    }
}

fn extract_class_field(node: Node, source: &[u8], package: &str, type_name: &str, result: &mut ExtractionResult) {
    let Some(name_node) = node.child_by_field_name("property") else {
        return;
    };
    let field_name = text(name_node, source);
    result.nodes.push(RawNode {
        package: compact_string(package),
        type_name: compact_string(type_name),
        method: compact_string(""),
        field: compact_string(field_name),
        kind: NodeKind::Field,
        start_line: (node.start_position().row + 1) as u32,
        end_line: (node.end_position().row + 1) as u32,
        cyclomatic: 0,
        parameters: vec![],
        returns: vec![],
        flags: NodeFlags::empty(),
        export_kind: ExportKind::None,
    });
}

fn extract_method(node: Node, source: &[u8], package: &str, type_name: &str, path: &Path, result: &mut ExtractionResult) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let method_name = text(name_node, source);
    let mut walk_cursor = node.walk();
    let direct_children: Vec<Node> = node.children(&mut walk_cursor).collect();
    let is_async = direct_children.iter().any(|c| c.kind() == "async");
    let is_generator = direct_children.iter().any(|c| c.kind() == "*");

    let parameters = extract_parameters(node.child_by_field_name("parameters"), source);
    let returns = node
        .child_by_field_name("return_type")
        .map(|t| vec![ReturnValue::new(None, Some(text(t, source)))])
        .unwrap_or_default();

    let body = node.child_by_field_name("body");
    let complexity = body
        .map(|b| cyclomatic_complexity(b, source, &DECISION_RULE))
        .unwrap_or(1);

    let mut flags = NodeFlags::empty();
    if is_async {
        flags |= NodeFlags::ASYNC;
    }
    if is_generator {
        flags |= NodeFlags::GENERATOR;
    }

    result.nodes.push(RawNode {
        package: compact_string(package),
        type_name: compact_string(type_name),
        method: compact_string(method_name),
        field: compact_string(""),
        kind: NodeKind::Method,
        start_line: (node.start_position().row + 1) as u32,
        end_line: (node.end_position().row + 1) as u32,
        cyclomatic: complexity,
        parameters,
        returns,
        flags,
        export_kind: ExportKind::None,
    });

    if let Some(body) = body {
        let from_key = LogicalKey {
            file_path: path.to_path_buf(),
            package: compact_string(package),
            type_name: compact_string(type_name),
            method: compact_string(method_name),
            field: compact_string(""),
            kind: NodeKind::Method,
        };
        extract_calls(body, source, package, &from_key, result);
    }
}

fn extract_function(
    node: Node,
    source: &[u8],
    package: &str,
    type_name: Option<&str>,
    path: &Path,
    result: &mut ExtractionResult,
    exported: bool,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let method_name = text(name_node, source);
    let type_name_str = type_name.unwrap_or("");
    let is_async = node.child(0).map(|c| c.kind() == "async").unwrap_or(false);
    let is_generator = node.kind() == "generator_function_declaration";

    let parameters = extract_parameters(node.child_by_field_name("parameters"), source);
    let returns = node
        .child_by_field_name("return_type")
        .map(|t| vec![ReturnValue::new(None, Some(text(t, source)))])
        .unwrap_or_default();

    let body = node.child_by_field_name("body");
    let complexity = body
        .map(|b| cyclomatic_complexity(b, source, &DECISION_RULE))
        .unwrap_or(1);

    let mut flags = NodeFlags::empty();
    if is_async {
        flags |= NodeFlags::ASYNC;
    }
    if is_generator {
        flags |= NodeFlags::GENERATOR;
    }

    result.nodes.push(RawNode {
        package: compact_string(package),
        type_name: compact_string(type_name_str),
        method: compact_string(method_name),
        field: compact_string(""),
        kind: NodeKind::Method,
        start_line: (node.start_position().row + 1) as u32,
        end_line: (node.end_position().row + 1) as u32,
        cyclomatic: complexity,
        parameters,
        returns,
        flags,
        export_kind: if exported { ExportKind::Named } else { ExportKind::None },
    });

    if let Some(body) = body {
        let from_key = LogicalKey {
            file_path: path.to_path_buf(),
            package: compact_string(package),
            type_name: compact_string(type_name_str),
            method: compact_string(method_name),
            field: compact_string(""),
            kind: NodeKind::Method,
        };
        extract_calls(body, source, package, &from_key, result);
    }
}

fn extract_toplevel_variable(node: Node, source: &[u8], package: &str, path: &Path, result: &mut ExtractionResult) {
    let mut cursor = node.walk();
    for declarator in node.children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = declarator.child_by_field_name("name") else {
            continue;
        };
        if name_node.kind() != "identifier" {
            continue;
        }
        let name = text(name_node, source);

        let is_arrow = declarator
            .child_by_field_name("value")
            .map(|v| v.kind() == "arrow_function")
            .unwrap_or(false);

        if is_arrow {
            let value = declarator.child_by_field_name("value").unwrap();
            let parameters = extract_parameters(value.child_by_field_name("parameters"), source);
            let is_async = value.child(0).map(|c| c.kind() == "async").unwrap_or(false);
            let body = value.child_by_field_name("body");
            let complexity = body
                .map(|b| cyclomatic_complexity(b, source, &DECISION_RULE))
                .unwrap_or(1);
            let mut flags = NodeFlags::ARROW;
            if is_async {
                flags |= NodeFlags::ASYNC;
            }
            result.nodes.push(RawNode {
                package: compact_string(package),
                type_name: compact_string(""),
                method: compact_string(name),
                field: compact_string(""),
                kind: NodeKind::Method,
                start_line: (declarator.start_position().row + 1) as u32,
                end_line: (declarator.end_position().row + 1) as u32,
                cyclomatic: complexity,
                parameters,
                returns: vec![],
                flags,
                export_kind: ExportKind::None,
            });
            if let Some(body) = body {
                let from_key = LogicalKey {
                    file_path: path.to_path_buf(),
                    package: compact_string(package),
                    type_name: compact_string(""),
                    method: compact_string(name),
                    field: compact_string(""),
                    kind: NodeKind::Method,
                };
                extract_calls(body, source, package, &from_key, result);
            }
        } else {
            result.nodes.push(RawNode {
                package: compact_string(package),
                type_name: compact_string(""),
                method: compact_string(name),
                field: compact_string(""),
                kind: NodeKind::Variable,
                start_line: (declarator.start_position().row + 1) as u32,
                end_line: (declarator.end_position().row + 1) as u32,
                cyclomatic: 0,
                parameters: vec![],
                returns: vec![],
                flags: NodeFlags::empty(),
                export_kind: ExportKind::None,
            });
        }
    }
}

fn extract_parameters(params_node: Option<Node>, source: &[u8]) -> Vec<Parameter> {
    let Some(params_node) = params_node else {
        return vec![];
    };
    let mut out = Vec::new();
    let mut cursor = params_node.walk();
    for param in params_node.named_children(&mut cursor) {
        match param.kind() {
            "identifier" => out.push(Parameter::new(Some(text(param, source)), None, false)),
            "required_parameter" | "optional_parameter" => {
                let name = param.child_by_field_name("pattern").map(|p| text(p, source));
                let type_name = param
                    .child_by_field_name("type")
                    .and_then(|t| t.named_child(0))
                    .map(|t| text(t, source));
                out.push(Parameter::new(name, type_name, param.kind() == "optional_parameter"));
            }
            "assignment_pattern" => {
                let name = param.child_by_field_name("left").map(|n| text(n, source));
                out.push(Parameter::new(name, None, true));
            }
            "rest_pattern" => {
                let name = param.named_child(0).map(|n| text(n, source));
                out.push(Parameter::new(name, None, false));
            }
            _ => {}
        }
    }
    out
}

fn extract_calls(body: Node, source: &[u8], package: &str, from_key: &LogicalKey, result: &mut ExtractionResult) {
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "call_expression" {
            if let Some(function) = node.child_by_field_name("function") {
                let line_no = (node.start_position().row + 1) as u32;
                let call_text = text(function, source);
                let target = if function.kind() == "member_expression" {
                    let object = function.child_by_field_name("object").map(|o| text(o, source)).unwrap_or("");
                    let property = function.child_by_field_name("property").map(|p| text(p, source)).unwrap_or("");
                    if crate::library::lookup(crate::model::Language::JavaScript, object, property).is_some() {
                        RawTarget::Library {
                            package: compact_string(object),
                            class: compact_string(""),
                            method: compact_string(property),
                        }
                    } else {
                        RawTarget::External
                    }
                } else if BUILTINS.contains(&call_text) {
                    RawTarget::External
                } else {
                    RawTarget::SameFile(LogicalKey {
                        file_path: from_key.file_path.clone(),
                        package: compact_string(package),
                        type_name: compact_string(""),
                        method: compact_string(call_text),
                        field: compact_string(""),
                        kind: NodeKind::Method,
                    })
                };

                result.relationships.push(RawRelationship {
                    from: from_key.clone(),
                    target,
                    line_no,
                    kind: RelationshipKind::Call,
                    text: compact_string(call_text),
                });
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
}
