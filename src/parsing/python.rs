//! Python extractor, backed by `tree-sitter-python`.

use crate::error::ExtractError;
use crate::model::{
    ExportKind, ExtractionResult, Language, LogicalKey, NodeFlags, NodeKind, Parameter, RawNode,
    RawRelationship, RawTarget, RelationshipKind, ReturnValue,
};
use crate::parsing::complexity::{cyclomatic_complexity, ComplexityRule};
use crate::types::compact_string;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Base classes available without a local definition (builtins and the
/// handful of stdlib bases common enough to special-case). A bare
/// superclass reference naming one of these is not a same-file target.
const KNOWN_EXTERNAL_BASES: &[&str] = &[
    "object", "Exception", "BaseException", "ABC", "Enum", "IntEnum", "StrEnum", "Flag",
    "IntFlag", "TypedDict", "Protocol", "Generic", "NamedTuple", "ValueError", "TypeError",
    "KeyError", "IndexError", "RuntimeError", "StopIteration", "dict", "list", "tuple", "set",
    "str", "int", "float",
];

/// Builtins callable without an import. A bare call to one of these never
/// resolves to a node extracted from source and must not be treated as a
/// same-file target.
const BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "bytearray", "bytes", "callable", "chr", "dict", "dir",
    "divmod", "enumerate", "eval", "exec", "filter", "float", "format", "frozenset", "getattr",
    "hasattr", "hash", "hex", "id", "input", "int", "isinstance", "issubclass", "iter", "len",
    "list", "map", "max", "min", "next", "object", "oct", "open", "ord", "pow", "print",
    "property", "range", "repr", "reversed", "round", "set", "setattr", "slice", "sorted",
    "staticmethod", "classmethod", "str", "sum", "super", "tuple", "type", "vars", "zip",
];

const DECISION_RULE: ComplexityRule = ComplexityRule {
    statement_kinds: &[
        "if_statement",
        "elif_clause",
        "for_statement",
        "while_statement",
        "except_clause",
        "conditional_expression",
        "match_statement",
        "case_clause",
    ],
    logical_operator_kind: "boolean_operator",
    operator_field: "operator",
    logical_operators: &["and", "or"],
};

pub fn extract(path: &Path, source: &str) -> Result<ExtractionResult, ExtractError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ExtractError::Syntax {
            path: path.to_path_buf(),
            language: "python".to_string(),
            reason: e.to_string(),
        })?;

    let bytes = source.as_bytes();
    let tree = parser.parse(bytes, None).ok_or_else(|| ExtractError::Syntax {
        path: path.to_path_buf(),
        language: "python".to_string(),
        reason: "tree-sitter produced no parse tree".to_string(),
    })?;
    let root = tree.root_node();

    let package_name = crate::parsing::package_name_from_path(path);
    let mut result = ExtractionResult::new(path.to_path_buf(), package_name.clone(), Language::Python);

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
        match child.kind() {
            "import_statement" | "import_from_statement" => {
                extract_import(child, bytes, &file_key, &mut result)
            }
            "class_definition" => extract_class(child, bytes, &package_name, path, &mut result),
            "function_definition" => {
                extract_function(child, bytes, &package_name, None, path, &mut result)
            }
            "expression_statement" => extract_module_assignment(child, bytes, &package_name, &mut result),
            _ => {}
        }
    }

    Ok(result)
}

fn text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn extract_import(node: Node, source: &[u8], from_key: &LogicalKey, result: &mut ExtractionResult) {
    let line_no = (node.start_position().row + 1) as u32;
    let raw = text(node, source);
    result.relationships.push(RawRelationship {
        from: from_key.clone(),
        target: RawTarget::External,
        line_no,
        kind: RelationshipKind::Import,
        text: compact_string(raw.trim()),
    });
}

fn extract_class(node: Node, source: &[u8], package: &str, path: &Path, result: &mut ExtractionResult) {
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
        export_kind: ExportKind::None,
    });

    if let Some(bases) = node.child_by_field_name("superclasses") {
        let from_key = LogicalKey {
            file_path: path.to_path_buf(),
            package: compact_string(package),
            type_name: compact_string(type_name),
            method: compact_string(""),
            field: compact_string(""),
            kind: NodeKind::Type,
        };
        let mut cursor = bases.walk();
        for base in bases.named_children(&mut cursor) {
            let base_name = text(base, source);
            let target = if base.kind() != "identifier" || KNOWN_EXTERNAL_BASES.contains(&base_name) {
                RawTarget::External
            } else {
                RawTarget::SameFile(LogicalKey {
                    file_path: path.to_path_buf(),
                    package: compact_string(package),
                    type_name: compact_string(base_name),
                    method: compact_string(""),
                    field: compact_string(""),
                    kind: NodeKind::Type,
                })
            };
            result.relationships.push(RawRelationship {
                from: from_key.clone(),
                target,
                line_no: (base.start_position().row + 1) as u32,
                kind: RelationshipKind::Extends,
                text: compact_string(base_name),
            });
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for stmt in body.children(&mut cursor) {
            match stmt.kind() {
                "function_definition" => {
                    extract_function(stmt, source, package, Some(type_name), path, result)
                }
                "expression_statement" => extract_class_field(stmt, source, package, type_name, result),
                _ => {}
            }
        }
    }
}

/// `self.x = ...` inside `__init__` is handled in `extract_function`'s body
/// walk; this handles class-body-level `x: int` / `x = 1` annotations.
fn extract_class_field(node: Node, source: &[u8], package: &str, type_name: &str, result: &mut ExtractionResult) {
    let Some(inner) = node.named_child(0) else { return };
    let name_node = match inner.kind() {
        "assignment" => inner.child_by_field_name("left"),
        _ => None,
    };
    let Some(name_node) = name_node else { return };
    if name_node.kind() != "identifier" {
        return;
    }
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

fn extract_module_assignment(node: Node, source: &[u8], package: &str, result: &mut ExtractionResult) {
    let Some(inner) = node.named_child(0) else { return };
    if inner.kind() != "assignment" {
        return;
    }
    let Some(name_node) = inner.child_by_field_name("left") else { return };
    if name_node.kind() != "identifier" {
        return;
    }
    let name = text(name_node, source);
    result.nodes.push(RawNode {
        package: compact_string(package),
        type_name: compact_string(""),
        method: compact_string(name),
        field: compact_string(""),
        kind: NodeKind::Variable,
        start_line: (node.start_position().row + 1) as u32,
        end_line: (node.end_position().row + 1) as u32,
        cyclomatic: 0,
        parameters: vec![],
        returns: vec![],
        flags: NodeFlags::empty(),
        export_kind: ExportKind::None,
    });
}

fn extract_function(
    node: Node,
    source: &[u8],
    package: &str,
    type_name: Option<&str>,
    path: &Path,
    result: &mut ExtractionResult,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let method_name = text(name_node, source);
    let type_name_str = type_name.unwrap_or("");

    let is_async = node
        .child(0)
        .map(|c| c.kind() == "async")
        .unwrap_or(false);

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
        export_kind: if method_name.starts_with('_') { ExportKind::None } else { ExportKind::Named },
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

        if type_name.is_some() {
            extract_self_assignments(body, source, package, type_name_str, result);
        }
    }
}

fn extract_self_assignments(body: Node, source: &[u8], package: &str, type_name: &str, result: &mut ExtractionResult) {
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "assignment" {
            if let Some(left) = node.child_by_field_name("left") {
                if left.kind() == "attribute" {
                    let object = left.child_by_field_name("object");
                    let is_self = object.map(|o| text(o, source) == "self").unwrap_or(false);
                    if is_self {
                        if let Some(attr) = left.child_by_field_name("attribute") {
                            let field_name = text(attr, source);
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
                    }
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
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
            "identifier" => {
                let name = text(param, source);
                if name != "self" && name != "cls" {
                    out.push(Parameter::new(Some(name), None, false));
                }
            }
            "typed_parameter" => {
                let name = param.named_child(0).map(|c| text(c, source)).unwrap_or("");
                let type_name = param.child_by_field_name("type").map(|t| text(t, source));
                out.push(Parameter::new(Some(name), type_name, false));
            }
            "default_parameter" => {
                let name = param.child_by_field_name("name").map(|n| text(n, source));
                out.push(Parameter::new(name, None, true));
            }
            "typed_default_parameter" => {
                let name = param.child_by_field_name("name").map(|n| text(n, source));
                let type_name = param.child_by_field_name("type").map(|t| text(t, source));
                out.push(Parameter::new(name, type_name, true));
            }
            _ => {}
        }
    }
    out
}

fn extract_calls(body: Node, source: &[u8], package: &str, from_key: &LogicalKey, result: &mut ExtractionResult) {
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "call" {
            if let Some(function) = node.child_by_field_name("function") {
                let line_no = (node.start_position().row + 1) as u32;
                let call_text = text(function, source);
                let target = if function.kind() == "attribute" {
                    let object = function.child_by_field_name("object").map(|o| text(o, source)).unwrap_or("");
                    let attr = function.child_by_field_name("attribute").map(|a| text(a, source)).unwrap_or("");
                    if crate::library::lookup(Language::Python, object, attr).is_some() {
                        RawTarget::Library {
                            package: compact_string(object),
                            class: compact_string(""),
                            method: compact_string(attr),
                        }
                    } else {
                        RawTarget::External
                    }
                } else if BUILTINS.contains(&call_text) {
                    RawTarget::External
                } else if call_text.chars().next().is_some_and(|c| c.is_uppercase()) {
                    // PascalCase bare call: most likely constructing a
                    // locally-defined class rather than invoking a function.
                    RawTarget::SameFile(LogicalKey {
                        file_path: from_key.file_path.clone(),
                        package: compact_string(package),
                        type_name: compact_string(call_text),
                        method: compact_string(""),
                        field: compact_string(""),
                        kind: NodeKind::Type,
                    })
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
