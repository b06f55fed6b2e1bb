//! Go extractor, backed by `tree-sitter-go`.

use crate::error::ExtractError;
use crate::model::{
    ExportKind, ExtractionResult, NodeFlags, NodeKind, Parameter, RawNode, RawRelationship,
    RawTarget, RelationshipKind, ReturnValue,
};
use crate::parsing::complexity::{cyclomatic_complexity, ComplexityRule};
use crate::types::compact_string;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Predeclared identifiers callable without a qualifier. A bare call to one
/// of these never resolves to a node extracted from source and must not be
/// treated as a same-file target.
const BUILTINS: &[&str] = &[
    "append", "cap", "close", "complex", "copy", "delete", "imag", "len", "make", "new", "panic",
    "print", "println", "real", "recover", "min", "max", "clear",
];

const DECISION_RULE: ComplexityRule = ComplexityRule {
    statement_kinds: &[
        "if_statement",
        "for_statement",
        "expression_case",
        "default_case",
        "communication_case",
        "type_case",
    ],
    logical_operator_kind: "binary_expression",
    operator_field: "operator",
    logical_operators: &["&&", "||"],
};

pub fn extract(path: &Path, source: &str) -> Result<ExtractionResult, ExtractError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| ExtractError::Syntax {
            path: path.to_path_buf(),
            language: "go".to_string(),
            reason: e.to_string(),
        })?;

    let bytes = source.as_bytes();
    let tree = parser.parse(bytes, None).ok_or_else(|| ExtractError::Syntax {
        path: path.to_path_buf(),
        language: "go".to_string(),
        reason: "tree-sitter produced no parse tree".to_string(),
    })?;
    let root = tree.root_node();

    let package_name = package_clause_name(root, bytes)
        .unwrap_or_else(|| crate::parsing::package_name_from_path(path));

    let mut result = ExtractionResult::new(path.to_path_buf(), package_name.clone(), crate::model::Language::Go);
    let file_key = result_package_key(&package_name, path);

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
            "import_declaration" => extract_imports(child, bytes, &file_key, &mut result),
            "type_declaration" => extract_type_decl(child, bytes, &package_name, &mut result),
            "function_declaration" => {
                extract_function(child, bytes, &package_name, None, path, &mut result)
            }
            "method_declaration" => extract_method(child, bytes, &package_name, path, &mut result),
            "const_declaration" | "var_declaration" => {
                extract_var_or_const(child, bytes, &package_name, &mut result)
            }
            _ => {}
        }
    }

    Ok(result)
}

fn result_package_key(package_name: &str, path: &Path) -> crate::model::LogicalKey {
    crate::model::LogicalKey {
        file_path: path.to_path_buf(),
        package: compact_string(package_name),
        type_name: compact_string(""),
        method: compact_string(""),
        field: compact_string(""),
        kind: NodeKind::Package,
    }
}

fn package_clause_name(root: Node, source: &[u8]) -> Option<String> {
    let mut cursor = root.walk();
    root.children(&mut cursor)
        .find(|c| c.kind() == "package_clause")
        .and_then(|clause| clause.child_by_field_name("name").or_else(|| clause.named_child(0)))
        .and_then(|id| id.utf8_text(source).ok())
        .map(|s| s.to_string())
}

fn text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn extract_imports(
    node: Node,
    source: &[u8],
    from_key: &crate::model::LogicalKey,
    result: &mut ExtractionResult,
) {
    let mut cursor = node.walk();
    for spec in node.children(&mut cursor) {
        if spec.kind() == "import_spec" {
            push_import(spec, source, from_key, result);
        } else if spec.kind() == "import_spec_list" {
            let mut inner = spec.walk();
            for s in spec.children(&mut inner) {
                if s.kind() == "import_spec" {
                    push_import(s, source, from_key, result);
                }
            }
        }
    }
}

fn push_import(spec: Node, source: &[u8], from_key: &crate::model::LogicalKey, result: &mut ExtractionResult) {
    if let Some(path_node) = spec.child_by_field_name("path") {
        let import_path = text(path_node, source).trim_matches('"');
        result.relationships.push(RawRelationship {
            from: from_key.clone(),
            target: RawTarget::External,
            line_no: (spec.start_position().row + 1) as u32,
            kind: RelationshipKind::Import,
            text: compact_string(import_path),
        });
    }
}

fn extract_type_decl(node: Node, source: &[u8], package: &str, result: &mut ExtractionResult) {
    let mut cursor = node.walk();
    for spec in node.children(&mut cursor) {
        if spec.kind() != "type_spec" {
            continue;
        }
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let type_name = text(name_node, source);

        result.nodes.push(RawNode {
            package: compact_string(package),
            type_name: compact_string(type_name),
            method: compact_string(""),
            field: compact_string(""),
            kind: NodeKind::Type,
            start_line: (spec.start_position().row + 1) as u32,
            end_line: (spec.end_position().row + 1) as u32,
            cyclomatic: 0,
            parameters: vec![],
            returns: vec![],
            flags: NodeFlags::empty(),
            export_kind: ExportKind::None,
        });

        if let Some(struct_type) = spec.child_by_field_name("type") {
            if struct_type.kind() == "struct_type" {
                extract_struct_fields(struct_type, source, package, type_name, result);
            }
        }
    }
}

fn extract_struct_fields(
    struct_type: Node,
    source: &[u8],
    package: &str,
    type_name: &str,
    result: &mut ExtractionResult,
) {
    let Some(field_list) = struct_type.child_by_field_name("body") else {
        return;
    };
    let mut cursor = field_list.walk();
    for decl in field_list.children(&mut cursor) {
        if decl.kind() != "field_declaration" {
            continue;
        }
        let mut name_cursor = decl.walk();
        for name_node in decl.children(&mut name_cursor) {
            if name_node.kind() == "field_identifier" {
                let field_name = text(name_node, source);
                result.nodes.push(RawNode {
                    package: compact_string(package),
                    type_name: compact_string(type_name),
                    method: compact_string(""),
                    field: compact_string(field_name),
                    kind: NodeKind::Field,
                    start_line: (decl.start_position().row + 1) as u32,
                    end_line: (decl.end_position().row + 1) as u32,
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

fn extract_parameters(params_node: Option<Node>, source: &[u8]) -> Vec<Parameter> {
    let Some(params_node) = params_node else {
        return vec![];
    };
    let mut out = Vec::new();
    let mut cursor = params_node.walk();
    for decl in params_node.children(&mut cursor) {
        if decl.kind() != "parameter_declaration" {
            continue;
        }
        let type_name = decl.child_by_field_name("type").map(|t| text(t, source));
        let mut name_cursor = decl.walk();
        let names: Vec<&str> = decl
            .children(&mut name_cursor)
            .filter(|c| c.kind() == "identifier")
            .map(|c| text(c, source))
            .collect();
        if names.is_empty() {
            out.push(Parameter::new(None, type_name, false));
        } else {
            for name in names {
                out.push(Parameter::new(Some(name), type_name, false));
            }
        }
    }
    out
}

fn extract_returns(result_node: Option<Node>, source: &[u8]) -> Vec<ReturnValue> {
    let Some(result_node) = result_node else {
        return vec![];
    };
    if result_node.kind() == "parameter_list" {
        let mut out = Vec::new();
        let mut cursor = result_node.walk();
        for decl in result_node.children(&mut cursor) {
            if decl.kind() != "parameter_declaration" {
                continue;
            }
            let type_name = decl.child_by_field_name("type").map(|t| text(t, source));
            let mut name_cursor = decl.walk();
            let names: Vec<&str> = decl
                .children(&mut name_cursor)
                .filter(|c| c.kind() == "identifier")
                .map(|c| text(c, source))
                .collect();
            if names.is_empty() {
                out.push(ReturnValue::new(None, type_name));
            } else {
                for name in names {
                    out.push(ReturnValue::new(Some(name), type_name));
                }
            }
        }
        out
    } else {
        vec![ReturnValue::new(None, Some(text(result_node, source)))]
    }
}

fn extract_function(
    node: Node,
    source: &[u8],
    package: &str,
    receiver_type: Option<&str>,
    path: &Path,
    result: &mut ExtractionResult,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let method_name = text(name_node, source);
    let type_name = receiver_type.unwrap_or("");

    let parameters = extract_parameters(node.child_by_field_name("parameters"), source);
    let returns = extract_returns(node.child_by_field_name("result"), source);

    let body = node.child_by_field_name("body");
    let complexity = body
        .map(|b| cyclomatic_complexity(b, source, &DECISION_RULE))
        .unwrap_or(1);

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
        flags: NodeFlags::empty(),
        export_kind: if is_exported(method_name) { ExportKind::Named } else { ExportKind::None },
    });

    if let Some(body) = body {
        let from_key = crate::model::LogicalKey {
            file_path: path.to_path_buf(),
            package: compact_string(package),
            type_name: compact_string(type_name),
            method: compact_string(method_name),
            field: compact_string(""),
            kind: NodeKind::Method,
        };
        extract_calls(body, source, &from_key, result);
    }
}

fn extract_method(node: Node, source: &[u8], package: &str, path: &Path, result: &mut ExtractionResult) {
    let receiver_type = node
        .child_by_field_name("receiver")
        .and_then(|r| r.named_child(0))
        .and_then(|param| param.child_by_field_name("type"))
        .map(|t| text(t, source).trim_start_matches('*').to_string());

    extract_function(node, source, package, receiver_type.as_deref(), path, result);
}

fn extract_var_or_const(node: Node, source: &[u8], package: &str, result: &mut ExtractionResult) {
    let mut cursor = node.walk();
    for spec in node.children(&mut cursor) {
        if spec.kind() != "var_spec" && spec.kind() != "const_spec" {
            continue;
        }
        let mut name_cursor = spec.walk();
        for name_node in spec.children(&mut name_cursor) {
            if name_node.kind() == "identifier" {
                let name = text(name_node, source);
                result.nodes.push(RawNode {
                    package: compact_string(package),
                    type_name: compact_string(""),
                    method: compact_string(name),
                    field: compact_string(""),
                    kind: NodeKind::Variable,
                    start_line: (spec.start_position().row + 1) as u32,
                    end_line: (spec.end_position().row + 1) as u32,
                    cyclomatic: 0,
                    parameters: vec![],
                    returns: vec![],
                    flags: NodeFlags::empty(),
                    export_kind: if is_exported(name) { ExportKind::Named } else { ExportKind::None },
                });
            }
        }
    }
}

fn extract_calls(
    body: Node,
    source: &[u8],
    from_key: &crate::model::LogicalKey,
    result: &mut ExtractionResult,
) {
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "call_expression" {
            if let Some(function) = node.child_by_field_name("function") {
                let line_no = (node.start_position().row + 1) as u32;
                let call_text = text(function, source);
                let target = if function.kind() == "selector_expression" {
                    let pkg = function
                        .child_by_field_name("operand")
                        .map(|o| text(o, source))
                        .unwrap_or("");
                    let method = function
                        .child_by_field_name("field")
                        .map(|f| text(f, source))
                        .unwrap_or("");
                    if crate::library::lookup(crate::model::Language::Go, pkg, method).is_some() {
                        RawTarget::Library {
                            package: compact_string(pkg),
                            class: compact_string(""),
                            method: compact_string(method),
                        }
                    } else {
                        RawTarget::External
                    }
                } else if BUILTINS.contains(&call_text) {
                    RawTarget::External
                } else {
                    RawTarget::SameFile(crate::model::LogicalKey {
                        file_path: from_key.file_path.clone(),
                        package: from_key.package.clone(),
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

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}
