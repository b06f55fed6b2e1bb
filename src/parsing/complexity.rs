//! Shared cyclomatic-complexity counter: `1 + decision points`.
//!
//! Each extractor supplies a [`ComplexityRule`] naming its own grammar's
//! decision-point node kinds, since tree-sitter node kind strings are not
//! shared across language grammars even where the control-flow concept is
//! identical (Go's `&&` lives on a `binary_expression`; Python's lives on a
//! `boolean_operator`).

use tree_sitter::Node;

pub struct ComplexityRule {
    /// Node kinds that count as one decision point each: `if`, loops,
    /// switch/case labels, ternaries, catch clauses.
    pub statement_kinds: &'static [&'static str],
    /// Node kind for a short-circuit logical expression (e.g. `binary_expression`).
    pub logical_operator_kind: &'static str,
    /// Field name on that node holding the operator token.
    pub operator_field: &'static str,
    /// Operator token spellings that count as a decision point (`&&`, `||`, `and`, `or`).
    pub logical_operators: &'static [&'static str],
}

/// Walks every descendant of `node` and returns `1 + decision points`.
/// Per spec: empty and pure expression bodies yield complexity 1.
pub fn cyclomatic_complexity(node: Node, source: &[u8], rule: &ComplexityRule) -> u32 {
    let mut complexity = 1u32;
    let mut stack = vec![node];

    while let Some(current) = stack.pop() {
        let kind = current.kind();
        if rule.statement_kinds.contains(&kind) {
            complexity += 1;
        } else if kind == rule.logical_operator_kind {
            if let Some(op_node) = current.child_by_field_name(rule.operator_field) {
                if let Ok(op_text) = op_node.utf8_text(source) {
                    if rule.logical_operators.contains(&op_text) {
                        complexity += 1;
                    }
                }
            }
        }

        let mut cursor = current.walk();
        for child in current.children(&mut cursor) {
            stack.push(child);
        }
    }

    complexity
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn go_function_with_one_if_has_complexity_two() {
        let source = b"package main\nfunc Add(x int) error {\n\tif x < 0 {\n\t\treturn nil\n\t}\n\treturn nil\n}\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();

        let rule = ComplexityRule {
            statement_kinds: &["if_statement", "for_statement"],
            logical_operator_kind: "binary_expression",
            operator_field: "operator",
            logical_operators: &["&&", "||"],
        };

        let complexity = cyclomatic_complexity(tree.root_node(), source, &rule);
        assert!(complexity >= 2);
    }

    #[test]
    fn empty_body_has_complexity_one() {
        let source = b"package main\nfunc Noop() {}\n";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();

        let rule = ComplexityRule {
            statement_kinds: &["if_statement", "for_statement"],
            logical_operator_kind: "binary_expression",
            operator_field: "operator",
            logical_operators: &["&&", "||"],
        };

        let func = tree
            .root_node()
            .named_child(0)
            .expect("function declaration");
        assert_eq!(cyclomatic_complexity(func, source, &rule), 1);
    }
}
