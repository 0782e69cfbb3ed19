use std::collections::HashSet;

use tree_sitter::Node;

use super::registry::{LanguageSpec, HALSTEAD_IGNORED_TOKENS};
use crate::domain::{ComplexityMetrics, HalsteadMetrics};

/// Computes cyclomatic, cognitive, and Halstead metrics for one chunk in a
/// single traversal of its subtree.
pub fn compute_metrics(spec: &LanguageSpec, node: Node<'_>, source: &str) -> ComplexityMetrics {
    let mut visitor = MetricsVisitor {
        spec,
        source,
        cyclomatic: 1,
        cognitive: 0,
        last_logical: None,
        distinct_operators: HashSet::new(),
        distinct_operands: HashSet::new(),
        total_operators: 0,
        total_operands: 0,
    };
    // The chunk's own node never counts; only its contents do.
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visitor.visit(child, 0);
    }

    ComplexityMetrics {
        cyclomatic: visitor.cyclomatic,
        cognitive: visitor.cognitive,
        halstead: HalsteadMetrics::from_counts(
            visitor.distinct_operators.len() as u32,
            visitor.distinct_operands.len() as u32,
            visitor.total_operators,
            visitor.total_operands,
        ),
    }
}

struct MetricsVisitor<'a> {
    spec: &'a LanguageSpec,
    source: &'a str,
    cyclomatic: u32,
    cognitive: u32,
    /// Last logical operator seen, in source order. An operator only adds
    /// cognitive complexity when its type differs from this.
    last_logical: Option<String>,
    distinct_operators: HashSet<String>,
    distinct_operands: HashSet<String>,
    total_operators: u32,
    total_operands: u32,
}

impl<'a> MetricsVisitor<'a> {
    fn visit(&mut self, node: Node<'a>, nesting: u32) {
        let kind = node.kind();

        // Halstead token classification. Operand kinds are counted opaquely
        // (a string literal is one operand, not its delimiter tokens).
        if self.spec.halstead_operand_kinds.contains(&kind) {
            let text = self.source[node.byte_range()].to_string();
            self.distinct_operands.insert(text);
            self.total_operands += 1;
            return;
        }
        if node.child_count() == 0 {
            if !node.is_named() && !HALSTEAD_IGNORED_TOKENS.contains(&kind) {
                self.distinct_operators.insert(kind.to_string());
                self.total_operators += 1;
            } else if node.is_named() && node.is_extra() {
                // comments
            } else if node.is_named() {
                // Unclassified named leaf (e.g. language-specific literal):
                // treat as operand so Halstead stays total.
                let text = self.source[node.byte_range()].to_string();
                self.distinct_operands.insert(text);
                self.total_operands += 1;
            }
            return;
        }

        if self.spec.binary_kinds.contains(&kind) {
            self.visit_binary(node, nesting);
            return;
        }

        let is_decision = self.spec.decision_points.contains(&kind);
        let is_nesting = self.spec.nesting_kinds.contains(&kind);
        let is_flat = self.spec.flat_increment_kinds.contains(&kind);
        let is_lambda = self.spec.lambda_kinds.contains(&kind);

        if is_decision {
            self.cyclomatic += 1;
        }

        if is_nesting {
            // `else if` receives a fixed +1 instead of a nesting penalty.
            if is_else_if(node, self.spec) {
                self.cognitive += 1;
            } else {
                self.cognitive += 1 + nesting;
            }
            // A new statement sequence ends any operator run.
            self.last_logical = None;

            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                // Neither the condition subtree nor an else/elif sibling
                // receives the nesting increment.
                let child_nesting = if is_condition_child(node, child)
                    || self.spec.flat_increment_kinds.contains(&child.kind())
                {
                    nesting
                } else {
                    nesting + 1
                };
                self.visit(child, child_nesting);
            }
            return;
        }

        if is_flat {
            // Plain else/elif: fixed +1, no nesting increment of its own.
            // An `else if` chain is counted by the nested if instead.
            if !contains_direct_if(node) {
                self.cognitive += 1;
            }
            self.last_logical = None;
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                self.visit(child, nesting);
            }
            return;
        }

        if is_lambda {
            if nesting > 0 {
                self.cognitive += 1;
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                self.visit(child, nesting + 1);
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, nesting);
        }
    }

    /// Binary nodes are walked in-order so logical operators are observed in
    /// source order: left subtree, operator token, right subtree.
    fn visit_binary(&mut self, node: Node<'a>, nesting: u32) {
        let operator = node
            .child_by_field_name("operator")
            .map(|op| self.source[op.byte_range()].to_string());
        let is_logical = operator
            .as_deref()
            .map(|op| self.spec.logical_operators.contains(&op))
            .unwrap_or(false);

        let operator_node = node.child_by_field_name("operator");
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if let Some(op) = operator_node {
                if child.id() == op.id() {
                    if is_logical {
                        self.cyclomatic += 1;
                        let op_text = &self.source[op.byte_range()];
                        if self.last_logical.as_deref() != Some(op_text) {
                            self.cognitive += 1;
                        }
                        self.last_logical = Some(op_text.to_string());
                    }
                    // The operator token itself still counts for Halstead.
                    if op.child_count() == 0 && !op.is_named() {
                        self.distinct_operators.insert(op.kind().to_string());
                        self.total_operators += 1;
                    }
                    continue;
                }
            }
            self.visit(child, nesting);
        }
    }
}

/// True when `node` is the `if` of an `else if`/`elif` chain: a direct child
/// of a flat-increment clause.
fn is_else_if(node: Node<'_>, spec: &LanguageSpec) -> bool {
    node.parent()
        .map(|p| spec.flat_increment_kinds.contains(&p.kind()))
        .unwrap_or(false)
}

/// True when a flat clause directly wraps an if-statement (an `else if`),
/// in which case the inner if carries the increment.
fn contains_direct_if(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let result = node
        .named_children(&mut cursor)
        .any(|c| c.kind() == "if_statement");
    result
}

/// True when `child` sits in the condition position of its parent (condition
/// subtrees do not receive the nesting increment).
fn is_condition_child(parent: Node<'_>, child: Node<'_>) -> bool {
    for field in ["condition", "value", "subject"] {
        if let Some(c) = parent.child_by_field_name(field) {
            if c.id() == child.id() {
                return true;
            }
        }
    }
    false
}
