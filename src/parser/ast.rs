//! # Expression AST
//!
//! A closed set of node kinds. Every node carries an [`ExprId`] handed out by
//! the parser, which later passes use as the key for per-node data (depth,
//! layout row, compiled artifact).
//!
//! Traversal is driven by [`Expr::accept`]: interior nodes report
//! [`VisitPhase::Pre`], walk their children, then report [`VisitPhase::Post`];
//! leaves report [`VisitPhase::Leaf`] once.

use super::tokenizer::{Token, TokenKind};
use std::fmt;

/// Identity of a node within one parsed tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitPhase {
    Pre,
    Post,
    Leaf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Leaf(Token),
    List(Vec<Expr>),
    Binary {
        operator: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        operator: String,
        operand: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        true_part: Box<Expr>,
        false_part: Box<Expr>,
    },
    /// C-style cast; the grammar never produces it
    Cast {
        type_expr: Box<Expr>,
        value_expr: Box<Expr>,
    },
}

pub trait ExpressionVisitor {
    fn visit(&mut self, node: &Expr, phase: VisitPhase);
}

/// Pending work of an iterative traversal
enum Step<'e> {
    Enter(&'e Expr),
    Exit(&'e Expr),
}

impl Expr {
    /// Direct children, left to right
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Leaf(_) => Vec::new(),
            ExprKind::List(entries) => entries.iter().collect(),
            ExprKind::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            ExprKind::Unary { operand, .. } => vec![&**operand],
            ExprKind::Conditional {
                condition,
                true_part,
                false_part,
            } => vec![&**condition, &**true_part, &**false_part],
            ExprKind::Cast {
                type_expr,
                value_expr,
            } => vec![&**type_expr, &**value_expr],
        }
    }

    /// Walk the tree depth-first with an explicit stack, so left-deep
    /// operator chains of any length are safe to visit
    pub fn accept<V: ExpressionVisitor + ?Sized>(&self, visitor: &mut V) {
        let mut stack = vec![Step::Enter(self)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Exit(node) => visitor.visit(node, VisitPhase::Post),
                Step::Enter(node) if matches!(node.kind, ExprKind::Leaf(_)) => {
                    visitor.visit(node, VisitPhase::Leaf)
                }
                Step::Enter(node) => {
                    visitor.visit(node, VisitPhase::Pre);
                    stack.push(Step::Exit(node));
                    stack.extend(node.children().into_iter().rev().map(Step::Enter));
                }
            }
        }
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        struct Counter(usize);
        impl ExpressionVisitor for Counter {
            fn visit(&mut self, _node: &Expr, phase: VisitPhase) {
                if phase != VisitPhase::Pre {
                    self.0 += 1;
                }
            }
        }
        let mut counter = Counter(0);
        self.accept(&mut counter);
        counter.0
    }
}

/// A fragment of rendered output
enum Piece<'e> {
    Node(&'e Expr),
    Text(&'e str),
}

/// Fully parenthesized infix rendering
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Piece::Node(self)];

        while let Some(piece) = stack.pop() {
            let node = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Node(node) => node,
            };

            let pieces = match &node.kind {
                ExprKind::Leaf(token) => {
                    match &token.kind {
                        TokenKind::Constant(value) => write!(f, "{}", value)?,
                        TokenKind::Identifier | TokenKind::Symbol => f.write_str(&token.text)?,
                    }
                    continue;
                }
                ExprKind::List(entries) => {
                    let mut pieces = Vec::with_capacity(entries.len() * 2);
                    for (index, entry) in entries.iter().enumerate() {
                        if index > 0 {
                            pieces.push(Piece::Text(", "));
                        }
                        pieces.push(Piece::Node(entry));
                    }
                    pieces
                }
                ExprKind::Binary { operator, lhs, rhs } => vec![
                    Piece::Text("("),
                    Piece::Node(lhs),
                    Piece::Text(" "),
                    Piece::Text(operator),
                    Piece::Text(" "),
                    Piece::Node(rhs),
                    Piece::Text(")"),
                ],
                ExprKind::Unary { operator, operand } => vec![
                    Piece::Text("("),
                    Piece::Text(operator),
                    Piece::Text(" "),
                    Piece::Node(operand),
                    Piece::Text(")"),
                ],
                ExprKind::Conditional {
                    condition,
                    true_part,
                    false_part,
                } => vec![
                    Piece::Text("("),
                    Piece::Node(condition),
                    Piece::Text(" ? "),
                    Piece::Node(true_part),
                    Piece::Text(" : "),
                    Piece::Node(false_part),
                    Piece::Text(")"),
                ],
                ExprKind::Cast {
                    type_expr,
                    value_expr,
                } => vec![
                    Piece::Text("(("),
                    Piece::Node(type_expr),
                    Piece::Text(")("),
                    Piece::Node(value_expr),
                    Piece::Text("))"),
                ],
            };
            stack.extend(pieces.into_iter().rev());
        }

        Ok(())
    }
}

/// Unlinks the tree node by node instead of recursing through the boxes
impl Drop for Expr {
    fn drop(&mut self) {
        let mut detached = Vec::new();
        detach_children(&mut self.kind, &mut detached);
        while let Some(mut node) = detached.pop() {
            detach_children(&mut node.kind, &mut detached);
        }
    }
}

fn detach_children(kind: &mut ExprKind, into: &mut Vec<Expr>) {
    match std::mem::replace(kind, ExprKind::List(Vec::new())) {
        ExprKind::Leaf(_) => {}
        ExprKind::List(entries) => into.extend(entries),
        ExprKind::Binary { lhs, rhs, .. } => into.extend([*lhs, *rhs]),
        ExprKind::Unary { operand, .. } => into.push(*operand),
        ExprKind::Conditional {
            condition,
            true_part,
            false_part,
        } => into.extend([*condition, *true_part, *false_part]),
        ExprKind::Cast {
            type_expr,
            value_expr,
        } => into.extend([*type_expr, *value_expr]),
    }
}
