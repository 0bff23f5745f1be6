//! # Expression Front End
//!
//! Text to AST: [`tokenizer`] lexes, [`expression`] parses, [`ast`] holds
//! the resulting tree and its visitor protocol.

pub mod ast;
pub mod expression;
pub mod tokenizer;

pub use ast::{Expr, ExprId, ExprKind, ExpressionVisitor, VisitPhase};
pub use expression::{parse_expression, ExpressionParser};
pub use tokenizer::{ConstantValue, Token, TokenKind, Tokenizer};
