//! # Expression Parser
//!
//! Recursive-descent parser over the [`Tokenizer`]. Binding power, loosest
//! first:
//!
//! ```text
//! conditional   ?:                 (right-associative)
//! logical or    ||
//! logical and   &&
//! inclusive or  |
//! exclusive or  ^
//! and           &
//! equality      == !=
//! relational    < > <= >=
//! shift         << >>
//! additive      + -
//! multiplicative * / %
//! unary         & + - ~ !          (prefix)
//! primary       ( expr ) | token
//! ```
//!
//! Casts, postfix operators (indexing, calls, member access) and comma lists
//! are not part of the grammar.
//!
//! Any other symbol found between two operands is folded in as a binary
//! operator looser than `?:`, at every grouping level, so `(a @ b)` parses
//! and the operator is rejected later during resolution.
//!
//! Binary chains are folded in loops. Only groups, prefix operators and
//! conditional branches recurse, and their nesting is capped by
//! [`TokenizerLimits::max_nesting_depth`].

use super::ast::{Expr, ExprId, ExprKind};
use super::tokenizer::{Token, TokenKind, Tokenizer};
use crate::config::TokenizerLimits;
use crate::error::{ParseError, Result};

/// Binary precedence levels from loosest to tightest
const BINARY_LEVELS: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["|"],
    &["^"],
    &["&"],
    &["==", "!="],
    &["<", ">", "<=", ">="],
    &["<<", ">>"],
    &["+", "-"],
    &["*", "/", "%"],
];

const UNARY_OPERATORS: &[&str] = &["&", "+", "-", "~", "!"];

/// Symbols with a structural role that can never act as an infix operator
const STRUCTURAL_SYMBOLS: &[&str] = &["(", ")", "?", ":", ","];

pub struct ExpressionParser {
    tokenizer: Tokenizer,
    next_id: u32,
    nesting: usize,
    max_nesting: usize,
}

impl ExpressionParser {
    pub fn new(source: &str, limits: TokenizerLimits) -> Self {
        Self {
            tokenizer: Tokenizer::new(source, limits),
            next_id: 0,
            nesting: 0,
            max_nesting: limits.max_nesting_depth,
        }
    }

    /// Parse the whole input as one expression
    pub fn parse(mut self) -> Result<Expr> {
        let expr = self.expression()?;

        match self.tokenizer.get_token(true)? {
            None => Ok(expr),
            Some(token) => Err(ParseError::TrailingInput {
                found: token.text,
                position: token.start_pos,
                line: token.start_line,
            }
            .into()),
        }
    }

    fn make(&mut self, kind: ExprKind) -> Expr {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        Expr { id, kind }
    }

    fn binary(&mut self, operator: String, lhs: Expr, rhs: Expr) -> Expr {
        self.make(ExprKind::Binary {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn match_symbol(&mut self, symbol: &str) -> Result<bool> {
        if let Some(token) = self.tokenizer.get_token(true)? {
            if token.is_symbol(symbol) {
                return Ok(true);
            }
            self.tokenizer.unget_token(&token);
        }
        Ok(false)
    }

    fn require_symbol(&mut self, symbol: &str, context: &str) -> Result<()> {
        if self.match_symbol(symbol)? {
            return Ok(());
        }
        let (position, line) = self.tokenizer.location();
        Err(ParseError::MissingSymbol {
            expected: symbol.to_string(),
            context: context.to_string(),
            position,
            line,
        }
        .into())
    }

    /// Run `parse` one nesting level deeper
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Result<Expr>) -> Result<Expr> {
        if self.nesting >= self.max_nesting {
            let (position, line) = self.tokenizer.location();
            return Err(ParseError::NestingTooDeep {
                max: self.max_nesting,
                position,
                line,
            }
            .into());
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    /// Conditionals joined by symbols no precedence level consumed
    fn expression(&mut self) -> Result<Expr> {
        let mut lhs = self.conditional()?;

        // Unknown symbols bind loosest; resolution rejects them later
        while let Some(token) = self.tokenizer.get_token(true)? {
            let is_infix = token.kind == TokenKind::Symbol
                && !STRUCTURAL_SYMBOLS.contains(&token.text.as_str());
            if !is_infix {
                self.tokenizer.unget_token(&token);
                break;
            }
            let rhs = self.conditional()?;
            lhs = self.binary(token.text, lhs, rhs);
        }

        Ok(lhs)
    }

    fn conditional(&mut self) -> Result<Expr> {
        let condition = self.binary_level(0)?;

        if self.match_symbol("?")? {
            let true_part = self.nested(Self::expression)?;
            self.require_symbol(":", "?: operator")?;
            let false_part = self.nested(Self::conditional)?;
            return Ok(self.make(ExprKind::Conditional {
                condition: Box::new(condition),
                true_part: Box::new(true_part),
                false_part: Box::new(false_part),
            }));
        }

        Ok(condition)
    }

    /// Left-deep fold of the next tighter level over this level's operators
    fn binary_level(&mut self, level: usize) -> Result<Expr> {
        let Some(operators) = BINARY_LEVELS.get(level) else {
            return self.unary();
        };

        let mut lhs = self.binary_level(level + 1)?;
        'fold: loop {
            for operator in operators.iter() {
                if self.match_symbol(operator)? {
                    let rhs = self.binary_level(level + 1)?;
                    lhs = self.binary(operator.to_string(), lhs, rhs);
                    continue 'fold;
                }
            }
            return Ok(lhs);
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        for operator in UNARY_OPERATORS {
            if self.match_symbol(operator)? {
                let operand = self.nested(Self::unary)?;
                return Ok(self.make(ExprKind::Unary {
                    operator: operator.to_string(),
                    operand: Box::new(operand),
                }));
            }
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.match_symbol("(")? {
            let inner = self.nested(Self::expression)?;
            self.require_symbol(")", "closing ) in grouping")?;
            return Ok(inner);
        }

        match self.tokenizer.get_token(false)? {
            Some(token) if token.kind != TokenKind::Symbol => Ok(self.make(ExprKind::Leaf(token))),
            Some(token) => Err(operand_error(format!("'{}'", token.text), &token)),
            None => {
                let (position, line) = self.tokenizer.location();
                Err(ParseError::ExpectedOperand {
                    found: "end of expression".to_string(),
                    position,
                    line,
                }
                .into())
            }
        }
    }
}

fn operand_error(found: String, token: &Token) -> crate::error::CompileError {
    ParseError::ExpectedOperand {
        found,
        position: token.start_pos,
        line: token.start_line,
    }
    .into()
}

/// Parse `source` with default tokenizer limits
pub fn parse_expression(source: &str) -> Result<Expr> {
    ExpressionParser::new(source, TokenizerLimits::default()).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::parser::tokenizer::ConstantValue;

    fn render(source: &str) -> String {
        parse_expression(source).unwrap().to_string()
    }

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        assert_eq!(render("a+b*c"), "(a + (b * c))");
    }

    #[test]
    fn additive_chain_is_left_associative() {
        assert_eq!(render("a+b+c"), "((a + b) + c)");
        assert_eq!(render("a - b - c - d"), "(((a - b) - c) - d)");
    }

    #[test]
    fn grouping_overrides_precedence() {
        assert_eq!(render("(a+b)*c"), "((a + b) * c)");
        assert_eq!(render("((a))"), "a");
    }

    #[test]
    fn whitespace_and_redundant_parens_do_not_matter() {
        assert_eq!(render("a+b*c"), render(" ( a ) + ( ( b ) * c ) "));
    }

    #[test]
    fn full_precedence_ladder() {
        assert_eq!(
            render("a || b && c | d ^ e & f == g < h << i + j * k"),
            "(a || (b && (c | (d ^ (e & (f == (g < (h << (i + (j * k))))))))))"
        );
    }

    #[test]
    fn relational_and_equality() {
        assert_eq!(render("a <= b == c > d"), "((a <= b) == (c > d))");
        assert_eq!(render("x >> 2 >= y"), "((x >> 2) >= y)");
    }

    #[test]
    fn conditional_is_right_associative() {
        assert_eq!(render("a ? b : c ? d : e"), "(a ? b : (c ? d : e))");
        assert_eq!(render("a || b ? x + 1 : y"), "((a || b) ? (x + 1) : y)");
    }

    #[test]
    fn unary_operators() {
        assert_eq!(render("-a * !b"), "((- a) * (! b))");
        assert_eq!(render("~~x"), "(~ (~ x))");
        assert_eq!(render("a - -1"), "(a - (- 1))");
    }

    #[test]
    fn subtraction_of_literal() {
        assert_eq!(render("a-1"), "(a - 1)");
    }

    #[test]
    fn boolean_constants() {
        let expr = parse_expression("true && false").unwrap();
        let ExprKind::Binary { operator, lhs, rhs } = &expr.kind else {
            panic!("expected a binary operator, got {:?}", expr.kind);
        };
        assert_eq!(operator, "&&");
        let (ExprKind::Leaf(l), ExprKind::Leaf(r)) = (&lhs.kind, &rhs.kind) else {
            panic!("expected leaf operands");
        };
        assert_eq!(l.constant(), Some(&ConstantValue::Boolean(true)));
        assert_eq!(r.constant(), Some(&ConstantValue::Boolean(false)));
    }

    #[test]
    fn numeric_constants() {
        let expr = parse_expression("3.14f").unwrap();
        let ExprKind::Leaf(token) = &expr.kind else {
            panic!("expected a leaf");
        };
        assert_eq!(token.constant(), Some(&ConstantValue::Float(3.14)));

        let expr = parse_expression("0x10").unwrap();
        let ExprKind::Leaf(token) = &expr.kind else {
            panic!("expected a leaf");
        };
        assert_eq!(token.constant(), Some(&ConstantValue::Integer(16)));
    }

    #[test]
    fn unknown_symbol_becomes_loosest_operator() {
        assert_eq!(render("a @ b"), "(a @ b)");
        assert_eq!(render("a @ b + c"), "(a @ (b + c))");
        assert_eq!(render("a ** b"), "(a ** b)");
        assert_eq!(render("a @ b @ c"), "((a @ b) @ c)");
    }

    #[test]
    fn unknown_symbol_inside_groups_and_branches() {
        assert_eq!(render("(a @ b)"), "(a @ b)");
        assert_eq!(render("c * (a @ b)"), "(c * (a @ b))");
        assert_eq!(render("((a @ b))"), render("a @ b"));
        assert_eq!(render("p ? a @ b : c"), "(p ? (a @ b) : c)");
    }

    #[test]
    fn structural_symbols_still_end_a_group() {
        let err = parse_expression("(a , b)").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Parse(ParseError::MissingSymbol { ref expected, .. }) if expected == ")"
        ));
        let err = parse_expression("a )").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Parse(ParseError::TrailingInput { ref found, .. }) if found == ")"
        ));
    }

    #[test]
    fn long_chains_parse_without_recursion() {
        let source = vec!["a"; 20_000].join(" + ");
        let expr = parse_expression(&source).unwrap();
        assert_eq!(expr.node_count(), 39_999);
        let rendered = expr.to_string();
        assert_eq!(rendered.matches('(').count(), 19_999);
        assert!(rendered.starts_with("((((") && rendered.ends_with(" + a) + a)"));
    }

    #[test]
    fn nesting_is_capped() {
        let limits = TokenizerLimits {
            max_nesting_depth: 4,
            ..TokenizerLimits::default()
        };
        let parse = |source: &str| ExpressionParser::new(source, limits).parse();

        assert!(parse("((((a))))").is_ok());
        for source in ["(((((a)))))", "- - - - - a", "a ? b : c ? d : e ? f : g ? h : i ? j : k"] {
            let err = parse(source).unwrap_err();
            assert!(
                matches!(err, CompileError::Parse(ParseError::NestingTooDeep { max: 4, .. })),
                "{source}: {err}"
            );
        }

        let deep = format!("{}a{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(parse_expression(&deep).is_err());
    }

    #[test]
    fn node_ids_are_unique() {
        let expr = parse_expression("a * (b + c) - d").unwrap();
        let mut ids = Vec::new();
        struct Collect<'a>(&'a mut Vec<ExprId>);
        impl crate::parser::ast::ExpressionVisitor for Collect<'_> {
            fn visit(&mut self, node: &Expr, phase: crate::parser::ast::VisitPhase) {
                if phase != crate::parser::ast::VisitPhase::Pre {
                    self.0.push(node.id);
                }
            }
        }
        expr.accept(&mut Collect(&mut ids));
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert_eq!(count, 7);
    }

    #[test]
    fn missing_close_paren_is_fatal() {
        let err = parse_expression("(a + b").unwrap_err();
        let CompileError::Parse(ParseError::MissingSymbol { expected, context, .. }) = err else {
            panic!("expected a missing symbol error, got {err:?}");
        };
        assert_eq!(expected, ")");
        assert_eq!(context, "closing ) in grouping");
    }

    #[test]
    fn missing_colon_is_fatal() {
        let err = parse_expression("a ? b").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Parse(ParseError::MissingSymbol { ref expected, .. }) if expected == ":"
        ));
    }

    #[test]
    fn dangling_operator_is_fatal() {
        let err = parse_expression("a +").unwrap_err();
        assert!(matches!(err, CompileError::Parse(ParseError::ExpectedOperand { .. })));
        let err = parse_expression("a + )").unwrap_err();
        assert!(matches!(err, CompileError::Parse(ParseError::ExpectedOperand { .. })));
    }

    #[test]
    fn juxtaposed_operands_are_fatal() {
        let err = parse_expression("a b").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Parse(ParseError::TrailingInput { ref found, .. }) if found == "b"
        ));
    }

    #[test]
    fn lex_errors_propagate() {
        let err = parse_expression("a + \"open").unwrap_err();
        assert!(matches!(err, CompileError::Lex(_)));
    }
}
