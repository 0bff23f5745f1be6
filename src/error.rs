//! # Compiler Errors
//!
//! Lexing and parsing failures are fatal: they abort the compile before the
//! host graph is touched. Everything that goes wrong while generating nodes is
//! a [`GenerationError`], recorded against the offending AST node while the
//! walk carries on.

use crate::metadata::PinType;
use thiserror::Error;

/// Result type for the fatal compile phases
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors that abort a compile
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A lexing failure, anchored at the character that triggered it
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} (line {line}, position {position})")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: usize,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexErrorKind {
    #[error("identifier length exceeds maximum of {max}")]
    IdentifierTooLong { max: usize },

    #[error("number length exceeds maximum of {max}")]
    NumberTooLong { max: usize },

    #[error("string constant exceeds maximum of {max} characters")]
    StringTooLong { max: usize },

    #[error("unterminated string constant: {partial}")]
    UnterminatedString { partial: String },

    #[error("end of expression encountered inside comment")]
    UnterminatedComment,

    #[error("unexpected '*/' outside of comment")]
    UnexpectedCommentEnd,

    #[error("malformed numeric constant '{text}'")]
    MalformedNumber { text: String },
}

/// A required token was not where the grammar expected it
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("missing '{expected}' in {context} (line {line}, position {position})")]
    MissingSymbol {
        expected: String,
        context: String,
        position: usize,
        line: usize,
    },

    #[error("expected an operand, found {found} (line {line}, position {position})")]
    ExpectedOperand {
        found: String,
        position: usize,
        line: usize,
    },

    #[error("unexpected '{found}' after expression (line {line}, position {position})")]
    TrailingInput {
        found: String,
        position: usize,
        line: usize,
    },

    #[error("expression nests deeper than {max} levels (line {line}, position {position})")]
    NestingTooDeep { max: usize, position: usize, line: usize },
}

/// Non-fatal failure recorded against a single AST node during generation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("no operator '{operator}' takes these types ({})", format_types(.arg_types))]
    NoMatchingOverload {
        operator: String,
        arg_types: Vec<PinType>,
    },

    #[error("bad function '{0}' (no output value)")]
    MissingReturnValue(String),

    #[error("an operand of '{0}' had an error")]
    OperandFailed(String),

    #[error("inaccessible variable '{0}'")]
    InaccessibleVariable(String),

    #[error("variable '{0}' has a type that cannot be used as a pin")]
    BadVariableType(String),

    #[error("{source_type} is not compatible with input pin '{pin}' ({pin_type})")]
    IncompatibleConnection {
        source_type: PinType,
        pin: String,
        pin_type: PinType,
    },

    #[error("failed to find output pin '{0}'")]
    MissingOutputPin(String),

    #[error("function '{0}' has more input pins than operands")]
    TooManyPins(String),

    #[error("{0} are not supported in math expressions")]
    Unsupported(&'static str),
}

fn format_types(types: &[PinType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
