//! # Tokenizer
//!
//! Character cursor with one-token lookahead over the expression text.
//!
//! Comments (`// ...` and nestable `/* ... */`) and whitespace are skipped
//! before every token. The parser backtracks by handing a token back through
//! [`Tokenizer::unget_token`], which rewinds the cursor to the token's start.

use crate::config::TokenizerLimits;
use crate::error::{LexError, LexErrorKind};
use std::fmt;

/// Two-character symbols that lex as a single token
const PAIRED_SYMBOLS: &[(char, char)] = &[
    ('<', '<'),
    ('>', '>'),
    ('!', '='),
    ('<', '='),
    ('>', '='),
    ('+', '+'),
    ('-', '-'),
    ('+', '='),
    ('-', '='),
    ('*', '='),
    ('/', '='),
    ('&', '&'),
    ('|', '|'),
    ('^', '^'),
    ('=', '='),
    ('*', '*'),
    ('~', '='),
    (':', ':'),
];

/// Typed value of a constant token
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Integer(i32),
    Boolean(bool),
    Float(f32),
    String(String),
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Integer(value) => write!(f, "{}", value),
            ConstantValue::Boolean(value) => write!(f, "{}", value),
            ConstantValue::Float(value) => {
                if value.is_finite() && value.fract() == 0.0 {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            ConstantValue::String(value) => {
                write!(f, "\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    Symbol,
    Constant(ConstantValue),
}

/// A classified lexical unit
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token (unescaped contents for string constants)
    pub text: String,
    pub start_pos: usize,
    pub start_line: usize,
}

impl Token {
    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }

    pub fn constant(&self) -> Option<&ConstantValue> {
        match &self.kind {
            TokenKind::Constant(value) => Some(value),
            _ => None,
        }
    }
}

pub struct Tokenizer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    prev_pos: usize,
    prev_line: usize,
    limits: TokenizerLimits,
}

impl Tokenizer {
    pub fn new(source: &str, limits: TokenizerLimits) -> Self {
        Self {
            input: source.chars().collect(),
            pos: 0,
            line: 1,
            prev_pos: 0,
            prev_line: 1,
            limits,
        }
    }

    /// Current cursor position as (position, line)
    pub fn location(&self) -> (usize, usize) {
        (self.pos, self.line)
    }

    fn error(&self, kind: LexErrorKind) -> LexError {
        LexError {
            kind,
            position: self.prev_pos,
            line: self.prev_line,
        }
    }

    fn raw(&self, index: usize) -> char {
        self.input.get(index).copied().unwrap_or('\0')
    }

    /// Look at the next character without consuming it; `'\0'` at the end
    pub fn peek_char(&self) -> char {
        self.raw(self.pos)
    }

    /// Consume one character, returning `'\0'` at the end.
    ///
    /// Unless `literal` is set, block comments are skipped here so that
    /// callers never see them.
    pub fn get_char(&mut self, literal: bool) -> Result<char, LexError> {
        let mut comment_depth = 0usize;

        self.prev_pos = self.pos;
        self.prev_line = self.line;

        loop {
            let c = self.raw(self.pos);
            self.pos += 1;

            if c == '\n' {
                self.line += 1;
            } else if !literal {
                let next = self.peek_char();
                if c == '/' && next == '*' {
                    comment_depth += 1;
                    self.pos += 1;
                    continue;
                } else if c == '*' && next == '/' {
                    if comment_depth == 0 {
                        return Err(self.error(LexErrorKind::UnexpectedCommentEnd));
                    }
                    comment_depth -= 1;
                    self.pos += 1;
                    continue;
                }
            }

            if comment_depth > 0 {
                if c == '\0' && self.pos > self.input.len() {
                    return Err(self.error(LexErrorKind::UnterminatedComment));
                }
                continue;
            }
            return Ok(c);
        }
    }

    /// Rewind the most recent [`get_char`](Self::get_char)
    pub fn unget_char(&mut self) {
        self.pos = self.prev_pos;
        self.line = self.prev_line;
    }

    /// Skip whitespace and line comments, returning the first meaningful character
    fn get_leading_char(&mut self) -> Result<char, LexError> {
        loop {
            let mut c = self.get_char(false)?;
            while matches!(c, ' ' | '\t' | '\r' | '\n') {
                c = self.get_char(false)?;
            }

            if c == '/' && self.peek_char() == '/' {
                loop {
                    c = self.get_char(true)?;
                    if c == '\0' {
                        return Ok(c);
                    }
                    if c == '\r' || c == '\n' {
                        break;
                    }
                }
                continue;
            }
            return Ok(c);
        }
    }

    /// Lex the next token, or `None` at the end of the input.
    ///
    /// With `no_consts` set, `true`/`false` stay identifiers and a leading
    /// sign is never folded into a numeric constant.
    pub fn get_token(&mut self, no_consts: bool) -> Result<Option<Token>, LexError> {
        let c = self.get_leading_char()?;
        let p = self.peek_char();
        if c == '\0' {
            self.unget_char();
            return Ok(None);
        }

        let start_pos = self.prev_pos;
        let start_line = self.prev_line;

        if c.is_ascii_alphabetic() || c == '_' {
            let text = self.lex_identifier(c)?;
            let kind = match text.as_str() {
                "true" if !no_consts => TokenKind::Constant(ConstantValue::Boolean(true)),
                "false" if !no_consts => TokenKind::Constant(ConstantValue::Boolean(false)),
                _ => TokenKind::Identifier,
            };
            return Ok(Some(Token { kind, text, start_pos, start_line }));
        }

        if !no_consts && (c.is_ascii_digit() || ((c == '+' || c == '-') && p.is_ascii_digit())) {
            let (text, value) = self.lex_number(c)?;
            return Ok(Some(Token {
                kind: TokenKind::Constant(value),
                text,
                start_pos,
                start_line,
            }));
        }

        if c == '"' {
            let text = self.lex_string()?;
            return Ok(Some(Token {
                kind: TokenKind::Constant(ConstantValue::String(text.clone())),
                text,
                start_pos,
                start_line,
            }));
        }

        let text = self.lex_symbol(c)?;
        Ok(Some(Token {
            kind: TokenKind::Symbol,
            text,
            start_pos,
            start_line,
        }))
    }

    /// Hand a token back so the next [`get_token`](Self::get_token) returns it again
    pub fn unget_token(&mut self, token: &Token) {
        self.pos = token.start_pos;
        self.line = token.start_line;
    }

    fn lex_identifier(&mut self, first: char) -> Result<String, LexError> {
        let mut text = String::new();
        let mut c = first;
        loop {
            text.push(c);
            if text.len() >= self.limits.max_name_length {
                return Err(self.error(LexErrorKind::IdentifierTooLong {
                    max: self.limits.max_name_length,
                }));
            }
            c = self.get_char(false)?;
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
        }
        self.unget_char();
        Ok(text)
    }

    fn lex_number(&mut self, first: char) -> Result<(String, ConstantValue), LexError> {
        let mut text = String::new();
        let mut is_float = false;
        let mut is_hex = false;
        let mut c = first;

        loop {
            if c == '.' {
                is_float = true;
            }
            if c == 'X' || c == 'x' {
                is_hex = true;
            }
            text.push(c);
            if text.len() >= self.limits.max_name_length {
                return Err(self.error(LexErrorKind::NumberTooLong {
                    max: self.limits.max_name_length,
                }));
            }

            c = self.get_char(false)?.to_ascii_uppercase();
            let continues = c.is_ascii_digit()
                || (!is_float && c == '.')
                || (!is_hex && c == 'X')
                || (is_hex && ('A'..='F').contains(&c));
            if !continues {
                break;
            }
        }

        // A trailing 'f' on a float literal is consumed and dropped
        if !is_float || c != 'F' {
            self.unget_char();
        }

        let malformed = || LexErrorKind::MalformedNumber { text: text.clone() };
        let value = if is_float {
            let parsed = text.parse::<f32>().map_err(|_| self.error(malformed()))?;
            ConstantValue::Float(parsed)
        } else if is_hex {
            ConstantValue::Integer(parse_hex(&text).ok_or_else(|| self.error(malformed()))?)
        } else {
            let parsed = text.parse::<i32>().map_err(|_| self.error(malformed()))?;
            ConstantValue::Integer(parsed)
        };

        Ok((text, value))
    }

    fn lex_string(&mut self) -> Result<String, LexError> {
        let mut text = String::new();
        let mut length = 0usize;
        let mut c = self.get_char(true)?;

        while c != '"' && !is_eol(c) {
            if c == '\\' {
                c = self.get_char(true)?;
                if is_eol(c) {
                    break;
                } else if c == 'n' {
                    c = '\n';
                }
            }
            text.push(c);
            length += 1;
            if length >= self.limits.max_string_length {
                return Err(self.error(LexErrorKind::StringTooLong {
                    max: self.limits.max_string_length,
                }));
            }
            c = self.get_char(true)?;
        }

        if c != '"' {
            return Err(self.error(LexErrorKind::UnterminatedString { partial: text }));
        }
        Ok(text)
    }

    fn lex_symbol(&mut self, c: char) -> Result<String, LexError> {
        let mut text = String::from(c);
        let d = self.get_char(false)?;

        if PAIRED_SYMBOLS.contains(&(c, d)) {
            text.push(d);
            if c == '>' && d == '>' {
                if self.get_char(false)? == '>' {
                    text.push('>');
                } else {
                    self.unget_char();
                }
            }
        } else {
            self.unget_char();
        }

        Ok(text)
    }
}

fn is_eol(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\0')
}

/// Base-prefixed integer conversion: `0x10`, `-0X1f`
fn parse_hex(text: &str) -> Option<i32> {
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))?;
    let magnitude = i64::from_str_radix(digits, 16).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        let mut tokenizer = Tokenizer::new(source, TokenizerLimits::default());
        let mut tokens = Vec::new();
        while let Some(token) = tokenizer.get_token(false)? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn texts(source: &str) -> Vec<String> {
        tokenize(source).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn float_with_suffix() {
        let tokens = tokenize("3.14f").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].constant(), Some(&ConstantValue::Float(3.14)));
    }

    #[test]
    fn hex_integer() {
        let tokens = tokenize("0x10").unwrap();
        assert_eq!(tokens[0].constant(), Some(&ConstantValue::Integer(16)));
        let tokens = tokenize("0XfF").unwrap();
        assert_eq!(tokens[0].constant(), Some(&ConstantValue::Integer(255)));
    }

    #[test]
    fn signed_numeral_only_when_constants_allowed() {
        let tokens = tokenize("-12").unwrap();
        assert_eq!(tokens[0].constant(), Some(&ConstantValue::Integer(-12)));

        let mut tokenizer = Tokenizer::new("-12", TokenizerLimits::default());
        let token = tokenizer.get_token(true).unwrap().unwrap();
        assert!(token.is_symbol("-"));
    }

    #[test]
    fn booleans_are_constants_unless_suppressed() {
        let tokens = tokenize("true false").unwrap();
        assert_eq!(tokens[0].constant(), Some(&ConstantValue::Boolean(true)));
        assert_eq!(tokens[1].constant(), Some(&ConstantValue::Boolean(false)));

        let mut tokenizer = Tokenizer::new("true", TokenizerLimits::default());
        let token = tokenizer.get_token(true).unwrap().unwrap();
        assert_eq!(token.kind, TokenKind::Identifier);
    }

    #[test]
    fn paired_and_triple_symbols() {
        assert_eq!(texts("a<<b>>c>>>d"), vec!["a", "<<", "b", ">>", "c", ">>>", "d"]);
        assert_eq!(texts("a&&b||!c"), vec!["a", "&&", "b", "||", "!", "c"]);
        assert_eq!(texts("x<=y!=z"), vec!["x", "<=", "y", "!=", "z"]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(texts("a /* one /* nested */ */ + // tail\n b"), vec!["a", "+", "b"]);
    }

    #[test]
    fn string_escapes() {
        let tokens = tokenize(r#""line\nnext \"q\"""#).unwrap();
        assert_eq!(
            tokens[0].constant(),
            Some(&ConstantValue::String("line\nnext \"q\"".to_string()))
        );
    }

    #[test]
    fn unterminated_string_is_fatal() {
        let err = tokenize("\"abc").unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::UnterminatedString { .. }));
    }

    #[test]
    fn unterminated_comment_is_fatal() {
        let err = tokenize("a + /* never closed").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
    }

    #[test]
    fn stray_comment_end_is_fatal() {
        let err = tokenize("a */ b").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedCommentEnd);
    }

    fn small_limits() -> TokenizerLimits {
        TokenizerLimits {
            max_name_length: 8,
            max_string_length: 8,
            ..TokenizerLimits::default()
        }
    }

    fn first_token_error(source: &str, limits: TokenizerLimits) -> LexErrorKind {
        let mut tokenizer = Tokenizer::new(source, limits);
        tokenizer.get_token(false).unwrap_err().kind
    }

    #[test]
    fn overlong_identifier_is_fatal() {
        assert_eq!(
            first_token_error("abcdefghij", small_limits()),
            LexErrorKind::IdentifierTooLong { max: 8 }
        );
    }

    #[test]
    fn overlong_number_is_fatal() {
        assert_eq!(
            first_token_error("1234567890", small_limits()),
            LexErrorKind::NumberTooLong { max: 8 }
        );
        let mut tokenizer = Tokenizer::new("1234567", small_limits());
        assert!(tokenizer.get_token(false).is_ok());
    }

    #[test]
    fn overlong_string_is_fatal() {
        assert_eq!(
            first_token_error(r#""abcdefghij""#, small_limits()),
            LexErrorKind::StringTooLong { max: 8 }
        );
        let mut tokenizer = Tokenizer::new(r#""abcdefg""#, small_limits());
        assert!(tokenizer.get_token(false).is_ok());
    }

    #[test]
    fn out_of_range_integer_is_malformed() {
        let err = tokenize("99999999999").unwrap_err();
        assert_eq!(
            err.kind,
            LexErrorKind::MalformedNumber {
                text: "99999999999".to_string()
            }
        );
        assert!(tokenize("2147483647").is_ok());
    }

    #[test]
    fn hex_prefix_without_digits_is_malformed() {
        let err = tokenize("0x").unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::MalformedNumber { .. }), "{err}");
        let err = tokenize("0x100000000").unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::MalformedNumber { .. }), "{err}");
    }

    #[test]
    fn unget_token_rewinds() {
        let mut tokenizer = Tokenizer::new("foo + bar", TokenizerLimits::default());
        let first = tokenizer.get_token(false).unwrap().unwrap();
        let second = tokenizer.get_token(false).unwrap().unwrap();
        tokenizer.unget_token(&second);
        assert_eq!(tokenizer.get_token(false).unwrap(), Some(second));
        assert_eq!(first.text, "foo");
    }

    #[test]
    fn lines_are_tracked() {
        let tokens = tokenize("a\n+\nb").unwrap();
        let lines: Vec<_> = tokens.iter().map(|t| t.start_line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }
}
