//=====================================================
// File: script/tokenizer.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Lexical analysis for the Python subset
// Objective: Turn source text into tokens, including the layout tokens
//            (Newline, Indent, Dedent) that drive block structure
//=====================================================

use std::collections::HashMap;
use std::fmt;

use super::parser::ParseError;

/// Represents the position of a token in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Integer(i64),
    Float(f64),
    Str(String),
    Identifier(String),

    // Keywords
    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Not,
    And,
    Or,
    Is,
    Break,
    Continue,
    Pass,
    Raise,
    Try,
    Except,
    Finally,
    As,
    Global,
    Lambda,
    True,
    False,
    None,

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    DoubleSlashAssign,
    PercentAssign,
    EqualEqual,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Integer(n) => write!(f, "{n}"),
            TokenKind::Float(n) => write!(f, "{n}"),
            TokenKind::Str(s) => write!(f, "{s:?}"),
            TokenKind::Identifier(s) => write!(f, "{s}"),
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Indent => f.write_str("indent"),
            TokenKind::Dedent => f.write_str("dedent"),
            TokenKind::Eof => f.write_str("end of input"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A token with its kind and position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Self { kind, position }
    }
}

pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    keywords: HashMap<&'static str, TokenKind>,
    tokens: Vec<Token>,
    indent_stack: Vec<usize>,
    /// Open bracket depth; newlines inside brackets are insignificant.
    nesting: usize,
    at_line_start: bool,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        let keywords = HashMap::from([
            ("def", TokenKind::Def),
            ("return", TokenKind::Return),
            ("if", TokenKind::If),
            ("elif", TokenKind::Elif),
            ("else", TokenKind::Else),
            ("while", TokenKind::While),
            ("for", TokenKind::For),
            ("in", TokenKind::In),
            ("not", TokenKind::Not),
            ("and", TokenKind::And),
            ("or", TokenKind::Or),
            ("is", TokenKind::Is),
            ("break", TokenKind::Break),
            ("continue", TokenKind::Continue),
            ("pass", TokenKind::Pass),
            ("raise", TokenKind::Raise),
            ("try", TokenKind::Try),
            ("except", TokenKind::Except),
            ("finally", TokenKind::Finally),
            ("as", TokenKind::As),
            ("global", TokenKind::Global),
            ("lambda", TokenKind::Lambda),
            ("True", TokenKind::True),
            ("False", TokenKind::False),
            ("None", TokenKind::None),
        ]);

        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            keywords,
            tokens: Vec::new(),
            indent_stack: vec![0],
            nesting: 0,
            at_line_start: true,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        while !self.is_at_end() {
            if self.at_line_start && self.nesting == 0 {
                self.handle_indentation()?;
                continue;
            }

            let ch = self.current_char();
            if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\x0c' {
                self.advance();
                continue;
            }
            if ch == '\\' && self.peek_char() == Some('\n') {
                self.advance();
                self.advance();
                continue;
            }
            if ch == '#' {
                self.skip_comment();
                continue;
            }
            if ch == '\n' {
                self.handle_newline();
                continue;
            }
            if ch == '"' || ch == '\'' {
                self.handle_string(false)?;
                continue;
            }
            if (ch == 'r' || ch == 'R') && matches!(self.peek_char(), Some('"') | Some('\'')) {
                self.advance();
                self.handle_string(true)?;
                continue;
            }
            if ch.is_ascii_digit()
                || (ch == '.' && self.peek_char().is_some_and(|c| c.is_ascii_digit()))
            {
                self.handle_number()?;
                continue;
            }
            if ch.is_alphabetic() || ch == '_' {
                self.handle_identifier();
                continue;
            }
            self.handle_operator_or_delimiter()?;
        }

        self.push_newline_if_needed(self.current_position());
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.emit(TokenKind::Dedent, self.current_position());
        }
        self.emit(TokenKind::Eof, self.current_position());
        Ok(self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input.get(self.position).copied().unwrap_or('\0')
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.input.get(self.position + ahead).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.current_char();
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.position)
    }

    fn emit(&mut self, kind: TokenKind, position: Position) {
        self.tokens.push(Token::new(kind, position));
    }

    fn error(&self, message: impl Into<String>, position: Position) -> ParseError {
        ParseError::InvalidSyntax {
            message: message.into(),
            position,
        }
    }

    fn push_newline_if_needed(&mut self, position: Position) {
        let needs = matches!(
            self.tokens.last().map(|token| &token.kind),
            Some(kind) if !matches!(kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
        );
        if needs {
            self.emit(TokenKind::Newline, position);
        }
    }

    fn handle_newline(&mut self) {
        let position = self.current_position();
        self.advance();
        if self.nesting == 0 {
            self.push_newline_if_needed(position);
            self.at_line_start = true;
        }
    }

    fn skip_comment(&mut self) {
        while !self.is_at_end() && self.current_char() != '\n' {
            self.advance();
        }
    }

    /// Measure leading whitespace and emit Indent/Dedent; blank and comment lines are skipped.
    fn handle_indentation(&mut self) -> Result<(), ParseError> {
        let mut indent_level = 0;
        while !self.is_at_end() && matches!(self.current_char(), ' ' | '\t') {
            indent_level += if self.current_char() == '\t' { 8 - indent_level % 8 } else { 1 };
            self.advance();
        }

        match self.current_char() {
            '\n' | '\r' | '#' => {
                if self.current_char() == '#' {
                    self.skip_comment();
                }
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
                if !self.is_at_end() {
                    self.advance();
                }
                return Ok(());
            }
            _ if self.is_at_end() => {
                self.at_line_start = false;
                return Ok(());
            }
            _ => {}
        }

        self.at_line_start = false;
        let position = self.current_position();
        let current = self.indent_stack.last().copied().unwrap_or(0);
        if indent_level > current {
            self.indent_stack.push(indent_level);
            self.emit(TokenKind::Indent, position);
        } else {
            while indent_level < self.indent_stack.last().copied().unwrap_or(0) {
                self.indent_stack.pop();
                self.emit(TokenKind::Dedent, position);
            }
            if indent_level != self.indent_stack.last().copied().unwrap_or(0) {
                return Err(self.error(
                    "unindent does not match any outer indentation level",
                    position,
                ));
            }
        }
        Ok(())
    }

    fn handle_string(&mut self, raw: bool) -> Result<(), ParseError> {
        let position = self.current_position();
        let quote = self.advance();
        let triple = self.current_char() == quote && self.peek_char() == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(self.error("unterminated string literal", position));
            }
            let ch = self.current_char();
            if ch == quote {
                if !triple {
                    self.advance();
                    break;
                }
                if self.peek_char() == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.advance();
                    self.advance();
                    self.advance();
                    break;
                }
            }
            if ch == '\n' && !triple {
                return Err(self.error("unterminated string literal", position));
            }
            if ch == '\\' && !raw {
                self.advance();
                let escaped = self.read_escape(position)?;
                if let Some(escaped) = escaped {
                    value.push(escaped);
                }
                continue;
            }
            if ch == '\\' && raw {
                value.push(self.advance());
                if !self.is_at_end() {
                    value.push(self.advance());
                }
                continue;
            }
            value.push(self.advance());
        }

        self.emit(TokenKind::Str(value), position);
        Ok(())
    }

    fn read_escape(&mut self, start: Position) -> Result<Option<char>, ParseError> {
        if self.is_at_end() {
            return Err(self.error("unterminated string literal", start));
        }
        let ch = self.advance();
        let escaped = match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            '\n' => return Ok(None),
            'x' => return self.read_hex_escape(2, start).map(Some),
            'u' => return self.read_hex_escape(4, start).map(Some),
            _ => {
                // Unknown escapes keep the backslash.
                self.position -= 1;
                self.column -= 1;
                return Ok(Some('\\'));
            }
        };
        Ok(Some(escaped))
    }

    fn read_hex_escape(&mut self, digits: usize, start: Position) -> Result<char, ParseError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .current_char()
                .to_digit(16)
                .ok_or_else(|| self.error("truncated escape sequence", start))?;
            code = code * 16 + digit;
            self.advance();
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid escape sequence", start))
    }

    fn handle_number(&mut self) -> Result<(), ParseError> {
        let position = self.current_position();

        if self.current_char() == '0' && matches!(self.peek_char(), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            let mut digits = String::new();
            while self.current_char().is_ascii_hexdigit() || self.current_char() == '_' {
                let ch = self.advance();
                if ch != '_' {
                    digits.push(ch);
                }
            }
            let value = i64::from_str_radix(&digits, 16)
                .map_err(|_| self.error(format!("invalid hex literal 0x{digits}"), position))?;
            self.emit(TokenKind::Integer(value), position);
            return Ok(());
        }

        let mut text = String::new();
        let mut is_float = false;
        while self.current_char().is_ascii_digit() || self.current_char() == '_' {
            let ch = self.advance();
            if ch != '_' {
                text.push(ch);
            }
        }
        if self.current_char() == '.' && self.peek_char() != Some('.') {
            is_float = true;
            text.push(self.advance());
            while self.current_char().is_ascii_digit() || self.current_char() == '_' {
                let ch = self.advance();
                if ch != '_' {
                    text.push(ch);
                }
            }
        }
        if matches!(self.current_char(), 'e' | 'E') {
            let sign = self.peek_char();
            let exponent_follows = match sign {
                Some('+') | Some('-') => self.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent_follows {
                is_float = true;
                text.push(self.advance());
                if matches!(self.current_char(), '+' | '-') {
                    text.push(self.advance());
                }
                while self.current_char().is_ascii_digit() {
                    text.push(self.advance());
                }
            }
        }

        let kind = if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| self.error(format!("invalid float literal {text}"), position))?;
            TokenKind::Float(value)
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|_| self.error(format!("integer literal too large: {text}"), position))?;
            TokenKind::Integer(value)
        };
        self.emit(kind, position);
        Ok(())
    }

    fn handle_identifier(&mut self) {
        let position = self.current_position();
        let mut identifier = String::new();
        while self.current_char().is_alphanumeric() || self.current_char() == '_' {
            identifier.push(self.advance());
        }
        let kind = self
            .keywords
            .get(identifier.as_str())
            .cloned()
            .unwrap_or(TokenKind::Identifier(identifier));
        self.emit(kind, position);
    }

    fn handle_operator_or_delimiter(&mut self) -> Result<(), ParseError> {
        let position = self.current_position();
        let ch = self.advance();
        let next = self.current_char();
        let after = self.peek_char();

        let (kind, extra) = match (ch, next) {
            ('*', '*') => (TokenKind::DoubleStar, 1),
            ('/', '/') if after == Some('=') => (TokenKind::DoubleSlashAssign, 2),
            ('/', '/') => (TokenKind::DoubleSlash, 1),
            ('+', '=') => (TokenKind::PlusAssign, 1),
            ('-', '=') => (TokenKind::MinusAssign, 1),
            ('*', '=') => (TokenKind::StarAssign, 1),
            ('/', '=') => (TokenKind::SlashAssign, 1),
            ('%', '=') => (TokenKind::PercentAssign, 1),
            ('=', '=') => (TokenKind::EqualEqual, 1),
            ('!', '=') => (TokenKind::NotEqual, 1),
            ('<', '=') => (TokenKind::LessEqual, 1),
            ('>', '=') => (TokenKind::GreaterEqual, 1),
            ('+', _) => (TokenKind::Plus, 0),
            ('-', _) => (TokenKind::Minus, 0),
            ('*', _) => (TokenKind::Star, 0),
            ('/', _) => (TokenKind::Slash, 0),
            ('%', _) => (TokenKind::Percent, 0),
            ('=', _) => (TokenKind::Assign, 0),
            ('<', _) => (TokenKind::Less, 0),
            ('>', _) => (TokenKind::Greater, 0),
            ('(', _) => (TokenKind::LeftParen, 0),
            (')', _) => (TokenKind::RightParen, 0),
            ('[', _) => (TokenKind::LeftBracket, 0),
            (']', _) => (TokenKind::RightBracket, 0),
            ('{', _) => (TokenKind::LeftBrace, 0),
            ('}', _) => (TokenKind::RightBrace, 0),
            (',', _) => (TokenKind::Comma, 0),
            (':', _) => (TokenKind::Colon, 0),
            ('.', _) => (TokenKind::Dot, 0),
            (';', _) => (TokenKind::Semicolon, 0),
            (other, _) => {
                return Err(self.error(format!("invalid character '{other}'"), position));
            }
        };
        for _ in 0..extra {
            self.advance();
        }

        match kind {
            TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => {
                self.nesting += 1;
            }
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                self.nesting = self.nesting.saturating_sub(1);
            }
            _ => {}
        }
        self.emit(kind, position);
        Ok(())
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Tokenizer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn emits_indent_and_dedent_around_blocks() {
        let kinds = kinds("if x:\n    y = 1\nz\n");
        assert_eq!(
            kinds,
            vec![
                TokenKind::If,
                TokenKind::Identifier("x".into()),
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Identifier("y".into()),
                TokenKind::Assign,
                TokenKind::Integer(1),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Identifier("z".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn ignores_newlines_inside_brackets_and_blank_lines() {
        let kinds = kinds("x = [1,\n  2]\n\n# note\ny");
        let newlines = kinds.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newlines, 2);
        assert!(!kinds.contains(&TokenKind::Indent));
    }

    #[test]
    fn reads_operators_greedily() {
        let kinds = kinds("a //= 2 ** 3 != 4");
        assert_eq!(kinds[1], TokenKind::DoubleSlashAssign);
        assert_eq!(kinds[3], TokenKind::DoubleStar);
        assert_eq!(kinds[5], TokenKind::NotEqual);
    }

    #[test]
    fn decodes_string_escapes_and_triple_quotes() {
        let kinds = kinds("'a\\tb' \"\"\"multi\nline\"\"\" r'\\d'");
        assert_eq!(kinds[0], TokenKind::Str("a\tb".into()));
        assert_eq!(kinds[1], TokenKind::Str("multi\nline".into()));
        assert_eq!(kinds[2], TokenKind::Str("\\d".into()));
    }

    #[test]
    fn tracks_line_numbers() {
        let tokens = tokenize("a\nb\n\nc").expect("tokenize");
        let c = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Identifier("c".into()))
            .expect("c token");
        assert_eq!(c.position.line, 4);
    }

    #[test]
    fn rejects_inconsistent_dedent() {
        let err = tokenize("if x:\n    a\n  b\n").expect_err("bad dedent");
        assert!(err.to_string().contains("unindent"));
    }

    #[test]
    fn parses_float_forms() {
        let kinds = kinds("1.5 .25 2e3 7");
        assert_eq!(kinds[0], TokenKind::Float(1.5));
        assert_eq!(kinds[1], TokenKind::Float(0.25));
        assert_eq!(kinds[2], TokenKind::Float(2000.0));
        assert_eq!(kinds[3], TokenKind::Integer(7));
    }
}

//=====================================================
// End of file
//=====================================================
