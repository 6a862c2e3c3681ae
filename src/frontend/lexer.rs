use std::{iter::Peekable, str::CharIndices};

use super::error::{FrontendError, FrontendResult};
use super::token::{Span, Token, TokenKind};

/// Tabs advance to the next multiple of this many columns.
const TAB_SIZE: usize = 8;

/// Width of a line's leading whitespace.
///
/// `alt_columns` counts every tab as one column. Two lines whose order
/// differs between the two widths mix tabs and spaces ambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Indentation {
    columns: usize,
    alt_columns: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    indent_stack: Vec<Indentation>,
    pending_tokens: Vec<Token<'a>>,
    at_line_start: bool,
    line_has_tokens: bool,
    eof_reached: bool,
    // Open brackets; newlines inside them do not end the logical line.
    nesting: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            indent_stack: vec![Indentation::default()],
            pending_tokens: Vec::new(),
            at_line_start: true,
            line_has_tokens: false,
            eof_reached: false,
            nesting: 0,
            line: 1,
            column: 0,
        }
    }

    pub fn next_token(&mut self) -> FrontendResult<Token<'a>> {
        if let Some(token) = self.pending_tokens.pop() {
            return Ok(token);
        }

        if self.eof_reached {
            return Ok(Token::new(TokenKind::EOF, self.empty_span()));
        }

        if self.at_line_start {
            self.at_line_start = false;
            if let Some(token) = self.handle_indentation()? {
                return Ok(token);
            }
        }

        self.skip_whitespace_and_comments();

        let Some(&(start, ch)) = self.chars.peek() else {
            return Ok(self.finish());
        };

        let line = self.line;
        let column = self.column;
        let kind = match ch {
            '\n' => {
                self.advance_char();
                self.at_line_start = true;
                self.line_has_tokens = false;
                TokenKind::Newline
            }
            '=' => self.one_or_two('=', TokenKind::Equal, TokenKind::EqualEqual),
            '<' => self.one_or_two('=', TokenKind::Less, TokenKind::LessEqual),
            '>' => self.one_or_two('=', TokenKind::Greater, TokenKind::GreaterEqual),
            '!' => {
                self.advance_char();
                if !self.next_is('=') {
                    return Err(FrontendError::UnexpectedCharacter {
                        character: '!',
                        line,
                        column,
                    });
                }
                self.advance_char();
                TokenKind::NotEqual
            }
            '+' => self.bump(TokenKind::Plus),
            '-' => self.bump(TokenKind::Minus),
            '*' => self.bump(TokenKind::Star),
            '/' => self.bump(TokenKind::Slash),
            ':' => self.bump(TokenKind::Colon),
            ',' => self.bump(TokenKind::Comma),
            '(' => {
                self.nesting += 1;
                self.bump(TokenKind::LParen)
            }
            ')' => {
                self.nesting = self.nesting.saturating_sub(1);
                self.bump(TokenKind::RParen)
            }
            '[' => {
                self.nesting += 1;
                self.bump(TokenKind::LBracket)
            }
            ']' => {
                self.nesting = self.nesting.saturating_sub(1);
                self.bump(TokenKind::RBracket)
            }
            '"' | '\'' => return self.read_string(start, line, column, ch),
            c if c.is_alphabetic() || c == '_' => {
                return Ok(self.read_identifier(start, line, column));
            }
            c if c.is_ascii_digit() => return self.read_number(start, line, column),
            _ => {
                return Err(FrontendError::UnexpectedCharacter {
                    character: ch,
                    line,
                    column,
                });
            }
        };

        if kind != TokenKind::Newline {
            self.line_has_tokens = true;
        }
        Ok(Token::new(
            kind,
            Span {
                start,
                end: self.current_index(),
                line,
                column,
            },
        ))
    }

    fn handle_indentation(&mut self) -> FrontendResult<Option<Token<'a>>> {
        let indent = self.count_indentation()?;
        let current = self.current_indent();
        let span = self.empty_span();

        if indent.columns > current.columns {
            if indent.alt_columns <= current.alt_columns {
                return Err(self.inconsistent_tabs());
            }
            self.indent_stack.push(indent);
            return Ok(Some(Token::new(TokenKind::Indent, span)));
        }
        if indent.columns < current.columns {
            while let Some(&top) = self.indent_stack.last() {
                if top.columns > indent.columns {
                    self.indent_stack.pop();
                    self.pending_tokens.push(Token::new(TokenKind::Dedent, span));
                } else {
                    break;
                }
            }
            if self.current_indent().columns != indent.columns {
                return Err(FrontendError::InvalidDedent {
                    indent_level: indent.columns,
                    line: self.line,
                    column: self.column,
                });
            }
        }
        if self.current_indent() != indent {
            return Err(self.inconsistent_tabs());
        }
        Ok(self.pending_tokens.pop())
    }

    fn count_indentation(&mut self) -> FrontendResult<Indentation> {
        // Look ahead first: blank and comment-only lines keep the current level.
        let mut lookahead = self.chars.clone();
        while let Some(&(_, c)) = lookahead.peek() {
            match c {
                ' ' | '\t' => {
                    lookahead.next();
                }
                '\n' | '\r' | '#' => return Ok(self.current_indent()),
                _ => break,
            }
        }
        if lookahead.peek().is_none() {
            return Ok(self.current_indent());
        }

        let mut indent = Indentation::default();
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                ' ' => indent.columns += 1,
                '\t' => indent.columns = (indent.columns / TAB_SIZE + 1) * TAB_SIZE,
                _ => break,
            }
            indent.alt_columns += 1;
            self.advance_char();
        }
        Ok(indent)
    }

    fn inconsistent_tabs(&self) -> FrontendError {
        FrontendError::InconsistentTabs {
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance_char();
                }
                '\n' if self.nesting > 0 => {
                    self.advance_char();
                }
                '#' => {
                    while self.chars.peek().is_some_and(|&(_, c)| c != '\n') {
                        self.advance_char();
                    }
                }
                _ => break,
            }
        }
    }

    /// Emits the closing newline and dedents once the input is exhausted.
    fn finish(&mut self) -> Token<'a> {
        self.eof_reached = true;
        let span = self.empty_span();
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.pending_tokens.push(Token::new(TokenKind::Dedent, span));
        }
        if self.line_has_tokens {
            self.line_has_tokens = false;
            self.pending_tokens.push(Token::new(TokenKind::Newline, span));
        }
        self.pending_tokens
            .pop()
            .unwrap_or_else(|| Token::new(TokenKind::EOF, span))
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char();
        while self
            .chars
            .peek()
            .is_some_and(|&(_, c)| c.is_alphanumeric() || c == '_')
        {
            self.advance_char();
        }

        let end = self.current_index();
        let kind = match &self.input[start..end] {
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "pass" => TokenKind::Pass,
            ident => TokenKind::Identifier(ident),
        };
        self.line_has_tokens = true;
        Token::new(
            kind,
            Span {
                start,
                end,
                line,
                column,
            },
        )
    }

    fn read_number(&mut self, start: usize, line: usize, column: usize) -> FrontendResult<Token<'a>> {
        let mut is_float = false;
        self.consume_digits();
        if self.next_is('.') {
            is_float = true;
            self.advance_char();
            self.consume_digits();
        }
        if self.at_exponent() {
            is_float = true;
            self.advance_char();
            if self.next_is('+') || self.next_is('-') {
                self.advance_char();
            }
            self.consume_digits();
        }

        let end = self.current_index();
        let literal = &self.input[start..end];
        let invalid = || FrontendError::InvalidNumberLiteral {
            literal: literal.to_string(),
            line,
            column,
        };
        let kind = if is_float {
            TokenKind::Float(literal.parse::<f64>().map_err(|_| invalid())?)
        } else {
            TokenKind::Integer(literal.parse::<i64>().map_err(|_| invalid())?)
        };
        self.line_has_tokens = true;
        Ok(Token::new(
            kind,
            Span {
                start,
                end,
                line,
                column,
            },
        ))
    }

    fn read_string(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
        quote: char,
    ) -> FrontendResult<Token<'a>> {
        self.advance_char(); // opening quote
        let content_start = start + quote.len_utf8();
        while let Some((idx, c)) = self.advance_char() {
            match c {
                _ if c == quote => {
                    self.line_has_tokens = true;
                    return Ok(Token::new(
                        TokenKind::String(&self.input[content_start..idx]),
                        Span {
                            start,
                            end: idx + quote.len_utf8(),
                            line,
                            column,
                        },
                    ));
                }
                '\\' => {
                    if self.next_is('\n') {
                        break;
                    }
                    self.advance_char();
                }
                '\n' => break,
                _ => {}
            }
        }
        Err(FrontendError::UnterminatedString { line, column })
    }

    fn consume_digits(&mut self) {
        while self.chars.peek().is_some_and(|&(_, c)| c.is_ascii_digit()) {
            self.advance_char();
        }
    }

    fn at_exponent(&self) -> bool {
        let mut lookahead = self.chars.clone();
        if !matches!(lookahead.next(), Some((_, 'e' | 'E'))) {
            return false;
        }
        match lookahead.next() {
            Some((_, '+' | '-')) => lookahead.next().is_some_and(|(_, c)| c.is_ascii_digit()),
            Some((_, c)) => c.is_ascii_digit(),
            None => false,
        }
    }

    fn one_or_two(&mut self, second: char, one: TokenKind<'a>, two: TokenKind<'a>) -> TokenKind<'a> {
        self.advance_char();
        if self.next_is(second) {
            self.advance_char();
            two
        } else {
            one
        }
    }

    fn bump(&mut self, kind: TokenKind<'a>) -> TokenKind<'a> {
        self.advance_char();
        kind
    }

    fn next_is(&mut self, expected: char) -> bool {
        self.chars.peek().is_some_and(|&(_, c)| c == expected)
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_indent(&self) -> Indentation {
        self.indent_stack.last().copied().unwrap_or_default()
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }

    fn empty_span(&mut self) -> Span {
        let index = self.current_index();
        Span {
            start: index,
            end: index,
            line: self.line,
            column: self.column,
        }
    }
}

pub fn tokenize(input: &str) -> FrontendResult<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}
