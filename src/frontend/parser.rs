use std::{iter::Peekable, str::Chars};

use crate::ast::{Node, Operator};

use super::error::{FrontendError, FrontendResult};
use super::token::{Span, Token, TokenKind};

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse_module(mut self) -> FrontendResult<Node> {
        let mut body = Vec::new();
        while self.current() != TokenKind::EOF {
            if self.consume_newlines() {
                continue;
            }
            body.push(self.parse_statement()?);
        }
        Ok(Node::Module { body })
    }

    fn parse_statement(&mut self) -> FrontendResult<Node> {
        match self.current() {
            TokenKind::Def => self.parse_function_def(),
            TokenKind::If => {
                self.advance();
                self.parse_if_tail()
            }
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Pass => {
                self.advance();
                self.expect(TokenKind::Newline)?;
                Ok(Node::unsupported("Pass"))
            }
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_function_def(&mut self) -> FrontendResult<Node> {
        self.expect(TokenKind::Def)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        while self.current() != TokenKind::RParen {
            args.push(Node::Arg {
                arg: self.expect_identifier()?,
            });
            if self.current() == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;
        Ok(Node::FunctionDef { name, args, body })
    }

    /// Parses the remainder of an `if` or `elif` after its keyword.
    fn parse_if_tail(&mut self) -> FrontendResult<Node> {
        let test = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;
        let orelse = match self.current() {
            TokenKind::Elif => {
                self.advance();
                vec![self.parse_if_tail()?]
            }
            TokenKind::Else => {
                self.advance();
                self.expect(TokenKind::Colon)?;
                self.parse_block()?
            }
            _ => Vec::new(),
        };
        Ok(Node::If {
            test: Box::new(test),
            body,
            orelse,
        })
    }

    fn parse_while(&mut self) -> FrontendResult<Node> {
        self.expect(TokenKind::While)?;
        let test = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;
        Ok(Node::While {
            test: Box::new(test),
            body,
        })
    }

    fn parse_for(&mut self) -> FrontendResult<Node> {
        self.expect(TokenKind::For)?;
        let target = self.expect_identifier()?;
        self.expect(TokenKind::In)?;
        let iter = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;

        // `range(n)` counts up to `n`; other iterables pass through as text.
        let iter = match iter {
            Node::Call { func, mut args } if func == "range" && args.len() == 1 => args.remove(0),
            other => other,
        };
        Ok(Node::For {
            target,
            iter: Box::new(iter),
            body,
        })
    }

    fn parse_return(&mut self) -> FrontendResult<Node> {
        self.expect(TokenKind::Return)?;
        let value = if self.current() == TokenKind::Newline {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect(TokenKind::Newline)?;
        Ok(Node::Return { value })
    }

    fn parse_simple_statement(&mut self) -> FrontendResult<Node> {
        let first = self.parse_expression()?;
        if self.current() != TokenKind::Equal {
            self.expect(TokenKind::Newline)?;
            return Ok(Node::expr(first));
        }

        let mut targets = vec![first];
        let value = loop {
            self.expect(TokenKind::Equal)?;
            let next = self.parse_expression()?;
            if self.current() == TokenKind::Equal {
                targets.push(next);
            } else {
                break next;
            }
        };
        self.expect(TokenKind::Newline)?;
        Ok(Node::Assign {
            targets,
            value: Box::new(value),
        })
    }

    fn parse_block(&mut self) -> FrontendResult<Vec<Node>> {
        self.expect(TokenKind::Newline)?;
        self.consume_newlines();
        self.expect(TokenKind::Indent)?;

        let mut body = Vec::new();
        while !matches!(self.current(), TokenKind::Dedent | TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Dedent)?;
        Ok(body)
    }

    fn parse_expression(&mut self) -> FrontendResult<Node> {
        let left = self.parse_arithmetic()?;
        if !self.current().is_comparison() {
            return Ok(left);
        }
        while self.current().is_comparison() {
            self.advance();
            self.parse_arithmetic()?;
        }
        Ok(Node::unsupported("Compare"))
    }

    fn parse_arithmetic(&mut self) -> FrontendResult<Node> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current() {
                TokenKind::Plus => Operator::Add,
                TokenKind::Minus => Operator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = Node::bin_op(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> FrontendResult<Node> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.current() {
                TokenKind::Star => Operator::Mult,
                TokenKind::Slash => Operator::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = Node::bin_op(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> FrontendResult<Node> {
        if self.current() == TokenKind::Minus {
            self.advance();
            self.parse_unary()?;
            return Ok(Node::unsupported("UnaryOp"));
        }
        self.parse_call()
    }

    fn parse_call(&mut self) -> FrontendResult<Node> {
        let mut expr = self.parse_primary()?;
        while self.current() == TokenKind::LParen {
            self.advance();
            let mut args = Vec::new();
            while self.current() != TokenKind::RParen {
                args.push(self.parse_expression()?);
                if self.current() == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
            expr = match expr {
                Node::Name { id } => Node::Call { func: id, args },
                _ => Node::unsupported("Call with computed callee"),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> FrontendResult<Node> {
        let node = match self.current() {
            TokenKind::Integer(value) => Node::constant(value),
            TokenKind::Float(value) => Node::constant(value),
            TokenKind::String(raw) => {
                let span = self.current_span();
                let value = unescape(raw).map_err(|escape| FrontendError::InvalidEscape {
                    escape,
                    line: span.line,
                    column: span.column,
                })?;
                Node::constant(value)
            }
            TokenKind::Identifier(name) => Node::name(name),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                return Ok(expr);
            }
            TokenKind::LBracket => return self.skip_list_display(),
            _ => return Err(self.error("expression")),
        };
        self.advance();
        Ok(node)
    }

    /// Consumes a bracketed list display and reports it by kind only.
    fn skip_list_display(&mut self) -> FrontendResult<Node> {
        self.expect(TokenKind::LBracket)?;
        let mut depth = 1usize;
        let mut comprehension = false;
        loop {
            match self.current() {
                TokenKind::LBracket => depth += 1,
                TokenKind::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                }
                TokenKind::For if depth == 1 => comprehension = true,
                TokenKind::EOF | TokenKind::Newline => return Err(self.error("']'")),
                _ => {}
            }
            self.advance();
        }
        Ok(Node::unsupported(if comprehension { "ListComp" } else { "List" }))
    }

    fn consume_newlines(&mut self) -> bool {
        let mut consumed = false;
        while self.current() == TokenKind::Newline {
            consumed = true;
            self.advance();
        }
        consumed
    }

    fn expect_identifier(&mut self) -> FrontendResult<String> {
        if let TokenKind::Identifier(name) = self.current() {
            self.advance();
            Ok(name.to_string())
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect(&mut self, expected: TokenKind<'a>) -> FrontendResult<()> {
        if self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&expected.to_string()))
        }
    }

    fn current(&self) -> TokenKind<'a> {
        self.tokens
            .get(self.position)
            .map_or(TokenKind::EOF, |token| token.kind)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.position)
            .or(self.tokens.last())
            .map(|token| token.span)
            .unwrap_or_default()
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn error(&self, expected: &str) -> FrontendError {
        let span = self.current_span();
        FrontendError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current().to_string(),
            line: span.line,
            column: span.column,
        }
    }
}

/// Decodes Python string escapes. A malformed escape is returned as `Err`
/// with its source text so the caller can attach a position.
fn unescape(raw: &str) -> Result<String, String> {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        let Some(escape) = chars.next() else {
            value.push('\\');
            break;
        };
        match escape {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'a' => value.push('\x07'),
            'b' => value.push('\x08'),
            'f' => value.push('\x0c'),
            'v' => value.push('\x0b'),
            '\\' | '\'' | '"' => value.push(escape),
            // A backslash before a newline continues the literal.
            '\n' => {}
            '0'..='7' => {
                let mut code = escape.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                value.push(char::from_u32(code).ok_or_else(|| format!("\\{code:o}"))?);
            }
            'x' => value.push(read_hex_escape(&mut chars, escape, 2)?),
            'u' => value.push(read_hex_escape(&mut chars, escape, 4)?),
            'U' => value.push(read_hex_escape(&mut chars, escape, 8)?),
            // Unknown escapes keep their backslash.
            other => {
                value.push('\\');
                value.push(other);
            }
        }
    }
    Ok(value)
}

fn read_hex_escape(
    chars: &mut Peekable<Chars<'_>>,
    prefix: char,
    digits: usize,
) -> Result<char, String> {
    let hex: String = chars.by_ref().take(digits).collect();
    let invalid = || format!("\\{prefix}{hex}");
    if hex.len() != digits || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse;
    use indoc::indoc;

    fn body(source: &str) -> Vec<Node> {
        match parse(source).expect("parse failed") {
            Node::Module { body } => body,
            other => panic!("expected module, got {other:?}"),
        }
    }

    #[test]
    fn parses_function_with_parameters_and_return() {
        let input = indoc! {"
            def add(a, b):
                return a + b * 2
        "};
        assert_eq!(
            body(input),
            vec![Node::FunctionDef {
                name: "add".to_string(),
                args: vec![
                    Node::Arg {
                        arg: "a".to_string()
                    },
                    Node::Arg {
                        arg: "b".to_string()
                    },
                ],
                body: vec![Node::Return {
                    value: Some(Box::new(Node::bin_op(
                        Node::name("a"),
                        Operator::Add,
                        Node::bin_op(Node::name("b"), Operator::Mult, Node::constant(2)),
                    ))),
                }],
            }]
        );
    }

    #[test]
    fn parses_chained_assignment_and_call_statement() {
        let input = indoc! {r#"
            a = b = add(5, 3.0)
            print("done\n")
        "#};
        assert_eq!(
            body(input),
            vec![
                Node::Assign {
                    targets: vec![Node::name("a"), Node::name("b")],
                    value: Box::new(Node::call(
                        "add",
                        vec![Node::constant(5), Node::constant(3.0)],
                    )),
                },
                Node::expr(Node::call("print", vec![Node::constant("done\n")])),
            ]
        );
    }

    #[test]
    fn nests_elif_inside_orelse() {
        let input = indoc! {"
            if a:
                x = 1
            elif b:
                x = 2

            else:
                x = 3
        "};
        let assign = |n: i64| Node::Assign {
            targets: vec![Node::name("x")],
            value: Box::new(Node::constant(n)),
        };
        assert_eq!(
            body(input),
            vec![Node::If {
                test: Box::new(Node::name("a")),
                body: vec![assign(1)],
                orelse: vec![Node::If {
                    test: Box::new(Node::name("b")),
                    body: vec![assign(2)],
                    orelse: vec![assign(3)],
                }],
            }]
        );
    }

    #[test]
    fn lowers_single_argument_range_in_for() {
        let input = indoc! {"
            for i in range(n + 1):
                print(i)
            for item in items:
                print(item)
        "};
        let statements = body(input);
        assert!(matches!(
            &statements[0],
            Node::For { target, iter, .. }
                if target == "i"
                    && **iter == Node::bin_op(Node::name("n"), Operator::Add, Node::constant(1))
        ));
        assert!(matches!(
            &statements[1],
            Node::For { iter, .. } if **iter == Node::name("items")
        ));
    }

    #[test]
    fn marks_unmodelled_constructs_as_unsupported() {
        let input = indoc! {"
            squares = [x * x for x in range(10)]
            xs = [1, [2]]
            while n < 10:
                pass
            y = -1
        "};
        let statements = body(input);
        assert!(matches!(
            &statements[0],
            Node::Assign { value, .. } if value.kind() == "ListComp"
        ));
        assert!(matches!(
            &statements[1],
            Node::Assign { value, .. } if value.kind() == "List"
        ));
        assert!(matches!(
            &statements[2],
            Node::While { test, body } if test.kind() == "Compare" && body[0].kind() == "Pass"
        ));
        assert!(matches!(
            &statements[3],
            Node::Assign { value, .. } if value.kind() == "UnaryOp"
        ));
    }

    #[test]
    fn reports_position_of_unexpected_token() {
        let err = parse("def f(:\n    return 1\n").expect_err("missing parameter name");
        assert_eq!(
            err,
            FrontendError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: "':'".to_string(),
                line: 1,
                column: 6,
            }
        );
    }

    #[test]
    fn requires_indented_block() {
        let err = parse("while x:\ny = 1\n").expect_err("block must be indented");
        assert!(err.to_string().starts_with("Expected indent, got identifier 'y'"));
    }

    #[test]
    fn unescapes_string_literals() {
        assert_eq!(
            unescape(r#"a\tb\\c\"d\q"#).as_deref(),
            Ok("a\tb\\c\"d\\q")
        );
        assert_eq!(unescape(r"\x41\a\101").as_deref(), Ok("A\x07A"));
        assert_eq!(unescape(r"\b\f\v\0").as_deref(), Ok("\x08\x0c\x0b\0"));
        assert_eq!(unescape(r"\1234").as_deref(), Ok("S4"));
        assert_eq!(unescape(r"\u00e9\U0001F600").as_deref(), Ok("\u{e9}\u{1F600}"));
    }

    #[test]
    fn rejects_malformed_escapes() {
        assert_eq!(unescape(r"\x4").unwrap_err(), "\\x4");
        assert_eq!(unescape(r"\xzz").unwrap_err(), "\\xzz");
        assert_eq!(unescape(r"\UFFFFFFFF").unwrap_err(), "\\UFFFFFFFF");

        let err = parse("x = 1\nprint(\"\\xg1\")\n").expect_err("expected escape error");
        assert_eq!(
            err,
            FrontendError::InvalidEscape {
                escape: "\\xg1".into(),
                line: 2,
                column: 6,
            }
        );
    }
}
