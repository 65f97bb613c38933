//! Restricted expression language evaluated against a JSON context.
//!
//! Expressions may read values (names, attributes, indices and literals),
//! compare them and combine the results with boolean operators. There are no
//! calls and no statements, so a template can never do more than look at the
//! context it was handed.

use serde_json::Value;

use super::RenderError;

/// Parse failure description. Offsets are attached by the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SyntaxError(pub(super) String);

impl SyntaxError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Eq,
    Ne,
}

fn tokenize(src: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '[' | ']' | ',' | '.' => {
                chars.next();
                tokens.push(match ch {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    ',' => Token::Comma,
                    _ => Token::Dot,
                });
            }
            '=' | '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(SyntaxError::new(format!("expected `=` after `{ch}`")));
                }
                tokens.push(if ch == '=' { Token::Eq } else { Token::Ne });
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    if inner == ch {
                        closed = true;
                        break;
                    }
                    if inner == '\\' {
                        if let Some(escaped) = chars.next() {
                            text.push(escaped);
                        }
                        continue;
                    }
                    text.push(inner);
                }
                if !closed {
                    return Err(SyntaxError::new("unterminated string literal"));
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut digits = String::new();
                digits.push(c);
                chars.next();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    digits.push(d);
                }
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| SyntaxError::new(format!("invalid integer `{digits}`")))?;
                tokens.push(Token::Int(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(next) = chars.next_if(|n| n.is_alphanumeric() || *n == '_') {
                    ident.push(next);
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(SyntaxError::new(format!("unexpected character `{other}`")));
            }
        }
    }
    Ok(tokens)
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CompareOp {
    Eq,
    Ne,
    In,
    NotIn,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Name(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
}

/// Loop variable binding of a `for` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum LoopPattern {
    Single(String),
    Tuple(Vec<String>),
}

const KEYWORDS: [&str; 6] = ["and", "or", "not", "in", "true", "false"];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> Result<Self, SyntaxError> {
        Ok(Self {
            tokens: tokenize(src)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word == keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), SyntaxError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(SyntaxError::new(format!("expected {what}")))
        }
    }

    fn finish(&self) -> Result<(), SyntaxError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(SyntaxError::new(format!("unexpected trailing {token:?}"))),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.and_expr()?;
        while self.eat_keyword("or") {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.not_expr()?;
        while self.eat_keyword("and") {
            let rhs = self.not_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat_keyword("not") {
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.postfix()?;
        let op = if self.eat(&Token::Eq) {
            CompareOp::Eq
        } else if self.eat(&Token::Ne) {
            CompareOp::Ne
        } else if self.eat_keyword("in") {
            CompareOp::In
        } else if self.at_keyword("not")
            && matches!(self.tokens.get(self.pos + 1), Some(Token::Ident(w)) if w == "in")
        {
            self.pos += 2;
            CompareOp::NotIn
        } else {
            return Ok(lhs);
        };
        let rhs = self.postfix()?;
        Ok(Expr::Compare(Box::new(lhs), op, Box::new(rhs)))
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                match self.advance() {
                    Some(Token::Ident(name)) => expr = Expr::Attr(Box::new(expr), name),
                    _ => return Err(SyntaxError::new("expected attribute name after `.`")),
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.or_expr()?;
                self.expect(&Token::RBracket, "`]`")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.peek() == Some(&Token::LParen) {
                return Err(SyntaxError::new("function calls are not supported"));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.advance() {
            Some(Token::Str(text)) => Ok(Expr::Literal(Value::String(text))),
            Some(Token::Int(value)) => Ok(Expr::Literal(Value::from(value))),
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "none" | "None" => Ok(Expr::Literal(Value::Null)),
                w if KEYWORDS.contains(&w) => {
                    Err(SyntaxError::new(format!("unexpected keyword `{w}`")))
                }
                _ => Ok(Expr::Name(word)),
            },
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.or_expr()?);
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        self.expect(&Token::Comma, "`,` or `]` in list literal")?;
                    }
                }
                Ok(Expr::List(items))
            }
            Some(token) => Err(SyntaxError::new(format!("unexpected {token:?}"))),
            None => Err(SyntaxError::new("unexpected end of expression")),
        }
    }

    fn ident(&mut self) -> Result<String, SyntaxError> {
        match self.advance() {
            Some(Token::Ident(name)) if !KEYWORDS.contains(&name.as_str()) => Ok(name),
            _ => Err(SyntaxError::new("expected loop variable name")),
        }
    }

    fn pattern(&mut self) -> Result<LoopPattern, SyntaxError> {
        let parenthesised = self.eat(&Token::LParen);
        let mut names = vec![self.ident()?];
        while self.eat(&Token::Comma) {
            names.push(self.ident()?);
        }
        if parenthesised {
            self.expect(&Token::RParen, "`)` after loop variables")?;
        }
        if parenthesised || names.len() > 1 {
            Ok(LoopPattern::Tuple(names))
        } else {
            Ok(LoopPattern::Single(names.remove(0)))
        }
    }
}

/// Parse a standalone expression.
pub(super) fn parse(src: &str) -> Result<Expr, SyntaxError> {
    let mut parser = Parser::new(src)?;
    let expr = parser.or_expr()?;
    parser.finish()?;
    Ok(expr)
}

/// Parse a `for` header of the form `<pattern> in <expr>`.
pub(super) fn parse_loop_header(src: &str) -> Result<(LoopPattern, Expr), SyntaxError> {
    let mut parser = Parser::new(src)?;
    let pattern = parser.pattern()?;
    if !parser.eat_keyword("in") {
        return Err(SyntaxError::new("expected `in` in loop header"));
    }
    let iterable = parser.or_expr()?;
    parser.finish()?;
    Ok((pattern, iterable))
}

/// Name lookup: loop variables shadow the keys of the root context object.
pub(super) struct Scope<'a> {
    root: &'a Value,
    locals: Vec<(String, Value)>,
}

impl<'a> Scope<'a> {
    pub(super) const fn new(root: &'a Value) -> Self {
        Self {
            root,
            locals: Vec::new(),
        }
    }

    pub(super) fn depth(&self) -> usize {
        self.locals.len()
    }

    pub(super) fn truncate(&mut self, depth: usize) {
        self.locals.truncate(depth);
    }

    pub(super) fn bind(&mut self, pattern: &LoopPattern, item: Value) -> Result<(), RenderError> {
        match pattern {
            LoopPattern::Single(name) => self.locals.push((name.clone(), item)),
            LoopPattern::Tuple(names) => match item {
                Value::Array(values) if values.len() == names.len() => {
                    self.locals.extend(names.iter().cloned().zip(values));
                }
                other => {
                    return Err(RenderError::Destructure {
                        expected: names.len(),
                        found: describe(&other).to_owned(),
                    });
                }
            },
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Value, RenderError> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(local, _)| local == name) {
            return Ok(value.clone());
        }
        self.root
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::UndefinedName {
                name: name.to_owned(),
            })
    }

    pub(super) fn eval(&self, expr: &Expr) -> Result<Value, RenderError> {
        Ok(match expr {
            Expr::Literal(value) => value.clone(),
            Expr::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Name(name) => self.lookup(name)?,
            Expr::Attr(base, name) => match self.eval(base)? {
                Value::Object(mut map) => map.remove(name).unwrap_or(Value::Null),
                _ => Value::Null,
            },
            Expr::Index(base, index) => index_value(self.eval(base)?, &self.eval(index)?),
            Expr::Not(inner) => Value::Bool(!truthy(&self.eval(inner)?)),
            Expr::And(lhs, rhs) => {
                let left = self.eval(lhs)?;
                if truthy(&left) { self.eval(rhs)? } else { left }
            }
            Expr::Or(lhs, rhs) => {
                let left = self.eval(lhs)?;
                if truthy(&left) { left } else { self.eval(rhs)? }
            }
            Expr::Compare(lhs, op, rhs) => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                Value::Bool(match op {
                    CompareOp::Eq => left == right,
                    CompareOp::Ne => left != right,
                    CompareOp::In => contains(&right, &left),
                    CompareOp::NotIn => !contains(&right, &left),
                })
            }
        })
    }
}

fn index_value(base: Value, index: &Value) -> Value {
    match (base, index) {
        (Value::Array(mut items), Value::Number(n)) => {
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let position = n.as_i64().map(|i| if i < 0 { len + i } else { i });
            position
                .and_then(|p| usize::try_from(p).ok())
                .filter(|p| *p < items.len())
                .map_or(Value::Null, |p| items.swap_remove(p))
        }
        (Value::Object(mut map), Value::String(key)) => map.remove(key).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Array(items), _) => items.contains(needle),
        (Value::String(text), Value::String(part)) => text.contains(part.as_str()),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        _ => false,
    }
}

/// Truthiness used by `if`, `and`, `or` and `not`.
pub(super) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Human-readable kind of a value for error messages.
pub(super) const fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// String form appended to the output for a substitution.
pub(super) fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
