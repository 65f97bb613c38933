//! Minimal template compiler.
//!
//! Markup is literal text interleaved with `${...}` directives. A directive
//! is either a control keyword (`if`, `elif`, `else`, `endif`, `for`,
//! `endfor`), an escaped substitution (`xml:<expr>`) or a plain substitution
//! (`<expr>`). `$$` produces a literal `$`.
//!
//! Compilation produces a tree of fragments which renders against a
//! [`serde_json::Value`] context:
//!
//! ```
//! use serde_json::json;
//! use slnweave::template::Template;
//!
//! let template = Template::compile("${for x in xs}<${xml:x}>${endfor}").unwrap();
//! let text = template.render(&json!({"xs": ["a", "&"]})).unwrap();
//! assert_eq!(text, "<a><&amp;>");
//! ```

mod error;
mod expr;
mod scan;

pub use error::{RenderError, TemplateError};

use expr::{Expr, LoopPattern, Scope, SyntaxError};
use scan::Piece;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Fragment {
    Text(String),
    Value {
        expr: Expr,
        escape: bool,
    },
    If {
        branches: Vec<(Expr, Vec<Fragment>)>,
        otherwise: Vec<Fragment>,
    },
    For {
        pattern: LoopPattern,
        iterable: Expr,
        body: Vec<Fragment>,
    },
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    fragments: Vec<Fragment>,
}

/// Compile `markup` into a [`Template`].
///
/// # Errors
///
/// See [`Template::compile`].
pub fn compile(markup: &str) -> Result<Template, TemplateError> {
    Template::compile(markup)
}

/// Escape the five XML special characters.
#[must_use]
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

enum Directive<'a> {
    If(&'a str),
    Elif(&'a str),
    Else,
    EndIf,
    For(&'a str),
    EndFor,
    Escaped(&'a str),
    Plain(&'a str),
}

fn classify(code: &str) -> Directive<'_> {
    let (word, rest) = code
        .split_once(char::is_whitespace)
        .map_or((code, ""), |(w, r)| (w, r.trim()));
    match word {
        "if" if !rest.is_empty() => Directive::If(rest),
        "elif" if !rest.is_empty() => Directive::Elif(rest),
        "for" if !rest.is_empty() => Directive::For(rest),
        "else" if rest.is_empty() => Directive::Else,
        "endif" if rest.is_empty() => Directive::EndIf,
        "endfor" if rest.is_empty() => Directive::EndFor,
        _ => code
            .strip_prefix("xml:")
            .map_or(Directive::Plain(code), |inner| Directive::Escaped(inner.trim())),
    }
}

/// An open block on the compiler stack.
enum Frame {
    If {
        offset: usize,
        done: Vec<(Expr, Vec<Fragment>)>,
        /// Condition of the branch being filled; `None` once inside `else`.
        pending: Option<Expr>,
        body: Vec<Fragment>,
    },
    For {
        offset: usize,
        pattern: LoopPattern,
        iterable: Expr,
        body: Vec<Fragment>,
    },
}

impl Frame {
    const fn closer(&self) -> &'static str {
        match self {
            Self::If { .. } => "endif",
            Self::For { .. } => "endfor",
        }
    }
}

#[derive(Default)]
struct Compiler {
    root: Vec<Fragment>,
    stack: Vec<Frame>,
}

impl Compiler {
    fn sink(&mut self) -> &mut Vec<Fragment> {
        match self.stack.last_mut() {
            Some(Frame::If { body, .. } | Frame::For { body, .. }) => body,
            None => &mut self.root,
        }
    }

    fn branch(
        &mut self,
        keyword: &'static str,
        condition: Option<Expr>,
        offset: usize,
    ) -> Result<(), TemplateError> {
        match self.stack.last_mut() {
            Some(Frame::If {
                done,
                pending,
                body,
                ..
            }) => {
                let Some(previous) = pending.take() else {
                    return Err(TemplateError::BranchAfterElse { keyword, offset });
                };
                done.push((previous, std::mem::take(body)));
                *pending = condition;
                Ok(())
            }
            Some(frame) => Err(TemplateError::MismatchedBlock {
                expected: frame.closer(),
                found: keyword,
                offset,
            }),
            None => Err(TemplateError::UnexpectedBlock { keyword, offset }),
        }
    }

    fn close(&mut self, keyword: &'static str, offset: usize) -> Result<(), TemplateError> {
        let Some(frame) = self.stack.pop() else {
            return Err(TemplateError::UnexpectedBlock { keyword, offset });
        };
        if frame.closer() != keyword {
            return Err(TemplateError::MismatchedBlock {
                expected: frame.closer(),
                found: keyword,
                offset,
            });
        }
        let fragment = match frame {
            Frame::If {
                mut done,
                pending,
                body,
                ..
            } => match pending {
                Some(condition) => {
                    done.push((condition, body));
                    Fragment::If {
                        branches: done,
                        otherwise: Vec::new(),
                    }
                }
                None => Fragment::If {
                    branches: done,
                    otherwise: body,
                },
            },
            Frame::For {
                pattern,
                iterable,
                body,
                ..
            } => Fragment::For {
                pattern,
                iterable,
                body,
            },
        };
        self.sink().push(fragment);
        Ok(())
    }

    fn directive(&mut self, code: &str, offset: usize) -> Result<(), TemplateError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(TemplateError::EmptyExpression { offset });
        }
        let syntax = |err: SyntaxError| TemplateError::Syntax {
            offset,
            message: err.0,
        };
        match classify(trimmed) {
            Directive::If(cond) => {
                let condition = expr::parse(cond).map_err(syntax)?;
                self.stack.push(Frame::If {
                    offset,
                    done: Vec::new(),
                    pending: Some(condition),
                    body: Vec::new(),
                });
            }
            Directive::Elif(cond) => {
                let condition = expr::parse(cond).map_err(syntax)?;
                self.branch("elif", Some(condition), offset)?;
            }
            Directive::Else => self.branch("else", None, offset)?,
            Directive::EndIf => self.close("endif", offset)?,
            Directive::For(header) => {
                let (pattern, iterable) = expr::parse_loop_header(header).map_err(syntax)?;
                self.stack.push(Frame::For {
                    offset,
                    pattern,
                    iterable,
                    body: Vec::new(),
                });
            }
            Directive::EndFor => self.close("endfor", offset)?,
            Directive::Escaped(src) => {
                let parsed = expr::parse(src).map_err(syntax)?;
                self.sink().push(Fragment::Value {
                    expr: parsed,
                    escape: true,
                });
            }
            Directive::Plain(src) => {
                let parsed = expr::parse(src).map_err(syntax)?;
                self.sink().push(Fragment::Value {
                    expr: parsed,
                    escape: false,
                });
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Fragment>, TemplateError> {
        match self.stack.pop() {
            Some(Frame::If { offset, .. }) => Err(TemplateError::UnclosedBlock {
                keyword: "if",
                offset,
            }),
            Some(Frame::For { offset, .. }) => Err(TemplateError::UnclosedBlock {
                keyword: "for",
                offset,
            }),
            None => Ok(self.root),
        }
    }
}

impl Template {
    /// Compile markup into a renderable template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when a directive is unterminated or empty,
    /// an expression is malformed, or control blocks are unbalanced.
    pub fn compile(markup: &str) -> Result<Self, TemplateError> {
        let mut compiler = Compiler::default();
        for piece in scan::scan(markup)? {
            match piece {
                Piece::Text(text) => compiler.sink().push(Fragment::Text(text)),
                Piece::Directive { code, offset } => compiler.directive(&code, offset)?,
            }
        }
        Ok(Self {
            fragments: compiler.finish()?,
        })
    }

    /// Render the template against `context`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when a name is undefined, a loop iterates over
    /// a scalar, or a tuple pattern does not match an element.
    pub fn render(&self, context: &Value) -> Result<String, RenderError> {
        let mut out = String::new();
        let mut scope = Scope::new(context);
        render_into(&self.fragments, &mut scope, &mut out)?;
        Ok(out)
    }
}

fn render_into(
    fragments: &[Fragment],
    scope: &mut Scope<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    for fragment in fragments {
        match fragment {
            Fragment::Text(text) => out.push_str(text),
            Fragment::Value { expr, escape } => {
                let text = expr::to_text(&scope.eval(expr)?);
                if *escape {
                    out.push_str(&xml_escape(&text));
                } else {
                    out.push_str(&text);
                }
            }
            Fragment::If {
                branches,
                otherwise,
            } => {
                let mut chosen = otherwise;
                for (condition, body) in branches {
                    if expr::truthy(&scope.eval(condition)?) {
                        chosen = body;
                        break;
                    }
                }
                render_into(chosen, scope, out)?;
            }
            Fragment::For {
                pattern,
                iterable,
                body,
            } => {
                for item in iteration_items(scope.eval(iterable)?)? {
                    let depth = scope.depth();
                    scope.bind(pattern, item)?;
                    let rendered = render_into(body, scope, out);
                    scope.truncate(depth);
                    rendered?;
                }
            }
        }
    }
    Ok(())
}

fn iteration_items(value: Value) -> Result<Vec<Value>, RenderError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, item)| Value::Array(vec![Value::String(key), item]))
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(RenderError::NotIterable {
            found: expr::describe(&other),
        }),
    }
}
