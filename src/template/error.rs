//! Error types raised while compiling and rendering templates.

use thiserror::Error;

/// Errors raised while compiling template markup.
///
/// Offsets are byte positions of the offending `${` in the markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `${` was opened but never closed.
    #[error("unterminated expression starting at byte {offset}")]
    UnterminatedExpression {
        /// Byte offset of the opening `${`.
        offset: usize,
    },
    /// A directive contained nothing but whitespace.
    #[error("empty expression at byte {offset}")]
    EmptyExpression {
        /// Byte offset of the directive.
        offset: usize,
    },
    /// A closing or continuation keyword appeared with no open block.
    #[error("`{keyword}` at byte {offset} has no matching opening block")]
    UnexpectedBlock {
        /// The stray keyword.
        keyword: &'static str,
        /// Byte offset of the directive.
        offset: usize,
    },
    /// A block was closed with the wrong keyword.
    #[error("expected `{expected}` at byte {offset} but found `{found}`")]
    MismatchedBlock {
        /// Keyword required to close the innermost block.
        expected: &'static str,
        /// Keyword actually encountered.
        found: &'static str,
        /// Byte offset of the directive.
        offset: usize,
    },
    /// An `else` or `elif` followed an `else` in the same conditional.
    #[error("`{keyword}` at byte {offset} follows `else`")]
    BranchAfterElse {
        /// The offending keyword.
        keyword: &'static str,
        /// Byte offset of the directive.
        offset: usize,
    },
    /// The markup ended while a block was still open.
    #[error("`{keyword}` opened at byte {offset} is never closed")]
    UnclosedBlock {
        /// Keyword that opened the block.
        keyword: &'static str,
        /// Byte offset of the opening directive.
        offset: usize,
    },
    /// An expression or loop header could not be parsed.
    #[error("invalid expression at byte {offset}: {message}")]
    Syntax {
        /// Byte offset of the directive.
        offset: usize,
        /// Description of the parse failure.
        message: String,
    },
}

/// Errors raised while rendering a compiled template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A name is neither a loop variable nor a context key.
    #[error("undefined name `{name}`")]
    UndefinedName {
        /// The unresolved name.
        name: String,
    },
    /// A `for` loop was asked to iterate over a scalar.
    #[error("cannot iterate over a {found}")]
    NotIterable {
        /// Kind of value encountered.
        found: &'static str,
    },
    /// A tuple loop pattern did not match the element shape.
    #[error("cannot unpack {found} into {expected} loop variables")]
    Destructure {
        /// Number of names in the loop pattern.
        expected: usize,
        /// Description of the element encountered.
        found: String,
    },
}
