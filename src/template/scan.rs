//! Splits template markup into literal text and `${...}` directives.

use super::TemplateError;

/// A lexical piece of template markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Piece {
    /// Literal text with `$$` already collapsed to `$`.
    Text(String),
    /// The raw contents of a `${...}` directive and its byte offset.
    Directive { code: String, offset: usize },
}

/// Scan `markup` into an ordered list of pieces.
///
/// `$$` yields a literal `$` and a lone `$` not followed by `{` is kept as-is.
/// A backslash is always literal. Directives end at the first `}`.
pub(super) fn scan(markup: &str) -> Result<Vec<Piece>, TemplateError> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut chars = markup.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        if ch != '$' {
            text.push(ch);
            continue;
        }
        match chars.peek().map(|(_, next)| *next) {
            Some('$') => {
                chars.next();
                text.push('$');
            }
            Some('{') => {
                chars.next();
                let mut code = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    code.push(inner);
                }
                if !closed {
                    return Err(TemplateError::UnterminatedExpression { offset });
                }
                if !text.is_empty() {
                    pieces.push(Piece::Text(std::mem::take(&mut text)));
                }
                pieces.push(Piece::Directive { code, offset });
            }
            _ => text.push('$'),
        }
    }

    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "scanner tests use expect for clearer failures")]

    use super::*;
    use rstest::rstest;

    fn directive(code: &str, offset: usize) -> Piece {
        Piece::Directive {
            code: code.into(),
            offset,
        }
    }

    #[rstest]
    fn splits_text_and_directives() {
        let pieces = scan("a${x}b").expect("scan");
        assert_eq!(
            pieces,
            vec![
                Piece::Text("a".into()),
                directive("x", 1),
                Piece::Text("b".into())
            ]
        );
    }

    #[rstest]
    #[case("cost: $$5", "cost: $5")]
    #[case(r"C:\path\$$x", r"C:\path\$x")]
    #[case("lone $ sign", "lone $ sign")]
    fn escapes_are_collapsed(#[case] markup: &str, #[case] expected: &str) {
        let pieces = scan(markup).expect("scan");
        assert_eq!(pieces, vec![Piece::Text(expected.into())]);
    }

    #[rstest]
    fn unterminated_directive_reports_offset() {
        let err = scan("ok ${oops").expect_err("unterminated");
        assert_eq!(err, TemplateError::UnterminatedExpression { offset: 3 });
    }
}
