//! Turns YAML and schema failures into `miette` diagnostics.
//!
//! Both kinds come from the same parser, so both carry a location.
//!
//! [`DocumentSource`] keeps the YAML text so spans can be rendered and
//! [`DocumentName`] labels where it came from.

// The miette/thiserror derives trip `unused_assignments` on some compiler
// versions and not others, so `#[expect]` cannot be used here.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::fmt;

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

use super::hints::{SCHEMA_HINTS, YAML_HINTS};

/// YAML text of a workspace document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource(String);

impl DocumentSource {
    /// Wrap document text.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self(src.into())
    }

    /// Borrow the document text.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for DocumentSource {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Display name of a workspace document, usually its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentName(String);

impl DocumentName {
    /// Wrap a display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the display name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for DocumentName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while loading a workspace document.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// The YAML or the schema was invalid.
    #[error("workspace document could not be parsed")]
    #[diagnostic(code(slnweave::manifest::parse))]
    Parse {
        /// Detailed diagnostic with span and hint.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
    },
    /// The document declares a format version this build cannot read.
    #[error("unsupported slnweave_version {version}")]
    #[diagnostic(
        code(slnweave::manifest::version),
        help("this release reads documents with slnweave_version 1.x")
    )]
    UnsupportedVersion {
        /// Declared version.
        version: semver::Version,
    },
    /// Two targets share a name.
    #[error("target `{name}` is declared more than once")]
    #[diagnostic(code(slnweave::manifest::duplicate_target))]
    DuplicateTarget {
        /// The repeated name.
        name: String,
    },
    /// Two specs would share one configuration label.
    #[error("specs `{first}` and `{second}` share the display name `{label}`")]
    #[diagnostic(
        code(slnweave::manifest::duplicate_spec_label),
        help("give each spec a distinct `display_name`")
    )]
    DuplicateSpecLabel {
        /// The shared display name.
        label: String,
        /// The spec declared first.
        first: String,
        /// The spec declared later.
        second: String,
    },
    /// A global project property key cannot be written as an XML element.
    #[error("global property `{key}` is not a valid XML element name")]
    #[diagnostic(
        code(slnweave::manifest::invalid_global),
        help("start with a letter or `_` and use only letters, digits, `_`, `-` and `.`")
    )]
    InvalidGlobal {
        /// The rejected key.
        key: String,
    },
    /// A name list refers to something the document does not declare.
    #[error("{kind} `{name}` referenced by `{owner}` is not declared")]
    #[diagnostic(code(slnweave::manifest::unknown_reference))]
    UnknownReference {
        /// What kind of entity was referenced.
        kind: &'static str,
        /// The missing name.
        name: String,
        /// The entity holding the reference.
        owner: String,
    },
}

fn line_column_to_index(src: &str, line: u64, column: u64) -> usize {
    let target_line = usize::try_from(line.saturating_sub(1)).unwrap_or(usize::MAX);
    let target_column = usize::try_from(column.saturating_sub(1)).unwrap_or(usize::MAX);
    let mut offset = 0usize;
    for (idx, segment) in src.split_inclusive('\n').enumerate() {
        if idx == target_line {
            let text = segment.trim_end_matches(['\n', '\r']);
            let column_offset = text
                .char_indices()
                .nth(target_column)
                .map_or(text.len(), |(byte_idx, _)| byte_idx);
            return offset + column_offset;
        }
        offset += segment.len();
    }
    src.len()
}

fn to_span(src: &DocumentSource, loc: Location) -> SourceSpan {
    let at = line_column_to_index(src.as_str(), loc.line(), loc.column());
    let bytes = src.as_str().as_bytes();
    let is_break = |b: u8| b == b'\n' || b == b'\r';
    let (start, end) = match bytes.get(at) {
        Some(&b) if !is_break(b) => (at, at + 1),
        _ if at > 0 && bytes.get(at - 1).is_some_and(|p| !is_break(*p)) => (at - 1, at),
        _ => (at, at),
    };
    SourceSpan::new(start.into(), end.saturating_sub(start))
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(slnweave::yaml::parse))]
struct YamlDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

fn indented_with_tab(src: &DocumentSource, loc: Option<Location>) -> bool {
    let Some(found) = loc else {
        return false;
    };
    let line_idx = usize::try_from(found.line().saturating_sub(1)).unwrap_or(usize::MAX);
    src.as_str()
        .lines()
        .nth(line_idx)
        .is_some_and(|line| line.chars().take_while(|c| c.is_whitespace()).any(|c| c == '\t'))
}

fn lookup_hint(table: &[(&str, &str)], message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    table
        .iter()
        .find(|(needle, _)| lower.contains(*needle))
        .map(|(_, hint)| (*hint).to_owned())
}

/// Convert a YAML or schema error into a diagnostic pointing at the
/// failure.
#[must_use]
pub fn map_yaml_error(
    err: YamlError,
    src: &DocumentSource,
    name: &DocumentName,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let loc = err.location();
    let (line, col, span) = loc.map_or((1, 1, None), |l| {
        (l.line(), l.column(), Some(to_span(src, l)))
    });
    let detail = err.to_string();
    let help = if indented_with_tab(src, loc) {
        Some("Indent with spaces; YAML forbids tabs.".to_owned())
    } else {
        lookup_hint(&YAML_HINTS, &detail).or_else(|| lookup_hint(&SCHEMA_HINTS, &detail))
    };
    let message = format!("{name}:{line}:{col}: YAML parse error: {detail}");
    Box::new(YamlDiagnostic {
        src: NamedSource::new(name.as_str(), src.as_str().to_owned()),
        span,
        help,
        source: err,
        message,
    })
}
