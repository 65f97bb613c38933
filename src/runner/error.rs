//! Error types for the runner module.

// Same derive false positive as the manifest diagnostics.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised before the pipeline starts.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The workspace document does not exist at the expected path.
    #[error("workspace document {path} not found")]
    #[diagnostic(
        code(slnweave::runner::document_not_found),
        help("pass the document with `-f FILE` or run from its directory with `-C DIR`")
    )]
    DocumentNotFound {
        /// The path that was attempted.
        path: PathBuf,
    },
    /// A path given on the command line is not valid UTF-8.
    #[error("path {path} is not valid UTF-8")]
    #[diagnostic(code(slnweave::runner::non_utf8_path))]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },
}
