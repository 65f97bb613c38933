//! Idempotent file output.
//!
//! [`OutputWriter`] owns a capability handle on the output root and only
//! touches a file when its bytes would change, so unchanged projects keep
//! their modification times and IDEs do not reload them.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs as cap_fs};
use thiserror::Error;
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const BOM_EXTENSIONS: [&str; 2] = ["vcxproj", "vcproj"];

/// Result of a single [`OutputWriter::write`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file was created or replaced.
    Written,
    /// The file already held identical bytes and was left alone.
    Unchanged,
}

/// Errors raised while persisting generated files.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The output root could not be created or opened.
    #[error("failed to open output directory {path}")]
    OpenRoot {
        /// Output root path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// An existing file could not be read for comparison.
    #[error("failed to read existing file {path}")]
    Read {
        /// Path relative to the output root.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A parent directory could not be created.
    #[error("failed to create directory {path}")]
    CreateDir {
        /// Directory relative to the output root.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file could not be written.
    #[error("failed to write {path}")]
    Write {
        /// Path relative to the output root.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Writes generated text below a fixed root directory.
#[derive(Debug)]
pub struct OutputWriter {
    root: Utf8PathBuf,
    dir: cap_fs::Dir,
}

impl OutputWriter {
    /// Open (creating if needed) the output root.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::OpenRoot`] if the directory cannot be created
    /// or opened.
    pub fn open(root: &Utf8Path) -> Result<Self, OutputError> {
        let open_err = |source| OutputError::OpenRoot {
            path: root.to_owned(),
            source,
        };
        cap_fs::Dir::create_ambient_dir_all(root.as_std_path(), ambient_authority())
            .map_err(open_err)?;
        let dir = cap_fs::Dir::open_ambient_dir(root.as_std_path(), ambient_authority())
            .map_err(open_err)?;
        Ok(Self {
            root: root.to_owned(),
            dir,
        })
    }

    /// The directory this writer is rooted at.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Write `content` to `relative` unless the file already holds the same
    /// bytes. Project descriptors receive a UTF-8 byte-order mark.
    ///
    /// # Errors
    ///
    /// Returns an [`OutputError`] when the existing file cannot be read, a
    /// parent directory cannot be created or the write fails.
    pub fn write(&self, relative: &Utf8Path, content: &str) -> Result<WriteOutcome, OutputError> {
        let bytes = encode(relative, content);
        if self.existing(relative)?.as_deref() == Some(bytes.as_slice()) {
            debug!(path = %relative, "unchanged, skipping write");
            return Ok(WriteOutcome::Unchanged);
        }
        if let Some(parent) = relative.parent().filter(|p| !p.as_str().is_empty()) {
            self.dir
                .create_dir_all(parent.as_std_path())
                .map_err(|source| OutputError::CreateDir {
                    path: parent.to_owned(),
                    source,
                })?;
        }
        self.replace(relative, &bytes)
            .map_err(|source| OutputError::Write {
                path: relative.to_owned(),
                source,
            })?;
        info!(path = %self.root.join(relative), "wrote file");
        Ok(WriteOutcome::Written)
    }

    fn existing(&self, relative: &Utf8Path) -> Result<Option<Vec<u8>>, OutputError> {
        match self.dir.read(relative.as_std_path()) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(OutputError::Read {
                path: relative.to_owned(),
                source,
            }),
        }
    }

    fn replace(&self, relative: &Utf8Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = self.dir.create(relative.as_std_path())?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_all()
    }
}

fn encode(path: &Utf8Path, content: &str) -> Vec<u8> {
    let wants_bom = path
        .extension()
        .is_some_and(|ext| BOM_EXTENSIONS.iter().any(|b| ext.eq_ignore_ascii_case(b)));
    let mut bytes = Vec::with_capacity(content.len() + UTF8_BOM.len());
    if wants_bom {
        bytes.extend_from_slice(UTF8_BOM);
    }
    bytes.extend_from_slice(content.as_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result, ensure};
    use rstest::rstest;
    use std::{thread, time::Duration};

    fn writer_in(temp: &tempfile::TempDir) -> Result<OutputWriter> {
        let root = Utf8Path::from_path(temp.path()).context("utf-8 temp dir")?;
        Ok(OutputWriter::open(&root.join("out"))?)
    }

    #[rstest]
    #[case("a.vcxproj", true)]
    #[case("a.VCPROJ", true)]
    #[case("a.vcxproj.filters", false)]
    #[case("a.sln", false)]
    fn bom_follows_extension(#[case] path: &str, #[case] expected: bool) {
        let bytes = encode(Utf8Path::new(path), "x");
        assert_eq!(bytes.starts_with(UTF8_BOM), expected);
    }

    #[test]
    fn identical_rewrite_keeps_mtime() -> Result<()> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        let writer = writer_in(&temp)?;
        let rel = Utf8Path::new("nested/p.vcxproj");

        ensure!(writer.write(rel, "<P/>")? == WriteOutcome::Written);
        let full = writer.root().join(rel);
        let before = std::fs::metadata(&full).context("stat")?.modified()?;
        thread::sleep(Duration::from_millis(20));
        ensure!(writer.write(rel, "<P/>")? == WriteOutcome::Unchanged);
        let after = std::fs::metadata(&full).context("stat")?.modified()?;
        ensure!(before == after, "mtime changed on identical write");

        let bytes = std::fs::read(&full).context("read back")?;
        ensure!(bytes == b"\xEF\xBB\xBF<P/>", "unexpected bytes {bytes:?}");
        Ok(())
    }

    #[test]
    fn changed_content_is_rewritten() -> Result<()> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        let writer = writer_in(&temp)?;
        let rel = Utf8Path::new("x.sln");

        writer.write(rel, "one")?;
        let before = std::fs::metadata(writer.root().join(rel))?.modified()?;
        thread::sleep(Duration::from_millis(20));
        ensure!(writer.write(rel, "two")? == WriteOutcome::Written);
        let after = std::fs::metadata(writer.root().join(rel))?.modified()?;
        let text = std::fs::read_to_string(writer.root().join(rel))?;
        ensure!(text == "two", "content not replaced: {text}");
        ensure!(after >= before, "mtime went backwards");
        Ok(())
    }
}
