//! Where generated files live relative to the workspace root.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::ast::Workspace;

/// Resolved output locations for one run.
///
/// Relative paths are relative to [`Layout::root`]; use
/// [`Layout::absolute`] for the paths written into generated files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Absolute workspace root.
    pub root: Utf8PathBuf,
    /// Absolute path of the workspace document.
    pub document: Utf8PathBuf,
    /// Solution directory.
    pub solution_dir: Utf8PathBuf,
    /// Solution file.
    pub solution_file: Utf8PathBuf,
    /// Directory holding project files.
    pub projects_dir: Utf8PathBuf,
    /// Intermediate build directory.
    pub build_dir: Utf8PathBuf,
    /// Absolute engine root; equal to `root` unless an external engine is
    /// configured.
    pub engine_root: Utf8PathBuf,
}

impl Layout {
    /// Resolve the layout of `workspace` rooted at `root` for a solution
    /// called `solution_name`.
    #[must_use]
    pub fn new(
        workspace: &Workspace,
        root: &Utf8Path,
        document: &Utf8Path,
        solution_name: &str,
    ) -> Self {
        let settings = &workspace.solution;
        let solution_dir = Utf8PathBuf::from(&settings.directory);
        let projects_dir = settings.projects_dir.as_ref().map_or_else(
            || solution_dir.join(format!("{solution_name}.depproj")),
            Utf8PathBuf::from,
        );
        let engine_root = settings
            .engine_root
            .as_ref()
            .map_or_else(|| root.to_owned(), |engine| root.join(engine));
        Self {
            root: root.to_owned(),
            document: root.join(document),
            solution_file: solution_dir.join(format!("{solution_name}.sln")),
            solution_dir,
            projects_dir,
            build_dir: Utf8PathBuf::from(&settings.build_dir),
            engine_root,
        }
    }

    /// `relative` joined onto the workspace root.
    #[must_use]
    pub fn absolute(&self, relative: &Utf8Path) -> Utf8PathBuf {
        self.root.join(relative)
    }

    /// Absolute intermediate build directory.
    #[must_use]
    pub fn build_root(&self) -> Utf8PathBuf {
        self.root.join(&self.build_dir)
    }

    /// Whether the workspace builds against a separate engine checkout.
    #[must_use]
    pub fn is_external_engine(&self) -> bool {
        self.engine_root != self.root
    }

    /// `path` (relative to the root) expressed relative to the solution
    /// directory when it lies below it, otherwise as an absolute path.
    #[must_use]
    pub fn from_solution(&self, path: &Utf8Path) -> Utf8PathBuf {
        path.strip_prefix(&self.solution_dir)
            .map_or_else(|_| self.absolute(path), Utf8Path::to_path_buf)
    }
}

/// Render a path with Windows separators, as IDE files expect.
#[must_use]
pub fn windows_path(path: &Utf8Path) -> String {
    path.as_str().replace('/', "\\")
}

/// `path` joined onto `base` unless already absolute, with `.` and `..`
/// segments folded lexically.
#[must_use]
pub fn absolutise(base: &Utf8Path, path: &str) -> Utf8PathBuf {
    let joined = base.join(path);
    let mut folded = Utf8PathBuf::new();
    for component in joined.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if !folded.pop() {
                    folded.push(component);
                }
            }
            other => folded.push(other),
        }
    }
    folded
}
