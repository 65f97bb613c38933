//! Builds the project graph from a workspace document.
//!
//! Construction runs in ordered phases over the configuration matrix:
//! qualify targets, add alias projects, collect solution folders, sort.
//! See [`build`].

mod builder;
mod matrix;
mod qualify;

use std::collections::HashMap;

use indexmap::IndexSet;
use thiserror::Error;

use crate::ast::{TargetDecl, Workspace};
use crate::identify::IdentifyError;

pub use builder::{build, quote_name};
pub use matrix::build_matrix;
pub use qualify::{
    Membership, qualify, spec_modules, supports_configuration, supports_platform,
};

/// User choices that shape the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphOptions {
    /// Specs to generate for; empty means every spec.
    pub specs: Vec<String>,
    /// Restrict generation to one spec and name the solution after it.
    pub project_spec: Option<String>,
    /// Project sorted first in the solution.
    pub default_project: Option<String>,
    /// Game projects to include; `None` uses the workspace default.
    pub enabled_game_projects: Option<Vec<String>>,
    /// Add the install-all alias project.
    pub install_alias: bool,
    /// Add the source-tree view alias project.
    pub project_view: bool,
}

/// Fatal graph construction errors.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A spec named on the command line does not exist.
    #[error("unknown spec `{name}`")]
    UnknownSpec {
        /// Requested spec name.
        name: String,
    },
    /// No spec is enabled.
    #[error("no specs are enabled; declare at least one under `specs`")]
    NoEnabledSpecs,
    /// No platform can be loaded by the IDE version.
    #[error("no platform declares an IDE platform for IDE version {version}")]
    NoCompatiblePlatform {
        /// IDE version being generated for.
        version: String,
    },
    /// The default project is not part of the solution.
    #[error("default project `{name}` is not part of the solution")]
    UnknownDefaultProject {
        /// Requested project name.
        name: String,
    },
    /// An identifier could not be derived.
    #[error(transparent)]
    Identify(#[from] IdentifyError),
}

/// Name lookup over the workspace targets.
#[derive(Debug)]
pub struct TargetIndex<'a> {
    targets: &'a [TargetDecl],
    by_name: HashMap<&'a str, usize>,
}

impl<'a> TargetIndex<'a> {
    /// Index the targets of `workspace`.
    #[must_use]
    pub fn new(workspace: &'a Workspace) -> Self {
        let by_name = workspace
            .targets
            .iter()
            .enumerate()
            .map(|(index, target)| (target.name.as_str(), index))
            .collect();
        Self {
            targets: &workspace.targets,
            by_name,
        }
    }

    /// Target called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a TargetDecl> {
        self.by_name
            .get(name)
            .and_then(|index| self.targets.get(*index))
    }

    /// Position of the target called `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Target at `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&'a TargetDecl> {
        self.targets.get(index)
    }

    /// Every target in document order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a TargetDecl)> {
        self.targets.iter().enumerate()
    }
}

/// Names reachable from `roots` over uses edges of every scope, roots
/// included, in first-visit order.
///
/// The walk keeps an explicit worklist and a visited set, so cycles and long
/// chains are both safe. Names without a declared target are kept but not
/// expanded.
pub fn uses_closure<'a, I>(index: &TargetIndex<'a>, roots: I) -> IndexSet<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut visited = IndexSet::new();
    let mut pending: Vec<&'a str> = roots.into_iter().collect();
    pending.reverse();
    while let Some(name) = pending.pop() {
        if !visited.insert(name) {
            continue;
        }
        if let Some(target) = index.get(name) {
            let mut next: Vec<&'a str> = target
                .all_uses()
                .filter(|used| !visited.contains(used))
                .collect();
            next.reverse();
            pending.extend(next);
        }
    }
    visited
}
