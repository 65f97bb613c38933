//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Selection
//! flags shared by `generate` and `list` live in [`GenerateArgs`], which also
//! converts them into graph and resolution options.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::graph::GraphOptions;
use crate::manifest::DEFAULT_DOCUMENT;
use crate::resolve::{MergePolicy, ResolveOptions};

/// Generates IDE project and solution files from a YAML build-target graph.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the workspace document.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_DOCUMENT)]
    pub file: PathBuf,

    /// Run as if started in this directory.
    ///
    /// The workspace document and every generated file are resolved
    /// against it.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Optional subcommand to execute; defaults to `generate` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Generate(GenerateArgs::default()));
        }
        self
    }
}

/// Setting categories whose duplicates can be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateCategory {
    /// Include directories.
    Includes,
    /// Preprocessor defines.
    Defines,
}

/// Selection and layout options shared by `generate` and `list`.
#[derive(Debug, Args, Default, PartialEq, Eq, Clone)]
pub struct GenerateArgs {
    /// Comma-separated specs to generate for. Defaults to every spec.
    #[arg(long, value_name = "SPEC", value_delimiter = ',')]
    pub specs: Vec<String>,

    /// Generate for a single spec and name the solution after it.
    #[arg(long, value_name = "SPEC")]
    pub project_spec: Option<String>,

    /// Project listed first in the solution.
    #[arg(long, value_name = "PROJECT")]
    pub default_project: Option<String>,

    /// Comma-separated game projects to include.
    #[arg(long, value_name = "PROJECT", value_delimiter = ',')]
    pub enabled_game_projects: Option<Vec<String>>,

    /// Add an alias project that builds and installs everything.
    #[arg(long)]
    pub install_alias: bool,

    /// Add an alias project listing the whole source tree.
    #[arg(long)]
    pub project_view: bool,

    /// Solution file name without extension.
    #[arg(long, value_name = "NAME")]
    pub solution_name: Option<String>,

    /// Keep duplicate entries in this merged list instead of dropping them.
    #[arg(long, value_enum, value_name = "CATEGORY")]
    pub keep_duplicate: Vec<DuplicateCategory>,

    /// Ask the build tool for verbose output from IDE build commands.
    #[arg(long)]
    pub verbose_build: bool,
}

impl GenerateArgs {
    /// Options controlling graph construction.
    #[must_use]
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            specs: self.specs.clone(),
            project_spec: self.project_spec.clone(),
            default_project: self.default_project.clone(),
            enabled_game_projects: self.enabled_game_projects.clone(),
            install_alias: self.install_alias,
            project_view: self.project_view,
        }
    }

    fn policy(&self, category: DuplicateCategory) -> MergePolicy {
        if self.keep_duplicate.contains(&category) {
            MergePolicy::Append
        } else {
            MergePolicy::Unique
        }
    }

    /// Options controlling row resolution.
    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            includes: self.policy(DuplicateCategory::Includes),
            defines: self.policy(DuplicateCategory::Defines),
            verbose_build: self.verbose_build,
        }
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Write project, filter, user and property files plus the solution.
    Generate(GenerateArgs),

    /// Print the qualified projects in solution order without writing.
    List(GenerateArgs),
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "CLI tests use expect for clearer failures")]

    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[rstest]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[rstest]
    fn defaults_to_generate() {
        let cli = Cli::try_parse_from(["slnweave"]).expect("parse").with_default_command();
        assert_eq!(cli.file, PathBuf::from(DEFAULT_DOCUMENT));
        assert_eq!(cli.command, Some(Commands::Generate(GenerateArgs::default())));
    }

    #[rstest]
    fn generate_flags_map_onto_options() {
        let cli = Cli::try_parse_from([
            "slnweave",
            "-C",
            "work",
            "generate",
            "--specs",
            "all,game",
            "--enabled-game-projects",
            "Demo",
            "--install-alias",
            "--keep-duplicate",
            "defines",
        ])
        .expect("parse");
        let Some(Commands::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        let graph = args.graph_options();
        assert_eq!(graph.specs, ["all", "game"]);
        assert_eq!(graph.enabled_game_projects, Some(vec!["Demo".to_owned()]));
        assert!(graph.install_alias && !graph.project_view);
        let resolve = args.resolve_options();
        assert_eq!(resolve.includes, MergePolicy::Unique);
        assert_eq!(resolve.defines, MergePolicy::Append);
        assert_eq!(cli.directory, Some(PathBuf::from("work")));
    }

    #[rstest]
    #[case(&["slnweave", "generate", "--keep-duplicate", "flags"])]
    #[case(&["slnweave", "build"])]
    fn rejects_unknown_input(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
