//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal: [`run`] loads the workspace document,
//! builds and resolves the project graph, then either writes the IDE files
//! or lists the projects that would be generated.

mod error;

pub use error::RunnerError;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::ast::Workspace;
use crate::cli::{Cli, Commands, GenerateArgs};
use crate::emit::{self, EmitReport};
use crate::graph::{self, GraphError};
use crate::manifest;
use crate::model::{Layout, ProjectGraph, absolutise};
use crate::output::OutputWriter;
use crate::resolve;

/// A loaded workspace with its resolved project graph.
#[derive(Debug)]
pub struct Session {
    /// The parsed workspace document.
    pub workspace: Workspace,
    /// Output locations for this run.
    pub layout: Layout,
    /// The resolved project graph.
    pub graph: ProjectGraph,
}

fn utf8(path: PathBuf) -> Result<Utf8PathBuf, RunnerError> {
    Utf8PathBuf::from_path_buf(path).map_err(|rejected| RunnerError::NonUtf8Path { path: rejected })
}

/// Absolute path of the workspace document, honouring `-C`.
///
/// # Errors
///
/// Returns an error if a path is not UTF-8 or the current directory cannot
/// be read.
pub fn document_path(cli: &Cli) -> Result<Utf8PathBuf> {
    let file = utf8(cli.file.clone())?;
    let directory = cli.directory.clone().map(utf8).transpose()?.unwrap_or_default();
    let cwd = utf8(std::env::current_dir().context("failed to read current directory")?)?;
    let base = absolutise(&cwd, directory.as_str());
    Ok(absolutise(&base, file.as_str()))
}

/// Solution file stem: `<display name>_<ide>` for a single project spec,
/// otherwise `--solution-name` or the document's solution name.
///
/// # Errors
///
/// Returns [`GraphError::UnknownSpec`] when the project spec is not
/// declared.
pub fn solution_name(workspace: &Workspace, args: &GenerateArgs) -> Result<String, GraphError> {
    if let Some(name) = &args.project_spec {
        let spec = workspace
            .specs
            .iter()
            .find(|spec| &spec.name == name)
            .ok_or_else(|| GraphError::UnknownSpec { name: name.clone() })?;
        let display: String = spec.display().split_whitespace().collect();
        return Ok(format!("{display}_{}", workspace.ide.name));
    }
    Ok(args
        .solution_name
        .clone()
        .unwrap_or_else(|| workspace.solution.name.clone()))
}

/// Load the document named by `cli`, then build and resolve its graph.
///
/// # Errors
///
/// Returns an error if the document is missing or invalid, or if the graph
/// cannot be built.
pub fn prepare(cli: &Cli, args: &GenerateArgs) -> Result<Session> {
    let document = document_path(cli)?;
    if !document.exists() {
        return Err(RunnerError::DocumentNotFound {
            path: document.into_std_path_buf(),
        }
        .into());
    }
    let workspace = manifest::from_path(&document)
        .with_context(|| format!("failed to load workspace document {document}"))?;
    let root = document.parent().unwrap_or(Utf8Path::new("/")).to_owned();
    let file_name = document.file_name().unwrap_or(manifest::DEFAULT_DOCUMENT);
    let name = solution_name(&workspace, args)?;
    let layout = Layout::new(&workspace, &root, Utf8Path::new(file_name), &name);
    debug!(root = %layout.root, solution = %layout.solution_file, "resolved layout");

    let mut graph = graph::build(&workspace, &layout, &args.graph_options())
        .context("failed to build the project graph")?;
    resolve::resolve(&workspace, &layout, args.resolve_options(), &mut graph);
    Ok(Session {
        workspace,
        layout,
        graph,
    })
}

/// Write every IDE file for the workspace named by `cli`.
///
/// # Errors
///
/// Returns an error if preparation, rendering or writing fails.
pub fn generate(cli: &Cli, args: &GenerateArgs) -> Result<EmitReport> {
    let session = prepare(cli, args)?;
    let writer = OutputWriter::open(&session.layout.root)
        .context("failed to open the workspace root for writing")?;
    let report = emit::emit(&session.workspace, &session.layout, &session.graph, &writer)
        .context("failed to emit IDE files")?;
    info!(
        solution = %session.layout.absolute(&session.layout.solution_file),
        projects = session.graph.projects().count(),
        written = report.written,
        unchanged = report.unchanged,
        "generation complete"
    );
    Ok(report)
}

/// Write the qualified project names in emission order, one per line.
///
/// # Errors
///
/// Returns an error if preparation fails or `out` cannot be written.
pub fn list<W: Write>(cli: &Cli, args: &GenerateArgs, out: &mut W) -> Result<()> {
    let session = prepare(cli, args)?;
    for (_, node) in session.graph.projects() {
        writeln!(out, "{}", node.name).context("failed to write project list")?;
    }
    Ok(())
}

/// Execute the parsed [`Cli`] command, writing listings to `out`.
///
/// # Errors
///
/// Returns an error if the selected command fails.
pub fn run_with_output<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    match &cli.command {
        Some(Commands::List(args)) => list(cli, args, out),
        Some(Commands::Generate(args)) => generate(cli, args).map(drop),
        None => generate(cli, &GenerateArgs::default()).map(drop),
    }
}

/// Execute the parsed [`Cli`] command against standard output.
///
/// # Errors
///
/// Returns an error if the selected command fails.
pub fn run(cli: &Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    run_with_output(cli, &mut handle)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "runner tests use expect for clearer failures")]

    use super::*;
    use anyhow::ensure;
    use rstest::rstest;

    fn cli(file: &str, directory: Option<&str>) -> Cli {
        Cli {
            file: file.into(),
            directory: directory.map(PathBuf::from),
            verbose: false,
            command: None,
        }
    }

    fn workspace() -> Workspace {
        manifest::from_str(
            "slnweave_version: 1.0.0\nsolution: { name: Demo, build_tool: waf }\n\
             ide: { name: vs2017, version: '15' }\n\
             specs:\n  - { name: game, display_name: Game Client }\n",
        )
        .expect("workspace")
    }

    #[rstest]
    fn absolute_directories_anchor_the_document() -> Result<()> {
        let path = document_path(&cli("conf/../slnweave.yml", Some("/work")))?;
        ensure!(path == "/work/slnweave.yml", "unexpected path {path}");
        Ok(())
    }

    #[rstest]
    fn relative_directories_join_the_current_directory() -> Result<()> {
        let path = document_path(&cli("slnweave.yml", Some("sub")))?;
        ensure!(path.is_absolute());
        ensure!(path.ends_with("sub/slnweave.yml"), "unexpected path {path}");
        Ok(())
    }

    #[rstest]
    #[case(GenerateArgs::default(), "Demo")]
    #[case(GenerateArgs { solution_name: Some("Other".into()), ..GenerateArgs::default() }, "Other")]
    #[case(GenerateArgs { project_spec: Some("game".into()), ..GenerateArgs::default() }, "GameClient_vs2017")]
    fn solution_names(#[case] args: GenerateArgs, #[case] expected: &str) {
        assert_eq!(solution_name(&workspace(), &args).expect("name"), expected);
    }

    #[rstest]
    fn unknown_project_spec_is_an_error() {
        let args = GenerateArgs {
            project_spec: Some("ghost".into()),
            ..GenerateArgs::default()
        };
        assert!(matches!(
            solution_name(&workspace(), &args),
            Err(GraphError::UnknownSpec { .. })
        ));
    }

    #[rstest]
    fn missing_documents_are_reported() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let dir = temp.path().to_str().expect("utf-8 temp dir");
        let err = prepare(&cli("absent.yml", Some(dir)), &GenerateArgs::default())
            .err()
            .ok_or_else(|| anyhow::anyhow!("missing document should fail"))?;
        ensure!(
            matches!(
                err.downcast_ref::<RunnerError>(),
                Some(RunnerError::DocumentNotFound { .. })
            ),
            "unexpected error: {err}"
        );
        Ok(())
    }
}
