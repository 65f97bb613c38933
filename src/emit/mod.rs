//! Renders the resolved graph into IDE files.
//!
//! Every template is compiled before anything is rendered, and every file is
//! rendered before anything is written, so a broken template or context
//! leaves the output tree untouched. Rendered text is normalised to CRLF
//! line endings with blank lines removed.

mod sources;
mod templates;
mod view;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::info;

use crate::ast::Workspace;
use crate::identify::IdentifyError;
use crate::model::{AliasKind, Layout, Node, NodeKind, ProjectGraph};
use crate::output::{OutputError, OutputWriter, WriteOutcome};
use crate::template::{RenderError, Template, TemplateError};

pub use sources::{
    FolderItem, SourceItem, build_all_sources, folders, project_view_sources, target_sources,
};
pub use view::{FOLDER_TYPE, VC_PROJECT_TYPE, project_context, solution_context};

/// Errors raised while rendering or writing IDE files.
#[derive(Debug, Error)]
pub enum EmitError {
    /// A built-in template failed to compile.
    #[error("failed to compile the {name} template")]
    Template {
        /// Which template.
        name: &'static str,
        /// Compilation failure.
        #[source]
        source: TemplateError,
    },
    /// A file failed to render.
    #[error("failed to render {file}")]
    Render {
        /// File being rendered.
        file: Utf8PathBuf,
        /// Render failure.
        #[source]
        source: RenderError,
    },
    /// A render context could not be serialised.
    #[error("failed to build render context")]
    Context(#[from] serde_json::Error),
    /// A folder identifier could not be derived.
    #[error(transparent)]
    Identify(#[from] IdentifyError),
    /// A rendered file could not be written.
    #[error(transparent)]
    Output(#[from] OutputError),
    /// The source tree could not be walked for the project view.
    #[error("failed to walk the source tree")]
    Walk(#[from] walkdir::Error),
    /// A project view exclusion is not a valid glob.
    #[error("invalid project view exclusion `{pattern}`")]
    Pattern {
        /// The rejected pattern.
        pattern: String,
        /// Parse failure.
        #[source]
        source: glob::PatternError,
    },
}

/// Counts of files touched by one emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Files created or replaced.
    pub written: usize,
    /// Files that already held identical content.
    pub unchanged: usize,
}

/// The compiled markup of every generated file kind.
#[derive(Debug, Clone)]
pub struct Templates {
    project: Template,
    filters: Template,
    user: Template,
    property_sheet: Template,
    solution: Template,
}

fn compile(name: &'static str, markup: &str) -> Result<Template, EmitError> {
    Template::compile(markup).map_err(|source| EmitError::Template { name, source })
}

impl Templates {
    /// Compile the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Template`] naming the first template that fails.
    pub fn compile() -> Result<Self, EmitError> {
        Ok(Self {
            project: compile("project", templates::PROJECT)?,
            filters: compile("filters", templates::FILTERS)?,
            user: compile("user", templates::USER)?,
            property_sheet: compile("property sheet", templates::PROPERTY_SHEET)?,
            solution: compile("solution", templates::SOLUTION)?,
        })
    }

    /// Per-project templates paired with the suffix appended to the project
    /// file name.
    const fn per_project(&self) -> [(&'static str, &Template); 4] {
        [
            ("", &self.project),
            (".filters", &self.filters),
            (".user", &self.user),
            (".default.props", &self.property_sheet),
        ]
    }
}

/// Drop whitespace-only lines and terminate every line with CRLF.
#[must_use]
pub fn normalise(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        out.push_str(line);
        out.push_str("\r\n");
    }
    out
}

fn render(template: &Template, context: &serde_json::Value, file: &Utf8Path) -> Result<String, EmitError> {
    template
        .render(context)
        .map(|text| normalise(&text))
        .map_err(|source| EmitError::Render {
            file: file.to_owned(),
            source,
        })
}

fn sources_of(
    workspace: &Workspace,
    layout: &Layout,
    node: &Node,
) -> Result<Vec<SourceItem>, EmitError> {
    Ok(match node.kind {
        NodeKind::Target(index) => workspace
            .targets
            .get(index)
            .map(|target| target_sources(layout, target))
            .unwrap_or_default(),
        NodeKind::Alias(AliasKind::BuildAll) => build_all_sources(layout),
        NodeKind::Alias(AliasKind::ProjectView) => project_view_sources(workspace, layout)?,
        NodeKind::Alias(AliasKind::InstallAll) | NodeKind::Directory => Vec::new(),
    })
}

/// Render every file of `graph` without touching the filesystem, as
/// `(path relative to the workspace root, text)` pairs in write order.
///
/// # Errors
///
/// Returns an [`EmitError`] if a source listing, identifier or render fails.
pub fn render_all(
    templates: &Templates,
    workspace: &Workspace,
    layout: &Layout,
    graph: &ProjectGraph,
) -> Result<Vec<(Utf8PathBuf, String)>, EmitError> {
    let mut files = Vec::new();
    for (_, node) in graph.projects() {
        let Some(project_file) = node.project_file.as_deref() else {
            continue;
        };
        let items = sources_of(workspace, layout, node)?;
        let folders = folders(&items, &node.id)?;
        let context = project_context(workspace, layout, node, &items, &folders)?;
        for (suffix, template) in templates.per_project() {
            let path = Utf8PathBuf::from(format!("{project_file}{suffix}"));
            let text = render(template, &context, &path)?;
            files.push((path, text));
        }
    }
    let context = solution_context(workspace, layout, graph)?;
    let text = render(&templates.solution, &context, &layout.solution_file)?;
    files.push((layout.solution_file.clone(), text));
    Ok(files)
}

/// Compile, render and write every file of `graph` below the writer's root.
///
/// # Errors
///
/// Returns an [`EmitError`] on the first compile, render or write failure.
/// Nothing is written unless every file renders.
pub fn emit(
    workspace: &Workspace,
    layout: &Layout,
    graph: &ProjectGraph,
    writer: &OutputWriter,
) -> Result<EmitReport, EmitError> {
    let templates = Templates::compile()?;
    let files = render_all(&templates, workspace, layout, graph)?;
    let mut report = EmitReport::default();
    for (path, text) in &files {
        match writer.write(path, text)? {
            WriteOutcome::Written => report.written += 1,
            WriteOutcome::Unchanged => report.unchanged += 1,
        }
    }
    info!(
        written = report.written,
        unchanged = report.unchanged,
        "emitted IDE files"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "emitter tests use expect for clearer failures")]

    use super::*;
    use crate::graph::{GraphOptions, build};
    use crate::resolve::{ResolveOptions, resolve};
    use anyhow::{Context, Result, ensure};
    use rstest::{fixture, rstest};

    const DOC: &str = "slnweave_version: 1.0.0
solution: { name: Demo, build_tool: waf }
ide: { name: vs2017, version: '15', globals: { WindowsTargetPlatformVersion: '10.0' } }
specs:
  - name: all
    modules: { all: [game] }
platforms:
  - name: win_x64
    ide_platform: x64
    ide_versions: ['15']
    compat_toolsets: [v141]
    configurations: [{ name: debug }]
environments:
  win_x64_debug:
    DEFINES: [_DEBUG, 'A<B']
    cxxprogram_PATTERN: '%s.exe'
    cxxstlib_PATTERN: '%s.lib'
targets:
  - name: game
    kind: program
    path: Code/Game
    filter: Code/Game
    use: core
    deploy: [x64]
    files: { root: [main.cpp], Include: [game.h] }
  - name: core
    path: Code/Core
    filter: Code/Framework
    export_defines: CORE
    files: { Source/Detail: [core.cpp] }
";

    #[fixture]
    fn workspace() -> Workspace {
        crate::manifest::from_str(DOC).expect("workspace")
    }

    fn rendered(ws: &Workspace) -> Vec<(Utf8PathBuf, String)> {
        let layout = Layout::new(ws, Utf8Path::new("/ws"), Utf8Path::new("slnweave.yml"), "Demo");
        let mut graph = build(ws, &layout, &GraphOptions::default()).expect("graph");
        resolve(ws, &layout, ResolveOptions::default(), &mut graph);
        let templates = Templates::compile().expect("templates");
        render_all(&templates, ws, &layout, &graph).expect("render")
    }

    fn file<'f>(files: &'f [(Utf8PathBuf, String)], path: &str) -> &'f str {
        files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, text)| text.as_str())
            .expect("rendered file")
    }

    #[rstest]
    fn normalise_drops_blank_lines_and_uses_crlf() {
        assert_eq!(normalise("a\n\t\t\n  b\r\n\n"), "a\r\n  b\r\n");
        assert_eq!(normalise(""), "");
    }

    #[rstest]
    fn every_project_gets_four_files_and_one_solution(workspace: Workspace) {
        let files = rendered(&workspace);
        let names: Vec<_> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(names.len(), 3 * 4 + 1);
        assert!(names.contains(&"Solutions/Demo.depproj/game.vcxproj.filters"));
        assert!(names.contains(&"Solutions/Demo.depproj/_ALL_.vcxproj.default.props"));
        assert_eq!(names.last(), Some(&"Solutions/Demo.sln"));
        for (path, text) in &files {
            assert!(text.ends_with("\r\n"), "{path} lacks a trailing CRLF");
            assert!(!text.contains("\r\n\r\n"), "{path} has blank lines");
            assert!(!text.contains("${"), "{path} has unrendered directives");
        }
    }

    #[rstest]
    fn descriptors_carry_escaped_rows_and_globals(workspace: Workspace) {
        let files = rendered(&workspace);
        let game = file(&files, "Solutions/Demo.depproj/game.vcxproj");
        assert!(game.contains("<WindowsTargetPlatformVersion>10.0</WindowsTargetPlatformVersion>"));
        assert!(game.contains("<ProjectConfiguration Include=\"[all] debug|x64\">"));
        assert!(game.contains("_DEBUG;A&lt;B;CORE;$(NMakePreprocessorDefinitions)"));
        assert!(game.contains("<NMakeOutput>/ws/bin/win_x64_debug/game.exe</NMakeOutput>"));
        assert!(game.contains("<ClCompile Include=\"\\ws\\Code\\Game\\main.cpp\" />"));
        assert!(game.contains("<ClInclude Include=\"\\ws\\Code\\Game\\game.h\" />"));
    }

    #[rstest]
    fn filters_list_every_folder_prefix(workspace: Workspace) {
        let files = rendered(&workspace);
        let core = file(&files, "Solutions/Demo.depproj/core.vcxproj.filters");
        assert!(core.contains("<Filter Include=\"Source\">"));
        assert!(core.contains("<Filter Include=\"Source\\Detail\">"));
        assert!(core.contains("<Filter>Source\\Detail</Filter>"));
    }

    #[rstest]
    fn solution_nests_projects_and_marks_build_and_deploy(workspace: Workspace) {
        let files = rendered(&workspace);
        let sln = file(&files, "Solutions/Demo.sln");
        assert!(sln.starts_with("Microsoft Visual Studio Solution File, Format Version 12.00\r\n"));
        assert!(sln.contains(&format!("Project(\"{{{VC_PROJECT_TYPE}}}\") = \"game\", \"Demo.depproj\\game.vcxproj\"")));
        assert!(sln.contains(&format!("Project(\"{{{FOLDER_TYPE}}}\") = \"Framework\", \"Framework\"")));
        assert!(sln.contains("\t\t[all] debug|x64 = [all] debug|x64\r\n"));
        assert_eq!(sln.matches(".Build.0 = ").count(), 1);
        assert_eq!(sln.matches(".Deploy.0 = ").count(), 1);
        assert_eq!(sln.matches("ProjectSection(ProjectDependencies)").count(), 2);
        assert_eq!(sln.matches("} = {").count(), 2 + 4);
    }

    #[rstest]
    fn emission_is_idempotent(workspace: Workspace) -> Result<()> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        let root = Utf8Path::from_path(temp.path()).context("utf-8 temp dir")?;
        let layout = Layout::new(&workspace, root, Utf8Path::new("slnweave.yml"), "Demo");
        let mut graph = build(&workspace, &layout, &GraphOptions::default())?;
        resolve(&workspace, &layout, ResolveOptions::default(), &mut graph);
        let writer = OutputWriter::open(root)?;

        let first = emit(&workspace, &layout, &graph, &writer)?;
        ensure!(first == EmitReport { written: 13, unchanged: 0 }, "{first:?}");
        let second = emit(&workspace, &layout, &graph, &writer)?;
        ensure!(second == EmitReport { written: 0, unchanged: 13 }, "{second:?}");

        let bytes = std::fs::read(root.join("Solutions/Demo.depproj/core.vcxproj"))?;
        ensure!(bytes.starts_with(b"\xEF\xBB\xBF<?xml"), "descriptor lacks BOM");
        Ok(())
    }
}
