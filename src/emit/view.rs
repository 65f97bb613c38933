//! Serialisable render contexts.
//!
//! Views borrow from the graph and the workspace; they only add the derived
//! strings the markup needs (joined lists, solution-relative titles).

use itertools::Itertools;
use serde::Serialize;
use serde_json::{Value, json};

use crate::ast::Workspace;
use crate::identify::Identifier;
use crate::model::{
    AliasKind, ConfigurationProperty, Layout, MatrixEntry, Node, NodeKind, ProjectGraph,
    windows_path,
};

use super::EmitError;
use super::sources::{FolderItem, SourceItem};

/// Project type GUID of a makefile C++ project.
pub const VC_PROJECT_TYPE: &str = "8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942";

/// Project type GUID of a solution folder.
pub const FOLDER_TYPE: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";

#[derive(Debug, Serialize)]
struct RowView<'a> {
    #[serde(flatten)]
    row: &'a ConfigurationProperty,
    include_path: String,
    define_list: String,
    external: &'static str,
}

impl<'a> From<&'a ConfigurationProperty> for RowView<'a> {
    fn from(row: &'a ConfigurationProperty) -> Self {
        Self {
            row,
            include_path: row.includes.join(";"),
            define_list: row.defines.join(";"),
            external: if row.external_tool { "True" } else { "False" },
        }
    }
}

#[derive(Debug, Serialize)]
struct ProjectView<'a> {
    tools_version: &'a str,
    id: &'a Identifier,
    name: &'a str,
    globals: &'a indexmap::IndexMap<String, String>,
    rows: Vec<RowView<'a>>,
    items: &'a [SourceItem],
    folders: &'a [FolderItem],
    solution: String,
}

/// Context for the four per-project files of `node`.
///
/// # Errors
///
/// Returns [`EmitError::Context`] if the view cannot be serialised.
pub fn project_context(
    workspace: &Workspace,
    layout: &Layout,
    node: &Node,
    items: &[SourceItem],
    folders: &[FolderItem],
) -> Result<Value, EmitError> {
    let view = ProjectView {
        tools_version: &workspace.ide.tools_version,
        id: &node.id,
        name: &node.name,
        globals: &workspace.ide.globals,
        rows: node.rows.iter().map(RowView::from).collect(),
        items,
        folders,
        solution: windows_path(&layout.absolute(&layout.solution_file)),
    };
    Ok(json!({ "project": serde_json::to_value(view)? }))
}

#[derive(Debug, Serialize)]
struct SolutionRow<'a> {
    label: &'a str,
    platform: &'a str,
    build: bool,
    deploy: bool,
}

#[derive(Debug, Serialize)]
struct SolutionProject<'a> {
    type_id: &'static str,
    name: &'a str,
    title: String,
    id: &'a Identifier,
    depends_on_build_all: bool,
    rows: Vec<SolutionRow<'a>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
struct SolutionConfiguration<'a> {
    label: &'a str,
    platform: &'a str,
}

#[derive(Debug, Serialize)]
struct Nesting<'a> {
    child: &'a Identifier,
    parent: &'a Identifier,
}

#[derive(Debug, Serialize)]
struct SolutionView<'a> {
    format_version: &'a str,
    display_version: &'a str,
    projects: Vec<SolutionProject<'a>>,
    build_all: Option<&'a Identifier>,
    configurations: Vec<SolutionConfiguration<'a>>,
    nested: Vec<Nesting<'a>>,
}

fn deploys(workspace: &Workspace, node: &Node, row: &ConfigurationProperty, entry: &MatrixEntry) -> bool {
    node.target_index()
        .and_then(|index| workspace.targets.get(index))
        .is_some_and(|target| {
            target.deploy.iter().any(|platform| {
                platform.eq_ignore_ascii_case(&row.ide_platform)
                    || platform.eq_ignore_ascii_case(&entry.key.platform)
            })
        })
}

fn solution_project<'a>(
    workspace: &Workspace,
    layout: &Layout,
    graph: &'a ProjectGraph,
    node: &'a Node,
) -> SolutionProject<'a> {
    let Some(project_file) = node.project_file.as_deref() else {
        return SolutionProject {
            type_id: FOLDER_TYPE,
            name: &node.name,
            title: node.name.clone(),
            id: &node.id,
            depends_on_build_all: false,
            rows: Vec::new(),
        };
    };
    let build_all = matches!(node.kind, NodeKind::Alias(AliasKind::BuildAll));
    let rows = node
        .rows
        .iter()
        .zip(&graph.matrix.entries)
        .map(|(row, entry)| SolutionRow {
            label: &row.label,
            platform: &row.ide_platform,
            build: build_all,
            deploy: deploys(workspace, node, row, entry),
        })
        .collect();
    SolutionProject {
        type_id: VC_PROJECT_TYPE,
        name: &node.name,
        title: windows_path(&layout.from_solution(project_file)),
        id: &node.id,
        depends_on_build_all: !build_all,
        rows,
    }
}

/// Context for the solution manifest.
///
/// # Errors
///
/// Returns [`EmitError::Context`] if the view cannot be serialised.
pub fn solution_context(
    workspace: &Workspace,
    layout: &Layout,
    graph: &ProjectGraph,
) -> Result<Value, EmitError> {
    let build_all = graph
        .projects()
        .find(|(_, node)| matches!(node.kind, NodeKind::Alias(AliasKind::BuildAll)))
        .map(|(_, node)| &node.id);
    let configurations = graph
        .matrix
        .entries
        .iter()
        .map(|entry| SolutionConfiguration {
            label: &entry.label,
            platform: &entry.ide_platform,
        })
        .unique()
        .collect();
    let nested = graph
        .iter()
        .filter_map(|(_, node)| {
            let parent = graph.get(node.parent?)?;
            Some(Nesting {
                child: &node.id,
                parent: &parent.id,
            })
        })
        .collect();
    let view = SolutionView {
        format_version: &workspace.ide.format_version,
        display_version: workspace
            .ide
            .display_version
            .as_deref()
            .unwrap_or(&workspace.ide.version),
        projects: graph
            .iter()
            .map(|(_, node)| solution_project(workspace, layout, graph, node))
            .collect(),
        build_all,
        configurations,
        nested,
    };
    Ok(json!({ "solution": serde_json::to_value(view)? }))
}
