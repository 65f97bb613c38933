//! Project graph construction.

use std::collections::HashMap;

use camino::Utf8PathBuf;
use tracing::debug;

use crate::ast::Workspace;
use crate::identify::identify_str;
use crate::model::{AliasKind, Layout, Node, NodeId, NodeKind, ProjectGraph};

use super::{GraphError, GraphOptions, build_matrix, qualify};

/// Make `name` safe for use as a project file name: every character outside
/// `[A-Za-z0-9-.]` becomes `_`.
#[must_use]
pub fn quote_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn project_node(layout: &Layout, name: String, kind: NodeKind) -> Result<Node, GraphError> {
    let project_file: Utf8PathBuf = layout.projects_dir.join(format!("{name}.vcxproj"));
    let id = identify_str(layout.absolute(&project_file).as_str())?;
    Ok(Node::project(id, name, kind, project_file))
}

fn aliases(options: &GraphOptions) -> impl Iterator<Item = AliasKind> {
    [
        Some(AliasKind::BuildAll),
        options.install_alias.then_some(AliasKind::InstallAll),
        options.project_view.then_some(AliasKind::ProjectView),
    ]
    .into_iter()
    .flatten()
}

/// Wire every node in `pending` under solution folders named by its filter,
/// creating each folder once.
fn collect_directories(
    graph: &mut ProjectGraph,
    pending: Vec<(NodeId, String)>,
) -> Result<(), GraphError> {
    let mut seen: HashMap<String, NodeId> = HashMap::new();
    for (node, filter) in pending {
        let segments: Vec<&str> = filter.split('/').filter(|s| !s.is_empty()).collect();
        let mut child = node;
        for depth in (1..=segments.len()).rev() {
            let Some(parts) = segments.get(..depth) else {
                break;
            };
            let prefix = parts.join("/");
            if let Some(existing) = seen.get(&prefix) {
                graph.set_parent(child, *existing);
                break;
            }
            let name = parts.last().copied().unwrap_or_default().to_owned();
            let directory = graph.add(Node::directory(identify_str(&prefix)?, name));
            debug!(folder = %prefix, "solution folder");
            graph.set_parent(child, directory);
            seen.insert(prefix, directory);
            child = directory;
        }
    }
    Ok(())
}

/// Build the project graph of `workspace`.
///
/// Phases run in order: build the configuration matrix, collect qualifying
/// targets, add alias projects, collect solution folders, then sort with the
/// default project first. Rows are left empty for the resolver.
///
/// # Errors
///
/// Returns [`GraphError`] when the matrix cannot be built, an identifier
/// cannot be derived, or the default project is not part of the solution.
pub fn build(
    workspace: &Workspace,
    layout: &Layout,
    options: &GraphOptions,
) -> Result<ProjectGraph, GraphError> {
    let matrix = build_matrix(workspace, options)?;
    let qualified = qualify(workspace, &matrix, options);
    let mut graph = ProjectGraph::new(matrix);

    let mut pending = Vec::new();
    for index in qualified {
        let Some(target) = workspace.targets.get(index) else {
            continue;
        };
        let node = project_node(layout, quote_name(&target.name), NodeKind::Target(index))?;
        let id = graph.add(node);
        if let Some(filter) = &target.filter {
            pending.push((id, filter.clone()));
        }
    }
    for alias in aliases(options) {
        graph.add(project_node(
            layout,
            alias.name().to_owned(),
            NodeKind::Alias(alias),
        )?);
    }
    collect_directories(&mut graph, pending)?;

    let first = options.default_project.as_deref().map(quote_name);
    if let Some(name) = &first
        && graph.find(name).is_none_or(|(_, node)| node.is_directory())
    {
        return Err(GraphError::UnknownDefaultProject { name: name.clone() });
    }
    graph.sort(first.as_deref());
    debug!(nodes = graph.len(), "project graph built");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "graph tests use expect for clearer failures")]

    use super::*;
    use camino::Utf8Path;
    use rstest::{fixture, rstest};

    const DOC: &str = "slnweave_version: 1.0.0
solution: { name: Demo, build_tool: waf }
ide: { name: vs2017, version: '15' }
specs:
  - name: all
    modules: { all: [game] }
platforms:
  - { name: win_x64, ide_platform: x64, ide_versions: ['15'], configurations: [{ name: debug }] }
environments:
  win_x64_debug: {}
targets:
  - { name: game, kind: program, filter: Code/Game, use: [core] }
  - { name: core, filter: Code/Framework/Core }
  - { name: unrelated, filter: Code/Other }
";

    #[fixture]
    fn workspace() -> Workspace {
        crate::manifest::from_str(DOC).expect("workspace")
    }

    fn layout(ws: &Workspace) -> Layout {
        Layout::new(
            ws,
            Utf8Path::new("/ws"),
            Utf8Path::new("slnweave.yml"),
            "Demo",
        )
    }

    #[rstest]
    #[case("core", "core")]
    #[case("Az Core::Tests", "Az_Core__Tests")]
    #[case("lib-1.2", "lib-1.2")]
    fn quotes_project_names(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(quote_name(name), expected);
    }

    #[rstest]
    fn builds_folders_aliases_and_qualified_targets(workspace: Workspace) {
        let options = GraphOptions {
            default_project: Some("game".into()),
            install_alias: true,
            ..GraphOptions::default()
        };
        let graph = build(&workspace, &layout(&workspace), &options).expect("graph");
        let names: Vec<_> = graph.iter().map(|(_, n)| n.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "game",
                "Code",
                "Core",
                "Framework",
                "Game",
                "_ALL_",
                "core",
                "install_all_projects"
            ]
        );

        let parent_name = |name: &str| {
            let (_, node) = graph.find(name).expect("node");
            node.parent
                .and_then(|id| graph.get(id))
                .map(|p| p.name.clone())
        };
        assert_eq!(parent_name("core").as_deref(), Some("Core"));
        assert_eq!(parent_name("Core").as_deref(), Some("Framework"));
        assert_eq!(parent_name("Game").as_deref(), Some("Code"));
        assert_eq!(parent_name("Code"), None);
        assert_eq!(parent_name("_ALL_"), None);
        assert!(graph.find("unrelated").is_none());

        let (_, game) = graph.find("game").expect("game");
        assert_eq!(
            game.project_file.as_deref(),
            Some(Utf8Path::new("Solutions/Demo.depproj/game.vcxproj"))
        );
        assert_eq!(
            game.id,
            identify_str("/ws/Solutions/Demo.depproj/game.vcxproj").expect("id")
        );
    }

    #[rstest]
    fn folders_are_shared_between_targets(workspace: Workspace) {
        let graph = build(&workspace, &layout(&workspace), &GraphOptions::default())
            .expect("graph");
        let folders = graph.iter().filter(|(_, n)| n.is_directory()).count();
        assert_eq!(folders, 4);
        assert_eq!(
            graph.iter().filter(|(_, n)| n.name == "Code").count(),
            1
        );
    }

    #[rstest]
    #[case("ghost")]
    #[case("Code")]
    fn unknown_default_projects_are_fatal(workspace: Workspace, #[case] name: &str) {
        let options = GraphOptions {
            default_project: Some(name.into()),
            ..GraphOptions::default()
        };
        let err = build(&workspace, &layout(&workspace), &options).expect_err("unknown");
        assert!(matches!(err, GraphError::UnknownDefaultProject { .. }));
    }
}
