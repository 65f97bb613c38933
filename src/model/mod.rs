//! Display and project nodes.
//!
//! A run builds one [`ProjectGraph`]: an arena of [`Node`]s addressed by
//! [`NodeId`]. Parents are stored as ids, so the display tree needs no shared
//! ownership. Nodes are created by the graph builder, their rows are filled
//! by the resolver, and the emitter only reads them.

mod config;
mod layout;

pub use config::{
    BuildConfigurationKey, ConfigurationProperty, Matrix, MatrixEntry, PlaceholderReason,
    RowStatus, UNSUPPORTED_OUTPUT,
};
pub use layout::{Layout, absolutise, windows_path};

use camino::{Utf8Path, Utf8PathBuf};

use crate::identify::Identifier;

/// Index of a node in its [`ProjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Synthetic targets not bound to a build artefact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasKind {
    /// Builds every target; always present.
    BuildAll,
    /// Builds and installs every target.
    InstallAll,
    /// Lists the whole source tree.
    ProjectView,
}

impl AliasKind {
    /// Project name of the alias.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BuildAll => "_ALL_",
            Self::InstallAll => "install_all_projects",
            Self::ProjectView => "project_view",
        }
    }
}

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A solution folder.
    Directory,
    /// A synthetic target.
    Alias(AliasKind),
    /// A workspace target, by index into the workspace target list.
    Target(usize),
}

/// A node of the display tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Stable identifier.
    pub id: Identifier,
    /// Display name.
    pub name: String,
    /// Node variant.
    pub kind: NodeKind,
    /// Owning directory, `None` at the solution root.
    pub parent: Option<NodeId>,
    /// Project descriptor path relative to the workspace root. Directories
    /// have none.
    pub project_file: Option<Utf8PathBuf>,
    /// One row per matrix entry.
    pub rows: Vec<ConfigurationProperty>,
}

impl Node {
    /// A solution folder node.
    #[must_use]
    pub const fn directory(id: Identifier, name: String) -> Self {
        Self {
            id,
            name,
            kind: NodeKind::Directory,
            parent: None,
            project_file: None,
            rows: Vec::new(),
        }
    }

    /// A project node of the given kind.
    #[must_use]
    pub const fn project(
        id: Identifier,
        name: String,
        kind: NodeKind,
        project_file: Utf8PathBuf,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            parent: None,
            project_file: Some(project_file),
            rows: Vec::new(),
        }
    }

    /// Workspace target index for real targets.
    #[must_use]
    pub const fn target_index(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Target(index) => Some(index),
            _ => None,
        }
    }

    /// Whether the node is a solution folder.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    /// Key used for emission order: the project path if any, else the name.
    #[must_use]
    pub fn sort_key(&self) -> &str {
        self.project_file
            .as_deref()
            .map_or(self.name.as_str(), Utf8Path::as_str)
    }
}

/// Arena of nodes plus the configuration matrix they were built against.
#[derive(Debug, Clone, Default)]
pub struct ProjectGraph {
    nodes: Vec<Node>,
    order: Vec<NodeId>,
    /// Configuration matrix shared by every project node.
    pub matrix: Matrix,
}

impl ProjectGraph {
    /// An empty graph over `matrix`.
    #[must_use]
    pub const fn new(matrix: Matrix) -> Self {
        Self {
            nodes: Vec::new(),
            order: Vec::new(),
            matrix,
        }
    }

    /// Add a node, returning its id. Insertion order is the initial
    /// emission order.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.order.push(id);
        id
    }

    /// Look up a node.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Look up a node mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Set the parent of `child`.
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id.0).map(|node| (*id, node)))
    }

    /// Project nodes (aliases and targets) in emission order.
    pub fn projects(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.iter().filter(|(_, node)| !node.is_directory())
    }

    /// Mutable access to every node in arena order.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    /// Find the first node with `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<(NodeId, &Node)> {
        self.iter().find(|(_, node)| node.name == name)
    }

    /// Reorder emission: `first` (if any) leads, the rest sort by
    /// [`Node::sort_key`].
    pub fn sort(&mut self, first: Option<&str>) {
        let nodes = &self.nodes;
        self.order.sort_by(|a, b| {
            let (Some(left), Some(right)) = (nodes.get(a.0), nodes.get(b.0)) else {
                return a.cmp(b);
            };
            let left_first = first.is_some_and(|name| left.name == name);
            let right_first = first.is_some_and(|name| right.name == name);
            right_first
                .cmp(&left_first)
                .then_with(|| left.sort_key().cmp(right.sort_key()))
                .then_with(|| a.cmp(b))
        });
    }
}
