//! Resolves the per-configuration rows of every project node.
//!
//! For each real target and matrix entry the resolver decides whether the
//! row is eligible, then merges environment and target settings, follows
//! uses edges for exported includes and defines, probes dependency flag
//! sets, and fills in the artefact, command and debugger fields. Nothing
//! here aborts a run: a missing environment or an unresolvable flag set
//! degrades a single row.

mod merge;
mod row;
mod uselib;

use std::collections::{HashMap, HashSet};

use camino::Utf8Path;
use tracing::{debug, warn};

use crate::ast::{Environment, Platform, SettingKey, StringOrList, TargetDecl, Workspace};
use crate::graph::{Membership, TargetIndex, supports_configuration, supports_platform};
use crate::model::{
    AliasKind, ConfigurationProperty, Layout, MatrixEntry, NodeKind, PlaceholderReason,
    ProjectGraph, absolutise,
};

pub use merge::{MergePolicy, MergedList, scoped_values};
pub use row::{
    Artefact, CommandLines, Commands, DebugLaunch, artefact, debug_launch, output_name,
};
pub use uselib::{FlagSet, lookup, probe_scopes};

/// Feature marker selecting the generated Qt include directory.
const QT5_FEATURE: &str = "qt5";

/// Build-directory prefix rewritten to the configuration's directory.
const GENERATOR_DIR: &str = "project_generator";

/// Resolution choices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Duplicate handling for include directories.
    pub includes: MergePolicy,
    /// Duplicate handling for preprocessor defines.
    pub defines: MergePolicy,
    /// Ask the build tool for verbose output from IDE commands.
    pub verbose_build: bool,
}

/// Fills project rows, caching probe lists, flag sets and spec membership
/// for the lifetime of one run.
#[derive(Debug)]
pub struct Resolver<'a> {
    workspace: &'a Workspace,
    layout: &'a Layout,
    options: ResolveOptions,
    index: TargetIndex<'a>,
    membership: Membership<'a>,
    commands: Commands<'a>,
    probes: HashMap<(usize, String), Vec<String>>,
    flag_sets: HashMap<(String, String), Option<FlagSet>>,
}

fn flags(environment: &Environment, key: &str) -> String {
    environment
        .get(key)
        .map(StringOrList::joined)
        .unwrap_or_default()
}

fn values<'e>(environment: &'e Environment, key: &str) -> impl Iterator<Item = &'e str> {
    environment.get(key).into_iter().flat_map(StringOrList::iter)
}

fn absolute(dir: &Utf8Path, path: &str) -> String {
    absolutise(dir, path).into_string()
}

impl<'a> Resolver<'a> {
    /// A resolver for `workspace` laid out as `layout`.
    #[must_use]
    pub fn new(workspace: &'a Workspace, layout: &'a Layout, options: ResolveOptions) -> Self {
        Self {
            workspace,
            layout,
            options,
            index: TargetIndex::new(workspace),
            membership: Membership::new(workspace),
            commands: Commands {
                tool: &workspace.solution.build_tool,
                solution: layout.absolute(&layout.solution_file).into_string(),
                verbose: options.verbose_build,
            },
            probes: HashMap::new(),
            flag_sets: HashMap::new(),
        }
    }

    /// Fill the rows of every project node in `graph`, one per matrix entry.
    pub fn resolve(&mut self, graph: &mut ProjectGraph) {
        let entries = graph.matrix.entries.clone();
        let workspace = self.workspace;
        for node in graph.nodes_mut() {
            let rows: Vec<_> = match node.kind {
                NodeKind::Directory => continue,
                NodeKind::Alias(kind) => entries.iter().map(|e| self.alias_row(kind, e)).collect(),
                NodeKind::Target(index) => {
                    let Some(target) = workspace.targets.get(index) else {
                        continue;
                    };
                    entries
                        .iter()
                        .map(|e| self.target_row(&node.name, target, e))
                        .collect()
                }
            };
            let placeholders = rows.iter().filter(|r| !r.status.is_active()).count();
            debug!(project = %node.name, rows = rows.len(), placeholders, "rows resolved");
            node.rows = rows;
        }
    }

    fn projects_dir(&self) -> String {
        self.layout
            .absolute(&self.layout.projects_dir)
            .into_string()
    }

    /// Row of an alias project. Alias rows are always active and carry no
    /// flags.
    #[must_use]
    pub fn alias_row(&self, kind: AliasKind, entry: &MatrixEntry) -> ConfigurationProperty {
        let commands = self.commands.for_alias(kind, entry);
        ConfigurationProperty {
            output_dir: self.projects_dir(),
            bin_dir: self.projects_dir(),
            target_spec: entry.key.spec.clone(),
            target_config: entry.key.environment_key(),
            build_command: commands.build,
            clean_command: commands.clean,
            rebuild_command: commands.rebuild,
            ..ConfigurationProperty::for_entry(entry)
        }
    }

    fn eligibility(
        &mut self,
        target: &TargetDecl,
        entry: &MatrixEntry,
    ) -> Result<(&'a Platform, &'a Environment), PlaceholderReason> {
        let workspace = self.workspace;
        let platform = workspace
            .platforms
            .get(entry.platform_index)
            .filter(|platform| supports_platform(target, platform))
            .ok_or(PlaceholderReason::UnsupportedPlatform)?;
        if !entry.declared || !supports_configuration(target, &entry.key.configuration) {
            return Err(PlaceholderReason::UnsupportedConfiguration);
        }
        let key = entry.key.environment_key();
        let Some(environment) = workspace.environments.get(&key) else {
            warn!(
                target = %target.name,
                environment = %key,
                "no environment for configuration, writing a placeholder row"
            );
            return Err(PlaceholderReason::EnvironmentMissing);
        };
        if !self.membership.covers(entry, target) {
            return Err(PlaceholderReason::NotInSpec);
        }
        Ok((platform, environment))
    }

    /// Row of real target `target`, whose project is called `project`.
    pub fn target_row(
        &mut self,
        project: &str,
        target: &TargetDecl,
        entry: &MatrixEntry,
    ) -> ConfigurationProperty {
        let commands = self.commands.for_target(entry, Some(&target.name));
        let mut row = ConfigurationProperty {
            output_dir: self.projects_dir(),
            bin_dir: self.projects_dir(),
            build_command: commands.build,
            clean_command: commands.clean,
            rebuild_command: commands.rebuild,
            ..ConfigurationProperty::for_entry(entry)
        };
        let (platform, environment) = match self.eligibility(target, entry) {
            Ok(found) => found,
            Err(reason) => {
                row.make_placeholder(reason);
                return row;
            }
        };

        row.c_flags = flags(environment, "CFLAGS");
        row.cxx_flags = flags(environment, "CXXFLAGS");
        row.link_flags = flags(environment, "LINKFLAGS");
        row.target_spec = entry.key.spec.clone();
        row.target_config = entry.key.environment_key();

        let built = artefact(self.layout, environment, target, entry);
        let launch = debug_launch(self.workspace, self.layout, environment, target, entry, &built);
        let (includes, defines) = self.merged_lists(project, target, platform, entry, environment);
        row.includes = includes;
        row.defines = defines;
        row.debug_command = launch.command;
        row.debug_arguments = launch.arguments;
        row.debug_path = launch.path;
        row.external_tool = launch.external_tool;
        row.output_dir = built.output_dir;
        row.output_file = built.output_file;
        row.output_name = built.output_name;
        row.bin_dir = built.bin_dir;
        row
    }

    fn merged_lists(
        &mut self,
        project: &str,
        root: &TargetDecl,
        platform: &Platform,
        entry: &MatrixEntry,
        environment: &Environment,
    ) -> (Vec<String>, Vec<String>) {
        let configuration = entry.key.configuration.as_str();
        let root_dir = absolutise(&self.layout.root, &root.path);
        let mut includes = MergedList::new(self.options.includes);
        let mut defines = MergedList::new(self.options.defines);

        defines.extend(values(environment, "DEFINES"));
        defines.extend(scoped_values(root, platform, configuration, SettingKey::Defines));
        includes.extend(values(environment, "INCLUDES").map(|p| absolute(&root_dir, p)));
        includes.extend(
            scoped_values(root, platform, configuration, SettingKey::Includes)
                .into_iter()
                .map(|p| absolute(&root_dir, p)),
        );

        for visited in self.uses_walk(root, platform, configuration) {
            let dir = absolutise(&self.layout.root, &visited.path);
            includes.extend(visited.export_includes.iter().map(|p| absolute(&dir, p)));
            defines.extend(visited.export_defines.iter());
            for set in self.flag_sets(visited, platform, entry, environment) {
                includes.extend(set.includes);
                defines.extend(set.defines);
            }
        }

        let build_root = self.layout.build_root();
        let generator = build_root.join(GENERATOR_DIR);
        let variant_dir = build_root.join(entry.key.environment_key());
        includes.rewrite(|item| {
            item.strip_prefix(generator.as_str())
                .filter(|rest| rest.is_empty() || rest.starts_with('/'))
                .map(|rest| format!("{variant_dir}{rest}"))
        });
        if root.has_feature(QT5_FEATURE) {
            let uid = root.uid.as_deref().unwrap_or(&root.name);
            includes.push(
                variant_dir
                    .join(QT5_FEATURE)
                    .join(format!("{project}.{uid}"))
                    .into_string(),
            );
        }
        (includes.into_vec(), defines.into_vec())
    }

    /// `root` and every target reachable over its uses edges for this
    /// platform and configuration, in first-visit order.
    fn uses_walk<'t>(
        &self,
        root: &'t TargetDecl,
        platform: &Platform,
        configuration: &str,
    ) -> Vec<&'t TargetDecl>
    where
        'a: 't,
    {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut pending = vec![root];
        while let Some(target) = pending.pop() {
            if !visited.insert(target.name.as_str()) {
                continue;
            }
            order.push(target);
            let mut next: Vec<&'t TargetDecl> =
                scoped_values(target, platform, configuration, SettingKey::Uses)
                    .into_iter()
                    .filter(|name| !visited.contains(name))
                    .filter_map(|name| self.index.get(name))
                    .collect();
            next.reverse();
            pending.extend(next);
        }
        order
    }

    /// Flag sets named by `target` for `entry`, in probe order.
    fn flag_sets(
        &mut self,
        target: &TargetDecl,
        platform: &Platform,
        entry: &MatrixEntry,
        environment: &Environment,
    ) -> Vec<FlagSet> {
        let configuration = &entry.key.configuration;
        let scopes = self
            .probes
            .entry((entry.platform_index, configuration.clone()))
            .or_insert_with(|| probe_scopes(platform, configuration, entry.is_test))
            .clone();
        let environment_key = entry.key.environment_key();
        scopes
            .iter()
            .filter_map(|scope| target.setting(scope, SettingKey::Uselib))
            .flat_map(StringOrList::iter)
            .filter_map(|name| {
                self.flag_sets
                    .entry((environment_key.clone(), name.to_owned()))
                    .or_insert_with(|| lookup(environment, name))
                    .clone()
            })
            .collect()
    }
}

/// Fill every project row of `graph`.
pub fn resolve(
    workspace: &Workspace,
    layout: &Layout,
    options: ResolveOptions,
    graph: &mut ProjectGraph,
) {
    Resolver::new(workspace, layout, options).resolve(graph);
}
