//! Decides which targets get a project.
//!
//! A target qualifies directly when some enabled matrix entry supports it,
//! lists it as a spec member and has an environment, or when an enabled game
//! project names it for a kept platform. A second pass admits targets used
//! by a direct qualifier and unit-test companions of direct qualifiers.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use tracing::debug;

use crate::ast::{Platform, Spec, TargetDecl, Workspace};
use crate::model::{Matrix, MatrixEntry};

use super::{GraphOptions, TargetIndex, uses_closure};

/// Spec scope key holding generic members.
const GENERIC_MODULES: &str = "all";

/// Members of `spec` for `platform` and `configuration`, merged from least
/// to most specific scope without duplicates.
#[must_use]
pub fn spec_modules(spec: &Spec, platform: &Platform, configuration: &str) -> IndexSet<String> {
    platform
        .specificity_scopes(configuration)
        .iter()
        .map(|scope| if scope.is_empty() { GENERIC_MODULES } else { scope })
        .filter_map(|scope| spec.modules.get(scope))
        .flatten()
        .cloned()
        .collect()
}

/// Spec members of one matrix entry and everything they use.
#[derive(Debug, Default)]
struct EntryMembers {
    modules: IndexSet<String>,
    used: HashSet<String>,
}

/// Per-entry spec membership, computed once per
/// (spec, platform, configuration).
#[derive(Debug)]
pub struct Membership<'a> {
    workspace: &'a Workspace,
    index: TargetIndex<'a>,
    cache: HashMap<(usize, usize, String), EntryMembers>,
}

impl<'a> Membership<'a> {
    /// Membership over the targets of `workspace`.
    #[must_use]
    pub fn new(workspace: &'a Workspace) -> Self {
        Self {
            workspace,
            index: TargetIndex::new(workspace),
            cache: HashMap::new(),
        }
    }

    fn members(&mut self, entry: &MatrixEntry) -> &EntryMembers {
        let key = (
            entry.spec_index,
            entry.platform_index,
            entry.key.configuration.clone(),
        );
        let workspace = self.workspace;
        let index = &self.index;
        self.cache.entry(key).or_insert_with(|| {
            let (Some(spec), Some(platform)) = (
                workspace.specs.get(entry.spec_index),
                workspace.platforms.get(entry.platform_index),
            ) else {
                return EntryMembers::default();
            };
            let modules = spec_modules(spec, platform, &entry.key.configuration);
            let used = uses_closure(index, modules.iter().map(String::as_str))
                .into_iter()
                .map(str::to_owned)
                .collect();
            EntryMembers { modules, used }
        })
    }

    /// Whether `target` is listed by the spec of `entry`.
    pub fn is_listed(&mut self, entry: &MatrixEntry, target: &str) -> bool {
        self.members(entry).modules.contains(target)
    }

    /// Whether `target`, or the target it tests, is a spec member of `entry`
    /// or used by one.
    pub fn covers(&mut self, entry: &MatrixEntry, target: &TargetDecl) -> bool {
        let members = self.members(entry);
        std::iter::once(target.name.as_str())
            .chain(target.unit_test_target.as_deref())
            .any(|name| members.modules.contains(name) || members.used.contains(name))
    }
}

/// Whether `target` builds for `platform`.
#[must_use]
pub fn supports_platform(target: &TargetDecl, platform: &Platform) -> bool {
    target.platforms.is_empty() || target.platforms.iter().any(|p| platform.answers_to(p))
}

/// Whether `target` builds `configuration`.
#[must_use]
pub fn supports_configuration(target: &TargetDecl, configuration: &str) -> bool {
    target.configurations.is_empty() || target.configurations.iter().any(|c| c == configuration)
}

fn qualifies_by_spec(
    workspace: &Workspace,
    matrix: &Matrix,
    membership: &mut Membership<'_>,
    target: &TargetDecl,
) -> bool {
    matrix.entries.iter().filter(|entry| entry.declared).any(|entry| {
        let Some(platform) = workspace.platforms.get(entry.platform_index) else {
            return false;
        };
        supports_platform(target, platform)
            && supports_configuration(target, &entry.key.configuration)
            && workspace
                .environments
                .contains_key(&entry.key.environment_key())
            && membership.is_listed(entry, &target.name)
    })
}

fn qualifies_by_game_project(
    workspace: &Workspace,
    matrix: &Matrix,
    enabled: &[String],
    target: &TargetDecl,
) -> bool {
    let platforms: IndexSet<usize> = matrix.entries.iter().map(|e| e.platform_index).collect();
    enabled
        .iter()
        .filter_map(|project| workspace.game_projects.get(project))
        .any(|by_prefix| {
            platforms
                .iter()
                .filter_map(|index| workspace.platforms.get(*index))
                .filter_map(|platform| by_prefix.get(platform.project_prefix()))
                .any(|members| members.contains(&target.name))
        })
}

/// Indices of the targets that receive a project, in document order.
///
/// Only targets with a `filter` are candidates.
#[must_use]
pub fn qualify(workspace: &Workspace, matrix: &Matrix, options: &GraphOptions) -> Vec<usize> {
    let index = TargetIndex::new(workspace);
    let mut membership = Membership::new(workspace);
    let enabled = options
        .enabled_game_projects
        .as_deref()
        .unwrap_or(&workspace.enabled_game_projects);

    let mut direct: HashSet<&str> = HashSet::new();
    let mut whitelist: HashSet<&str> = HashSet::new();
    let mut rejected = Vec::new();
    let mut qualified = Vec::new();

    for (position, target) in index.iter() {
        if target.filter.is_none() {
            continue;
        }
        let qualifies = qualifies_by_spec(workspace, matrix, &mut membership, target)
            || qualifies_by_game_project(workspace, matrix, enabled, target);
        if qualifies {
            debug!(target = %target.name, "qualifies directly");
            direct.insert(target.name.as_str());
            whitelist.extend(uses_closure(&index, [target.name.as_str()]));
            qualified.push(position);
        } else {
            rejected.push((position, target));
        }
    }

    for (position, target) in rejected {
        let used = whitelist.contains(target.name.as_str());
        let tests_direct = target
            .unit_test_target
            .as_deref()
            .is_some_and(|tested| direct.contains(tested));
        if used || tests_direct {
            debug!(target = %target.name, used, tests_direct, "qualifies indirectly");
            qualified.push(position);
        } else {
            debug!(target = %target.name, "does not qualify");
        }
    }
    qualified.sort_unstable();
    qualified
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "qualification tests use expect for clearer failures")]

    use super::*;
    use crate::graph::build_matrix;
    use rstest::rstest;

    fn workspace(extra: &str, targets: &str) -> Workspace {
        let yaml = format!(
            "slnweave_version: 1.0.0
solution: {{ name: Demo, build_tool: waf }}
ide: {{ name: vs2017, version: '15' }}
specs:
  - name: all
    modules: {{ all: [app], win_x64_profile: [tool] }}
platforms:
  - name: win_x64
    ide_platform: x64
    project_prefix: pc
    ide_versions: ['15']
    configurations: [{{ name: debug }}, {{ name: profile }}]
environments:
  win_x64_debug: {{}}
  win_x64_profile: {{}}
{extra}targets:
{targets}"
        );
        crate::manifest::from_str(&yaml).expect("workspace")
    }

    fn qualified_names(ws: &Workspace, options: &GraphOptions) -> Vec<String> {
        let matrix = build_matrix(ws, options).expect("matrix");
        qualify(ws, &matrix, options)
            .into_iter()
            .filter_map(|i| ws.targets.get(i).map(|t| t.name.clone()))
            .collect()
    }

    #[rstest]
    fn used_targets_qualify_in_second_pass() {
        let ws = workspace(
            "",
            "  - { name: app, filter: Code, use: lib }
  - { name: lib, filter: Code }
  - { name: other, filter: Code }
",
        );
        assert_eq!(qualified_names(&ws, &GraphOptions::default()), ["app", "lib"]);
    }

    #[rstest]
    fn scoped_members_and_unit_tests_qualify() {
        let ws = workspace(
            "",
            "  - { name: tool, filter: Tools }
  - { name: app, filter: Code }
  - { name: app_tests, filter: Code, unit_test_target: app }
  - { name: hidden }
",
        );
        assert_eq!(
            qualified_names(&ws, &GraphOptions::default()),
            ["tool", "app", "app_tests"]
        );
    }

    #[rstest]
    fn unsupported_platforms_do_not_qualify_directly() {
        let ws = workspace("", "  - { name: app, filter: Code, platforms: [linux] }\n");
        assert!(qualified_names(&ws, &GraphOptions::default()).is_empty());
    }

    #[rstest]
    fn game_projects_qualify_by_project_prefix() {
        let ws = workspace(
            "game_projects: { Sample: { pc: [game] } }\n",
            "  - { name: game, filter: Game }\n",
        );
        assert!(qualified_names(&ws, &GraphOptions::default()).is_empty());
        let options = GraphOptions {
            enabled_game_projects: Some(vec!["Sample".into()]),
            ..GraphOptions::default()
        };
        assert_eq!(qualified_names(&ws, &options), ["game"]);
    }

    #[rstest]
    fn membership_merges_scopes_and_follows_uses() {
        let ws = workspace(
            "",
            "  - { name: app, use: lib }\n  - { name: lib }\n  - { name: tool }\n",
        );
        let matrix = build_matrix(&ws, &GraphOptions::default()).expect("matrix");
        let mut membership = Membership::new(&ws);
        let debug = matrix
            .entries
            .iter()
            .find(|e| e.key.configuration == "debug")
            .expect("debug entry");
        let profile = matrix
            .entries
            .iter()
            .find(|e| e.key.configuration == "profile")
            .expect("profile entry");
        let lib = ws.targets.get(1).expect("lib");
        let tool = ws.targets.get(2).expect("tool");
        assert!(membership.covers(debug, lib));
        assert!(!membership.covers(debug, tool));
        assert!(membership.covers(profile, tool));
        assert!(!membership.is_listed(profile, "lib"));
    }
}
