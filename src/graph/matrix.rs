//! The {spec × platform × configuration} matrix of a solution.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::ast::{Platform, Spec, Workspace};
use crate::model::{BuildConfigurationKey, Matrix, MatrixEntry};

use super::{GraphError, GraphOptions};

fn enabled_specs<'a>(
    workspace: &'a Workspace,
    options: &GraphOptions,
) -> Result<Vec<(usize, &'a Spec)>, GraphError> {
    let find = |name: &str| {
        workspace
            .specs
            .iter()
            .position(|spec| spec.name == name)
            .ok_or_else(|| GraphError::UnknownSpec {
                name: name.to_owned(),
            })
    };
    let indices: Vec<usize> = if let Some(single) = &options.project_spec {
        vec![find(single.as_str())?]
    } else if options.specs.is_empty() {
        (0..workspace.specs.len()).collect()
    } else {
        let mut chosen = options
            .specs
            .iter()
            .map(|name| find(name.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        chosen.sort_unstable();
        chosen.dedup();
        chosen
    };
    let specs: Vec<_> = indices
        .into_iter()
        .filter_map(|index| workspace.specs.get(index).map(|spec| (index, spec)))
        .collect();
    if specs.is_empty() {
        return Err(GraphError::NoEnabledSpecs);
    }
    Ok(specs)
}

fn kept_platforms<'a>(
    workspace: &'a Workspace,
    specs: &[(usize, &Spec)],
) -> Result<Vec<(usize, &'a Platform)>, GraphError> {
    let restrict: Option<HashSet<&str>> = if specs.iter().any(|(_, s)| s.platforms.is_empty()) {
        None
    } else {
        Some(
            specs
                .iter()
                .flat_map(|(_, s)| s.platforms.iter().map(String::as_str))
                .collect(),
        )
    };
    let mut seen_ide_platforms = HashSet::new();
    let mut kept = Vec::new();
    for (index, platform) in workspace.platforms.iter().enumerate() {
        let Some(ide_platform) = platform.ide_platform.as_deref() else {
            continue;
        };
        if !platform.ide_versions.contains(&workspace.ide.version) {
            debug!(platform = %platform.name, "not loadable by this IDE version");
            continue;
        }
        if let Some(allowed) = &restrict
            && !platform.names().any(|name| allowed.contains(name))
        {
            debug!(platform = %platform.name, "not built by any enabled spec");
            continue;
        }
        if !seen_ide_platforms.insert(ide_platform) {
            debug!(platform = %platform.name, ide_platform, "IDE platform already taken");
            continue;
        }
        kept.push((index, platform));
    }
    if kept.is_empty() {
        return Err(GraphError::NoCompatiblePlatform {
            version: workspace.ide.version.clone(),
        });
    }
    Ok(kept)
}

/// Pick the toolset for `platform`: the first IDE toolset the platform also
/// declares, else the IDE default.
fn toolset_for(workspace: &Workspace, platform: &Platform) -> String {
    let ide = &workspace.ide.compat_toolsets;
    let default = ide.first().cloned().unwrap_or_default();
    if platform.compat_toolsets.is_empty() {
        return default;
    }
    ide.iter()
        .find(|toolset| platform.compat_toolsets.contains(toolset))
        .cloned()
        .unwrap_or_else(|| {
            warn!(
                platform = %platform.name,
                declared = ?platform.compat_toolsets,
                fallback = %default,
                "no toolset shared with the IDE, using its default"
            );
            default
        })
}

fn spec_wants(spec: &Spec, configuration: &str, is_test: bool) -> bool {
    let listed = spec.configurations.is_empty()
        || spec.configurations.iter().any(|c| c == configuration);
    listed && !(spec.exclude_test_configurations && is_test)
}

/// Build the configuration matrix for the enabled specs and the platforms
/// the IDE can load.
///
/// # Errors
///
/// Returns [`GraphError`] when a requested spec is unknown, no spec is
/// enabled, or no platform is compatible with the IDE.
pub fn build_matrix(workspace: &Workspace, options: &GraphOptions) -> Result<Matrix, GraphError> {
    let specs = enabled_specs(workspace, options)?;
    let platforms = kept_platforms(workspace, &specs)?;
    let toolsets: Vec<String> = platforms
        .iter()
        .map(|(_, platform)| toolset_for(workspace, platform))
        .collect();

    let configurations: BTreeSet<&str> = platforms
        .iter()
        .flat_map(|(_, p)| p.configurations.iter().map(|c| c.name.as_str()))
        .collect();
    let is_test = |configuration: &str| {
        configuration.ends_with("_test")
            || platforms.iter().any(|(_, p)| {
                p.configuration(configuration)
                    .is_some_and(|decl| decl.is_test())
            })
    };

    let mut by_label: BTreeMap<String, (usize, &Spec, &str)> = BTreeMap::new();
    for (spec_index, spec) in &specs {
        for &configuration in &configurations {
            if !spec_wants(spec, configuration, is_test(configuration)) {
                continue;
            }
            let label = format!("[{}] {configuration}", spec.display());
            by_label
                .entry(label)
                .or_insert((*spec_index, *spec, configuration));
        }
    }

    let mut entries = Vec::with_capacity(by_label.len() * platforms.len());
    for (label, (spec_index, spec, configuration)) in &by_label {
        for ((platform_index, platform), toolset) in platforms.iter().zip(&toolsets) {
            let decl = platform.configuration(configuration);
            entries.push(MatrixEntry {
                key: BuildConfigurationKey {
                    spec: spec.name.clone(),
                    spec_display: spec.display().to_owned(),
                    platform: platform.name.clone(),
                    configuration: (*configuration).to_owned(),
                },
                spec_index: *spec_index,
                platform_index: *platform_index,
                label: label.clone(),
                ide_platform: platform.ide_platform.clone().unwrap_or_default(),
                toolset: toolset.clone(),
                is_test: decl.map_or_else(|| is_test(*configuration), |d| d.is_test()),
                declared: decl.is_some(),
            });
        }
    }

    debug!(
        labels = by_label.len(),
        platforms = platforms.len(),
        "configuration matrix built"
    );
    Ok(Matrix {
        labels: by_label.into_keys().collect(),
        ide_platforms: platforms
            .iter()
            .filter_map(|(_, p)| p.ide_platform.clone())
            .collect(),
        entries,
    })
}
