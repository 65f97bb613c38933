//! Source listings of project nodes.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use walkdir::WalkDir;

use crate::ast::{TargetDecl, Workspace};
use crate::identify::{Identifier, identify};
use crate::model::{Layout, absolutise, windows_path};

use super::EmitError;

/// Filter name that places files at the top level of a project.
const ROOT_FILTER: &str = "root";

/// Filter value meaning "no filter".
const NO_FILTER: &str = ".";

/// Extensions of C and C++ translation units.
const COMPILE_EXTENSIONS: [&str; 5] = ["c", "cc", "cpp", "cxx", "c++"];

/// Patterns always hidden from the source-tree view.
const VIEW_EXCLUDES: [&str; 3] = ["**/.git/**", "**/*.sdf", "**/*.suo"];

/// One file listed by a project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SourceItem {
    /// Absolute path with Windows separators.
    pub path: String,
    /// Item element name, `ClCompile` or `ClInclude`.
    pub kind: &'static str,
    /// Backslash-separated filter, or `.` for none.
    pub filter: String,
}

impl SourceItem {
    fn new(path: &Utf8Path, filter: &str) -> Self {
        let compiles = path.extension().is_some_and(|ext| {
            COMPILE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        });
        Self {
            path: windows_path(path),
            kind: if compiles { "ClCompile" } else { "ClInclude" },
            filter: filter.replace('/', "\\"),
        }
    }
}

/// A filter folder of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderItem {
    /// Backslash-separated folder path.
    pub name: String,
    /// Folder identifier, prefixed with the owning project's identifier.
    pub id: Identifier,
}

fn sorted(mut items: Vec<SourceItem>) -> Vec<SourceItem> {
    items.sort();
    items.dedup_by(|a, b| a.path == b.path);
    items
}

/// Files declared by `target`, sorted by absolute path.
#[must_use]
pub fn target_sources(layout: &Layout, target: &TargetDecl) -> Vec<SourceItem> {
    let dir = absolutise(&layout.root, &target.path);
    let items = target
        .files
        .iter()
        .flat_map(|(filter, files)| {
            let filter = if filter == ROOT_FILTER { NO_FILTER } else { filter.as_str() };
            files
                .iter()
                .map(|file| SourceItem::new(&absolutise(&dir, file), filter))
                .collect::<Vec<_>>()
        })
        .collect();
    sorted(items)
}

/// Files listed by the build-all alias: the workspace document and a dummy
/// translation unit so the IDE accepts the project.
#[must_use]
pub fn build_all_sources(layout: &Layout) -> Vec<SourceItem> {
    sorted(vec![
        SourceItem::new(&layout.document, "Settings"),
        SourceItem::new(
            &layout.build_root().join("__compile_dummy__.cpp"),
            "DummyCompileNode",
        ),
    ])
}

fn exclusion_patterns(workspace: &Workspace, layout: &Layout) -> Result<Vec<Pattern>, EmitError> {
    let generated = [
        format!("{}/**", layout.build_dir),
        format!("{}/**", layout.solution_dir),
    ];
    VIEW_EXCLUDES
        .iter()
        .map(|p| (*p).to_owned())
        .chain(generated)
        .chain(workspace.solution.project_view_exclude.iter().cloned())
        .map(|pattern| {
            Pattern::new(&pattern).map_err(|source| EmitError::Pattern { pattern, source })
        })
        .collect()
}

/// Every file below the workspace root except excluded ones, filtered by
/// their directory.
///
/// # Errors
///
/// Returns [`EmitError`] when an exclusion pattern is invalid or the tree
/// cannot be walked.
pub fn project_view_sources(
    workspace: &Workspace,
    layout: &Layout,
) -> Result<Vec<SourceItem>, EmitError> {
    let patterns = exclusion_patterns(workspace, layout)?;
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::new()
    };
    let root = layout.root.as_std_path();
    let excluded = |relative: &str| patterns.iter().any(|p| p.matches_with(relative, options));

    let mut items = Vec::new();
    let walker = WalkDir::new(root).sort_by_file_name().into_iter();
    for entry in walker.filter_entry(|entry| {
        let Ok(relative) = entry.path().strip_prefix(root) else {
            return true;
        };
        let text = relative.to_string_lossy().replace('\\', "/");
        let pruned = excluded(&text) || (entry.file_type().is_dir() && excluded(&format!("{text}/")));
        text.is_empty() || !pruned
    }) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            continue;
        };
        let filter = path
            .strip_prefix(&layout.root)
            .ok()
            .and_then(Utf8Path::parent)
            .map(Utf8Path::as_str)
            .filter(|parent| !parent.is_empty())
            .unwrap_or(NO_FILTER)
            .to_owned();
        items.push(SourceItem::new(&path, &filter));
    }
    Ok(sorted(items))
}

/// Filter folders used by `items`: every backslash prefix of every filter.
///
/// # Errors
///
/// Returns [`EmitError::Identify`] when a folder identifier cannot be
/// derived.
pub fn folders(items: &[SourceItem], project: &Identifier) -> Result<Vec<FolderItem>, EmitError> {
    let mut names = BTreeSet::new();
    for item in items.iter().filter(|item| item.filter != NO_FILTER) {
        let mut prefix = String::new();
        for segment in item.filter.split('\\') {
            if !prefix.is_empty() {
                prefix.push('\\');
            }
            prefix.push_str(segment);
            names.insert(prefix.clone());
        }
    }
    let owner = project.hex_prefix(8);
    names
        .into_iter()
        .map(|name| {
            let id = identify(&serde_json::Value::String(name.clone()), Some(&owner))?;
            Ok(FolderItem { name, id })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "source listing tests use expect for clearer failures")]

    use super::*;
    use crate::identify::identify_str;
    use rstest::rstest;

    fn workspace(extra: &str) -> Workspace {
        crate::manifest::from_str(&format!(
            "slnweave_version: 1.0.0\nsolution: {{ name: Demo, build_tool: waf{extra} }}\n\
             ide: {{ name: vs2017, version: '15' }}\n\
             targets:\n  - name: core\n    path: Code/Core\n    files:\n      \
             root: [core.cpp]\n      Source/Util: [util.CC, util.h]\n      Include: [../inc/core.h]\n"
        ))
        .expect("workspace")
    }

    fn layout(ws: &Workspace, root: &str) -> Layout {
        Layout::new(ws, Utf8Path::new(root), Utf8Path::new("slnweave.yml"), "Demo")
    }

    #[rstest]
    fn target_files_are_classified_and_sorted() {
        let ws = workspace("");
        let core = ws.targets.first().expect("target");
        let items = target_sources(&layout(&ws, "/ws"), core);
        let listed: Vec<_> = items
            .iter()
            .map(|i| (i.path.as_str(), i.kind, i.filter.as_str()))
            .collect();
        assert_eq!(
            listed,
            [
                ("\\ws\\Code\\Core\\core.cpp", "ClCompile", "."),
                ("\\ws\\Code\\Core\\util.CC", "ClCompile", "Source\\Util"),
                ("\\ws\\Code\\Core\\util.h", "ClInclude", "Source\\Util"),
                ("\\ws\\Code\\inc\\core.h", "ClInclude", "Include"),
            ]
        );
    }

    #[rstest]
    fn folders_cover_every_prefix_with_owner_prefixed_ids() {
        let ws = workspace("");
        let core = ws.targets.first().expect("target");
        let items = target_sources(&layout(&ws, "/ws"), core);
        let owner = identify_str("/ws/core.vcxproj").expect("id");
        let found = folders(&items, &owner).expect("folders");
        let names: Vec<_> = found.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Include", "Source", "Source\\Util"]);
        for folder in &found {
            assert_eq!(folder.id.hex_prefix(8), owner.hex_prefix(8));
        }
    }

    #[rstest]
    fn build_all_lists_document_and_dummy_unit() {
        let ws = workspace("");
        let items = build_all_sources(&layout(&ws, "/ws"));
        let kinds: Vec<_> = items.iter().map(|i| (i.kind, i.filter.as_str())).collect();
        assert_eq!(
            kinds,
            [("ClCompile", "DummyCompileNode"), ("ClInclude", "Settings")]
        );
    }

    #[rstest]
    fn project_view_skips_excluded_trees() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|p| anyhow::anyhow!("non UTF-8 path {}", p.display()))?;
        for file in [
            "slnweave.yml",
            "Code/main.cpp",
            "Code/main.suo",
            ".git/config",
            "BinTemp/obj.o",
            "Solutions/Demo.sln",
            "Docs/readme.md",
        ] {
            let path = root.join(file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, "x")?;
        }
        let ws = workspace(", project_view_exclude: ['Docs/**']");
        let items = project_view_sources(&ws, &layout(&ws, root.as_str()))?;
        let filters: Vec<_> = items.iter().map(|i| i.filter.as_str()).collect();
        anyhow::ensure!(items.len() == 2, "unexpected listing: {items:?}");
        anyhow::ensure!(filters.contains(&"Code") && filters.contains(&"."));
        Ok(())
    }
}
