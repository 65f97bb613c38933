//! Workspace document loading.
//!
//! The YAML is deserialised straight into [`Workspace`] so every string
//! field sees the scalar exactly as written. Only `true` and `false` are
//! booleans; YAML 1.1 spellings such as `y` or `on` stay strings, which keeps
//! them usable as target, define and flag-set names. Failures are reported as
//! `miette` diagnostics carrying the document name and location. A loaded
//! document is checked for a supported format version and for dangling
//! references before it is returned.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::ast::Workspace;

mod diagnostics;
mod hints;

pub use diagnostics::{DocumentName, DocumentSource, ManifestError, map_yaml_error};

/// Default document file name.
pub const DEFAULT_DOCUMENT: &str = "slnweave.yml";

/// Major format version this build understands.
const SUPPORTED_MAJOR: u64 = 1;

fn yaml_options() -> serde_saphyr::Options {
    serde_saphyr::Options {
        strict_booleans: true,
        ..serde_saphyr::Options::default()
    }
}

/// Deserialise any document fragment with the workspace parser options.
///
/// # Errors
///
/// Returns the parser error when the YAML or its shape is invalid.
pub fn from_yaml<T: DeserializeOwned>(yaml: &str) -> Result<T, serde_saphyr::Error> {
    serde_saphyr::from_str_with_options(yaml, yaml_options())
}

fn from_str_named(yaml: &str, name: &DocumentName) -> Result<Workspace> {
    let workspace: Workspace = from_yaml(yaml).map_err(|e| ManifestError::Parse {
        source: map_yaml_error(e, &DocumentSource::from(yaml), name),
    })?;
    validate(&workspace)?;
    debug!(
        document = %name,
        targets = workspace.targets.len(),
        specs = workspace.specs.len(),
        "loaded workspace document"
    );
    Ok(workspace)
}

/// Parse a workspace document from a string.
///
/// # Errors
///
/// Returns an error if the YAML or the schema is invalid, or if the document
/// fails validation.
pub fn from_str(yaml: &str) -> Result<Workspace> {
    from_str_named(yaml, &DocumentName::new(DEFAULT_DOCUMENT))
}

/// Load a workspace document from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to parse.
pub fn from_path(path: &Utf8Path) -> Result<Workspace> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read workspace document {path}"))?;
    from_str_named(&data, &DocumentName::new(path.as_str()))
}

fn is_xml_name(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn validate(workspace: &Workspace) -> Result<(), ManifestError> {
    if workspace.slnweave_version.major != SUPPORTED_MAJOR {
        return Err(ManifestError::UnsupportedVersion {
            version: workspace.slnweave_version.clone(),
        });
    }

    if let Some(key) = workspace.ide.globals.keys().find(|key| !is_xml_name(key)) {
        return Err(ManifestError::InvalidGlobal { key: key.clone() });
    }

    let mut labels: HashMap<&str, &str> = HashMap::new();
    for spec in &workspace.specs {
        if let Some(first) = labels.insert(spec.display(), &spec.name) {
            return Err(ManifestError::DuplicateSpecLabel {
                label: spec.display().to_owned(),
                first: first.to_owned(),
                second: spec.name.clone(),
            });
        }
    }

    let mut names = HashSet::new();
    for target in &workspace.targets {
        if !names.insert(target.name.as_str()) {
            return Err(ManifestError::DuplicateTarget {
                name: target.name.clone(),
            });
        }
    }

    for target in &workspace.targets {
        if let Some(tested) = &target.unit_test_target
            && !names.contains(tested.as_str())
        {
            return Err(ManifestError::UnknownReference {
                kind: "target",
                name: tested.clone(),
                owner: target.name.clone(),
            });
        }
    }

    for project in &workspace.enabled_game_projects {
        if !workspace.game_projects.contains_key(project) {
            return Err(ManifestError::UnknownReference {
                kind: "game project",
                name: project.clone(),
                owner: "enabled_game_projects".to_owned(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow, ensure};
    use rstest::rstest;

    const HEADER: &str = "solution: { name: Demo, build_tool: waf }\n\
                          ide: { name: vs2017, version: '15' }\n";

    fn manifest_error(yaml: &str) -> Result<ManifestError> {
        let err = from_str(yaml)
            .err()
            .ok_or_else(|| anyhow!("document should be rejected"))?;
        err.downcast::<ManifestError>()
            .map_err(|other| anyhow!("unexpected error: {other}"))
    }

    #[test]
    fn loads_minimal_document() -> Result<()> {
        let ws = from_str(&format!("slnweave_version: 1.2.0\n{HEADER}"))?;
        ensure!(ws.targets.is_empty());
        ensure!(ws.solution.name == "Demo");
        Ok(())
    }

    #[test]
    fn rejects_other_major_versions() -> Result<()> {
        let err = manifest_error(&format!("slnweave_version: 2.0.0\n{HEADER}"))?;
        ensure!(matches!(err, ManifestError::UnsupportedVersion { .. }), "{err}");
        Ok(())
    }

    #[rstest]
    #[case("targets:\n  - name: a\n  - name: a\n", "declared more than once")]
    #[case(
        "targets:\n  - name: a\n    unit_test_target: ghost\n",
        "`ghost` referenced by `a`"
    )]
    #[case("enabled_game_projects: [Demo]\n", "game project `Demo`")]
    #[case(
        "specs:\n  - { name: all, display_name: Game }\n  - { name: game }\n  - { name: Game }\n",
        "specs `all` and `Game` share the display name `Game`"
    )]
    fn rejects_inconsistent_documents(#[case] body: &str, #[case] fragment: &str) -> Result<()> {
        let err = manifest_error(&format!("slnweave_version: 1.0.0\n{HEADER}{body}"))?;
        ensure!(err.to_string().contains(fragment), "unexpected message: {err}");
        Ok(())
    }

    #[rstest]
    #[case("Keyword", true)]
    #[case("_Vc.Tools-Dir", true)]
    #[case("", false)]
    #[case("1st", false)]
    #[case("a b", false)]
    #[case("x></x><y", false)]
    fn global_keys_must_be_element_names(#[case] key: &str, #[case] valid: bool) {
        assert_eq!(is_xml_name(key), valid);
    }

    #[test]
    fn rejects_globals_that_break_the_markup() -> Result<()> {
        let err = manifest_error(
            "slnweave_version: 1.0.0\nsolution: { name: Demo, build_tool: waf }\n\
             ide: { name: vs2017, version: '15', globals: { 'a b': x } }\n",
        )?;
        ensure!(
            matches!(err, ManifestError::InvalidGlobal { ref key } if key == "a b"),
            "{err}"
        );
        Ok(())
    }

    #[test]
    fn yaml_one_one_spellings_stay_names() -> Result<()> {
        let ws = from_str(&format!(
            "slnweave_version: 1.0.0\n{HEADER}targets:\n\
             \x20 - {{ name: y, use: on, defines: 1 }}\n\
             \x20 - {{ name: on, defines: [n, 2, off], uselib: no }}\n"
        ))?;
        let names: Vec<_> = ws.targets.iter().map(|t| t.name.as_str()).collect();
        ensure!(names == ["y", "on"], "unexpected names {names:?}");
        let first = ws.targets.first().ok_or_else(|| anyhow!("no targets"))?;
        ensure!(first.uses.iter().eq(["on"]), "use: {:?}", first.uses);
        ensure!(first.defines.iter().eq(["1"]), "defines: {:?}", first.defines);
        let second = ws.targets.get(1).ok_or_else(|| anyhow!("one target"))?;
        ensure!(second.defines.iter().eq(["n", "2", "off"]), "{:?}", second.defines);
        ensure!(second.uselib.iter().eq(["no"]), "uselib: {:?}", second.uselib);
        Ok(())
    }

    #[test]
    fn unquoted_numeric_versions_are_strings() -> Result<()> {
        let ws = from_str(
            "slnweave_version: 1.0.0\nsolution: { name: Demo, build_tool: waf }\n\
             ide: { name: vs2017, version: 15 }\n",
        )?;
        ensure!(ws.ide.version == "15", "version: {}", ws.ide.version);
        Ok(())
    }

    #[test]
    fn schema_errors_are_parse_diagnostics() -> Result<()> {
        let err = manifest_error(&format!("slnweave_version: 1.0.0\n{HEADER}bogus: 1\n"))?;
        ensure!(matches!(err, ManifestError::Parse { .. }), "{err}");
        Ok(())
    }
}
