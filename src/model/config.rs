//! Configuration matrix and per-configuration property rows.

use serde::Serialize;

/// Output name written into rows a target cannot build.
pub const UNSUPPORTED_OUTPUT: &str = "Unsupported_For_Configuration";

/// One build configuration: specification set, platform and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BuildConfigurationKey {
    /// Specification set name.
    pub spec: String,
    /// Specification set label shown by the IDE.
    pub spec_display: String,
    /// Build-system platform name.
    pub platform: String,
    /// Configuration name.
    pub configuration: String,
}

impl BuildConfigurationKey {
    /// IDE configuration label, `[Display] configuration`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("[{}] {}", self.spec_display, self.configuration)
    }

    /// Environment key, `<platform>_<configuration>`.
    #[must_use]
    pub fn environment_key(&self) -> String {
        format!("{}_{}", self.platform, self.configuration)
    }
}

/// A resolved matrix cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixEntry {
    /// The configuration this entry builds.
    pub key: BuildConfigurationKey,
    /// Index into the workspace specs.
    #[serde(skip)]
    pub spec_index: usize,
    /// Index into the workspace platform registry.
    #[serde(skip)]
    pub platform_index: usize,
    /// IDE configuration label.
    pub label: String,
    /// Platform name understood by the IDE.
    pub ide_platform: String,
    /// Platform toolset used by the IDE.
    pub toolset: String,
    /// Whether the configuration builds unit tests.
    pub is_test: bool,
    /// Whether the platform declares this configuration at all.
    pub declared: bool,
}

/// The solution-wide configuration matrix.
///
/// `entries` is ordered by label, then by platform, so every project lists
/// its rows in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matrix {
    /// Sorted configuration labels.
    pub labels: Vec<String>,
    /// IDE platform names in registry order.
    pub ide_platforms: Vec<String>,
    /// Every label and platform combination.
    pub entries: Vec<MatrixEntry>,
}

/// Why a row carries no build information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderReason {
    /// The target does not support the platform.
    UnsupportedPlatform,
    /// The target or the platform does not support the configuration.
    UnsupportedConfiguration,
    /// The target is not a member of the spec for this entry.
    NotInSpec,
    /// No environment exists for the platform and configuration.
    EnvironmentMissing,
}

/// Whether a row builds anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum RowStatus {
    /// The row carries full build information.
    #[default]
    Active,
    /// The row exists only so the IDE can load the project.
    Placeholder(PlaceholderReason),
}

impl RowStatus {
    /// Whether the row is [`RowStatus::Active`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Per-configuration properties of a project node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigurationProperty {
    /// IDE configuration label.
    pub label: String,
    /// IDE platform name.
    pub ide_platform: String,
    /// Platform toolset.
    pub toolset: String,
    /// Row state.
    pub status: RowStatus,
    /// Directory holding the output artefact.
    pub output_dir: String,
    /// Binary directory of the configuration.
    pub bin_dir: String,
    /// Full path of the output artefact.
    pub output_file: String,
    /// Output artefact base name.
    pub output_name: String,
    /// C compiler flags.
    pub c_flags: String,
    /// C++ compiler flags.
    pub cxx_flags: String,
    /// Linker flags.
    pub link_flags: String,
    /// Merged include directories.
    pub includes: Vec<String>,
    /// Merged preprocessor defines.
    pub defines: Vec<String>,
    /// IDE build command.
    pub build_command: String,
    /// IDE clean command.
    pub clean_command: String,
    /// IDE rebuild command.
    pub rebuild_command: String,
    /// Debugger command.
    pub debug_command: String,
    /// Debugger arguments.
    pub debug_arguments: String,
    /// Program the debugger starts.
    pub debug_path: String,
    /// Whether the debugger starts an external tool launcher.
    pub external_tool: bool,
    /// Spec name passed to the build tool.
    pub target_spec: String,
    /// `<platform>_<configuration>` passed to the build tool.
    pub target_config: String,
}

impl ConfigurationProperty {
    /// A row for `entry` with nothing but its identity filled in.
    #[must_use]
    pub fn for_entry(entry: &MatrixEntry) -> Self {
        Self {
            label: entry.label.clone(),
            ide_platform: entry.ide_platform.clone(),
            toolset: entry.toolset.clone(),
            ..Self::default()
        }
    }

    /// Turn this row into a placeholder, clearing build information but
    /// keeping its identity and commands.
    pub fn make_placeholder(&mut self, reason: PlaceholderReason) {
        self.status = RowStatus::Placeholder(reason);
        UNSUPPORTED_OUTPUT.clone_into(&mut self.output_file);
        UNSUPPORTED_OUTPUT.clone_into(&mut self.output_name);
        self.c_flags.clear();
        self.cxx_flags.clear();
        self.link_flags.clear();
        self.includes.clear();
        self.defines.clear();
        self.target_spec.clear();
        self.debug_command.clear();
        self.debug_arguments.clear();
        self.debug_path.clear();
        self.external_tool = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn key() -> BuildConfigurationKey {
        BuildConfigurationKey {
            spec: "all".into(),
            spec_display: "All".into(),
            platform: "win_x64".into(),
            configuration: "debug".into(),
        }
    }

    #[rstest]
    fn key_labels() {
        assert_eq!(key().label(), "[All] debug");
        assert_eq!(key().environment_key(), "win_x64_debug");
    }

    #[rstest]
    fn placeholders_keep_identity_and_commands() {
        let mut row = ConfigurationProperty {
            label: "[All] debug".into(),
            build_command: "waf build".into(),
            defines: vec!["A".into()],
            includes: vec!["/inc".into()],
            external_tool: true,
            ..ConfigurationProperty::default()
        };
        row.make_placeholder(PlaceholderReason::EnvironmentMissing);
        assert_eq!(
            row.status,
            RowStatus::Placeholder(PlaceholderReason::EnvironmentMissing)
        );
        assert_eq!(row.output_name, UNSUPPORTED_OUTPUT);
        assert!(row.defines.is_empty() && row.includes.is_empty());
        assert!(!row.external_tool);
        assert_eq!(row.label, "[All] debug");
        assert_eq!(row.build_command, "waf build");
    }
}
