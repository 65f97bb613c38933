//! Workspace document structures.
//!
//! These types mirror the YAML schema of `slnweave.yml`: the solution and
//! IDE settings, the specification sets, the platform registry, the build
//! environments and the target graph. They are deserialised directly by
//! `serde_saphyr`.
//!
//! ```rust
//! use slnweave::ast::Workspace;
//!
//! let yaml = "slnweave_version: \"1.0.0\"\n\
//!             solution: { name: Demo, build_tool: waf }\n\
//!             ide: { name: vs2017, version: \"15\" }\n\
//!             targets:\n  - name: core\n    filter: Code/Core\n";
//! let workspace: Workspace = slnweave::manifest::from_yaml(yaml).expect("schema");
//! assert_eq!(workspace.targets[0].name, "core");
//! ```

use std::fmt;

use indexmap::IndexMap;
use semver::Version;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

/// Build environment table for one `<platform>_<configuration>` pair.
pub type Environment = IndexMap<String, StringOrList>;

/// Top-level workspace document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Workspace {
    /// Semantic version of the document format.
    pub slnweave_version: Version,

    /// Solution naming, layout and build tool settings.
    pub solution: SolutionSettings,

    /// The IDE the files are generated for.
    pub ide: IdeSettings,

    /// Specification sets, each selecting a subset of targets.
    #[serde(default)]
    pub specs: Vec<Spec>,

    /// Platform registry.
    #[serde(default)]
    pub platforms: Vec<Platform>,

    /// Flag tables keyed by `<platform>_<configuration>`.
    #[serde(default)]
    pub environments: IndexMap<String, Environment>,

    /// Game project membership: project name, then platform project prefix,
    /// then target names.
    #[serde(default)]
    pub game_projects: IndexMap<String, IndexMap<String, Vec<String>>>,

    /// Game projects enabled when the command line does not choose.
    #[serde(default)]
    pub enabled_game_projects: Vec<String>,

    /// The build-target graph.
    #[serde(default)]
    pub targets: Vec<TargetDecl>,
}

fn default_solution_directory() -> String {
    "Solutions".into()
}

fn default_build_dir() -> String {
    "BinTemp".into()
}

fn default_test_runner() -> String {
    "AzTestRunner".into()
}

fn default_test_runner_args() -> String {
    "AzRunUnitTests --pause-on-completion --gtest_break_on_failure".into()
}

/// Solution-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SolutionSettings {
    /// Solution base name, without extension.
    pub name: String,
    /// Directory holding the solution file, relative to the workspace root.
    #[serde(default = "default_solution_directory")]
    pub directory: String,
    /// Directory holding project files. Defaults to
    /// `<directory>/<solution file stem>.depproj`.
    #[serde(default)]
    pub projects_dir: Option<String>,
    /// Command invoked by IDE build, clean and rebuild actions.
    pub build_tool: String,
    /// Intermediate build directory, relative to the workspace root.
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
    /// Engine root when building against an external engine checkout.
    #[serde(default)]
    pub engine_root: Option<String>,
    /// Executable that hosts unit-test libraries.
    #[serde(default = "default_test_runner")]
    pub test_runner: String,
    /// Arguments appended after the test library path.
    #[serde(default = "default_test_runner_args")]
    pub test_runner_args: String,
    /// Extra glob patterns hidden from the project view.
    #[serde(default)]
    pub project_view_exclude: Vec<String>,
}

fn default_format_version() -> String {
    "12.00".into()
}

fn default_tools_version() -> String {
    "4.0".into()
}

/// IDE identity and compatibility metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdeSettings {
    /// Short name used in solution file names, such as `vs2017`.
    pub name: String,
    /// Version matched against [`Platform::ide_versions`].
    pub version: String,
    /// Solution file format version.
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// Version written in the solution header comment. Defaults to
    /// [`IdeSettings::version`].
    #[serde(default)]
    pub display_version: Option<String>,
    /// MSBuild tools version written into project descriptors.
    #[serde(default = "default_tools_version")]
    pub tools_version: String,
    /// Toolsets the IDE understands; the first is the default.
    #[serde(default)]
    pub compat_toolsets: Vec<String>,
    /// Extra global properties written into every project descriptor.
    #[serde(default)]
    pub globals: IndexMap<String, String>,
}

/// A named specification set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Spec {
    /// Identifier used on the command line.
    pub name: String,
    /// Label shown in IDE configuration names. Defaults to the name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Platforms (or platform aliases) the spec builds. Empty means all.
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Configurations the spec builds. Empty means all.
    #[serde(default)]
    pub configurations: Vec<String>,
    /// Drop test configurations from this spec.
    #[serde(default)]
    pub exclude_test_configurations: bool,
    /// Member targets keyed by scope: `all`, a configuration, a platform or
    /// alias, or `<platform>_<configuration>`.
    #[serde(default)]
    pub modules: IndexMap<String, Vec<String>>,
}

impl Spec {
    /// Label shown in IDE configuration names.
    #[must_use]
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// A platform registry entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Platform {
    /// Build-system platform name, such as `win_x64_vs2017`.
    pub name: String,
    /// Platform name used by the IDE, such as `x64`.
    #[serde(default)]
    pub ide_platform: Option<String>,
    /// Alternative names accepted in scoped settings and spec filters.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Key into [`Workspace::game_projects`]. Defaults to the name.
    #[serde(default)]
    pub project_prefix: Option<String>,
    /// IDE versions able to load this platform.
    #[serde(default)]
    pub ide_versions: Vec<String>,
    /// Toolsets this platform can build with.
    #[serde(default)]
    pub compat_toolsets: Vec<String>,
    /// Configurations available on this platform.
    #[serde(default)]
    pub configurations: Vec<ConfigurationDecl>,
}

impl Platform {
    /// The name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Whether `name` is this platform's name or one of its aliases.
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    /// Key into [`Workspace::game_projects`].
    #[must_use]
    pub fn project_prefix(&self) -> &str {
        self.project_prefix.as_deref().unwrap_or(&self.name)
    }

    /// The declared configuration called `name`.
    #[must_use]
    pub fn configuration(&self, name: &str) -> Option<&ConfigurationDecl> {
        self.configurations.iter().find(|c| c.name == name)
    }

    /// Setting scopes from least to most specific: generic (the empty
    /// string), the configuration, every platform name, then every
    /// `<platform name>_<configuration>`.
    #[must_use]
    pub fn specificity_scopes(&self, configuration: &str) -> Vec<String> {
        let mut scopes = vec![String::new(), configuration.to_owned()];
        scopes.extend(self.names().map(str::to_owned));
        scopes.extend(self.names().map(|name| format!("{name}_{configuration}")));
        scopes
    }
}

/// A configuration offered by a platform.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationDecl {
    /// Configuration name, such as `debug` or `profile_test`.
    pub name: String,
    /// Marks a unit-test configuration. Names ending in `_test` are test
    /// configurations regardless.
    #[serde(default)]
    pub test: bool,
}

impl ConfigurationDecl {
    /// Whether this configuration builds unit tests.
    #[must_use]
    pub fn is_test(&self) -> bool {
        self.test || self.name.ends_with("_test")
    }
}

/// Kind of artefact a target links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// An executable.
    Program,
    /// A dynamic library.
    SharedLibrary,
    /// A static library.
    #[default]
    StaticLibrary,
    /// Object files without a link step.
    Objects,
}

impl TargetKind {
    /// Environment key holding the artefact naming pattern.
    #[must_use]
    pub const fn pattern_key(self) -> Option<&'static str> {
        match self {
            Self::Program => Some("cxxprogram_PATTERN"),
            Self::SharedLibrary => Some("cxxshlib_PATTERN"),
            Self::StaticLibrary => Some("cxxstlib_PATTERN"),
            Self::Objects => None,
        }
    }
}

/// Setting categories that can be scoped by specificity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Preprocessor defines.
    Defines,
    /// Include directories.
    Includes,
    /// Dependency flag-set names.
    Uselib,
    /// Names of targets this target uses.
    Uses,
}

/// Settings that may appear at every specificity level.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Preprocessor defines.
    #[serde(default)]
    pub defines: StringOrList,
    /// Include directories, relative to the target directory.
    #[serde(default)]
    pub includes: StringOrList,
    /// Dependency flag-set names.
    #[serde(default)]
    pub uselib: StringOrList,
    /// Names of targets this target uses.
    #[serde(default, rename = "use")]
    pub uses: StringOrList,
}

impl Settings {
    /// The list stored under `key`.
    #[must_use]
    pub const fn get(&self, key: SettingKey) -> &StringOrList {
        match key {
            SettingKey::Defines => &self.defines,
            SettingKey::Includes => &self.includes,
            SettingKey::Uselib => &self.uselib,
            SettingKey::Uses => &self.uses,
        }
    }
}

/// A build target declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDecl {
    /// Unique target name.
    pub name: String,
    /// Artefact kind.
    #[serde(default)]
    pub kind: TargetKind,
    /// Target directory, relative to the workspace root.
    #[serde(default = "default_target_path")]
    pub path: String,
    /// Slash-separated display path. Targets without one get no project.
    #[serde(default)]
    pub filter: Option<String>,
    /// Source files keyed by IDE filter, relative to the target directory.
    /// The filter `root` places files at the top level.
    #[serde(default)]
    pub files: IndexMap<String, Vec<String>>,
    /// Supported platforms or aliases. Empty means all.
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Supported configurations. Empty means all.
    #[serde(default)]
    pub configurations: Vec<String>,
    /// Generic preprocessor defines.
    #[serde(default)]
    pub defines: StringOrList,
    /// Generic include directories.
    #[serde(default)]
    pub includes: StringOrList,
    /// Generic dependency flag-set names.
    #[serde(default)]
    pub uselib: StringOrList,
    /// Generic uses edges.
    #[serde(default, rename = "use")]
    pub uses: StringOrList,
    /// Settings keyed by scope: a configuration, a platform or alias, or
    /// `<platform>_<configuration>`, or a test scope such as `test_all`.
    #[serde(default)]
    pub scoped: IndexMap<String, Settings>,
    /// Include directories propagated to users of this target.
    #[serde(default)]
    pub export_includes: StringOrList,
    /// Defines propagated to users of this target.
    #[serde(default)]
    pub export_defines: StringOrList,
    /// Target this one provides unit tests for.
    #[serde(default)]
    pub unit_test_target: Option<String>,
    /// Output base name. Defaults to the target name.
    #[serde(default)]
    pub output_file_name: Option<String>,
    /// Output base name for `debug*` configurations.
    #[serde(default)]
    pub debug_output_file_name: Option<String>,
    /// Output base name for every other configuration.
    #[serde(default)]
    pub ndebug_output_file_name: Option<String>,
    /// Output folder overrides keyed by `<platform>`, `<platform>_debug`,
    /// `<platform>_ndebug` or `<platform>_<configuration>`.
    #[serde(default)]
    pub output_folders: IndexMap<String, String>,
    /// Sub-folder appended to the output folder.
    #[serde(default)]
    pub output_sub_folder: Option<String>,
    /// Launcher program used to debug this target inside an external engine.
    #[serde(default)]
    pub tool_launcher_target: Option<String>,
    /// Platforms on which the IDE deploys this target.
    #[serde(default)]
    pub deploy: Vec<String>,
    /// Feature markers such as `qt5`.
    #[serde(default)]
    pub features: Vec<String>,
    /// Unique suffix for generated directories. Defaults to the name.
    #[serde(default)]
    pub uid: Option<String>,
}

fn default_target_path() -> String {
    ".".into()
}

impl TargetDecl {
    /// The list stored under `key` at `scope`; the empty scope is generic.
    #[must_use]
    pub fn setting(&self, scope: &str, key: SettingKey) -> Option<&StringOrList> {
        if scope.is_empty() {
            return Some(match key {
                SettingKey::Defines => &self.defines,
                SettingKey::Includes => &self.includes,
                SettingKey::Uselib => &self.uselib,
                SettingKey::Uses => &self.uses,
            });
        }
        self.scoped.get(scope).map(|settings| settings.get(key))
    }

    /// Every uses edge across all scopes.
    pub fn all_uses(&self) -> impl Iterator<Item = &str> {
        self.uses
            .iter()
            .chain(self.scoped.values().flat_map(|s| s.uses.iter()))
    }

    /// Whether the target declares `feature`.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// A helper for fields that accept either a single string or a list of
/// strings.
///
/// It mirrors YAML syntax where a scalar or sequence is allowed. Empty values
/// deserialize to `StringOrList::Empty`. Numbers and booleans are kept in
/// their string form, so `defines: 1` yields `"1"`.
///
/// ```yaml
/// # Scalar
/// defines: NDEBUG
/// # Sequence
/// defines:
///   - NDEBUG
///   - _WIN32
/// ```
#[derive(Debug, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    /// No value provided.
    #[default]
    Empty,
    /// A single string item.
    String(String),
    /// A list of string items.
    List(Vec<String>),
}

/// One scalar list item in string form.
struct Scalar(String);

struct ScalarVisitor;

impl Visitor<'_> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Scalar(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Scalar(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Scalar(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

struct StringOrListVisitor;

impl<'de> Visitor<'de> for StringOrListVisitor {
    type Value = StringOrList;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar or a list of scalars")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(StringOrList::Empty)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(StringOrList::Empty)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(StringOrList::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(StringOrList::String(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(StringOrList::String(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(StringOrList::String(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(StringOrList::String(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(StringOrList::String(v.to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(Scalar(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(StringOrList::List(items))
    }
}

impl<'de> Deserialize<'de> for StringOrList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StringOrListVisitor)
    }
}

impl StringOrList {
    /// Iterate over the items.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Self::Empty => &[],
            Self::String(item) => std::slice::from_ref(item),
            Self::List(items) => items,
        };
        items.iter().map(String::as_str)
    }

    /// Whether no items are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Items joined by single spaces, as used for flag strings.
    #[must_use]
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(" ")
    }
}
