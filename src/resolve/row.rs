//! Output artefact, command line and debugger fields of a row.

use camino::Utf8Path;

use crate::ast::{Environment, StringOrList, TargetDecl, TargetKind, Workspace};
use crate::model::{AliasKind, Layout, MatrixEntry, absolutise};

/// Placeholder in artefact naming patterns.
const PATTERN_SLOT: &str = "%s";

/// Environment key naming the default output folder.
const OUTPUT_FOLDER: &str = "OUTPUT_FOLDER";

/// Build tool invocation shared by every row of a run.
#[derive(Debug, Clone)]
pub struct Commands<'a> {
    /// Build tool command.
    pub tool: &'a str,
    /// Absolute solution path handed back to the build tool.
    pub solution: String,
    /// Append `-v` to every invocation.
    pub verbose: bool,
}

/// IDE build, clean and rebuild command lines of one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLines {
    /// Build command.
    pub build: String,
    /// Clean command.
    pub clean: String,
    /// Rebuild command.
    pub rebuild: String,
}

impl Commands<'_> {
    fn params(&self, entry: &MatrixEntry, target: Option<&str>) -> String {
        let mut params = format!(
            "--execsolution=\"{}\" --project-spec={}",
            self.solution, entry.key.spec
        );
        if let Some(name) = target {
            params.push_str(" --targets=");
            params.push_str(name);
        }
        if self.verbose {
            params.push_str(" -v");
        }
        params
    }

    /// Commands building `target` (or everything) for `entry`.
    #[must_use]
    pub fn for_target(&self, entry: &MatrixEntry, target: Option<&str>) -> CommandLines {
        let params = self.params(entry, target);
        let variant = entry.key.environment_key();
        let tool = self.tool;
        CommandLines {
            build: format!("{tool} build_{variant} {params}"),
            clean: format!("{tool} clean_{variant} {params}"),
            rebuild: format!("{tool} clean_{variant} build_{variant} {params}"),
        }
    }

    /// Commands of an alias project.
    #[must_use]
    pub fn for_alias(&self, kind: AliasKind, entry: &MatrixEntry) -> CommandLines {
        let tool = self.tool;
        match kind {
            AliasKind::BuildAll => self.for_target(entry, None),
            AliasKind::InstallAll => {
                let params = self.params(entry, None);
                CommandLines {
                    build: format!("{tool} build install {params}"),
                    clean: format!("{tool} clean {params}"),
                    rebuild: format!("{tool} clean build install {params}"),
                }
            }
            AliasKind::ProjectView => {
                let build = format!("{tool} {} generate", self.params(entry, None));
                CommandLines {
                    rebuild: build.clone(),
                    build,
                    clean: String::new(),
                }
            }
        }
    }
}

/// Where a target's artefact lands for one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artefact {
    /// Directory holding the artefact.
    pub output_dir: String,
    /// Full artefact path; empty for targets without a link step.
    pub output_file: String,
    /// Artefact base name; empty for targets without a link step.
    pub output_name: String,
    /// Binary directory of the configuration.
    pub bin_dir: String,
}

fn scalar(environment: &Environment, key: &str) -> Option<String> {
    environment
        .get(key)
        .filter(|value| !value.is_empty())
        .map(StringOrList::joined)
}

/// Output base name of `target` for `configuration`.
#[must_use]
pub fn output_name(target: &TargetDecl, configuration: &str) -> String {
    let by_configuration = if configuration.starts_with("debug") {
        target.debug_output_file_name.as_ref()
    } else {
        target.ndebug_output_file_name.as_ref()
    };
    by_configuration
        .or(target.output_file_name.as_ref())
        .unwrap_or(&target.name)
        .clone()
}

/// The environment's default output folder for `platform`/`configuration`.
fn default_output_folder(environment: &Environment, platform: &str, configuration: &str) -> String {
    scalar(environment, OUTPUT_FOLDER).unwrap_or_else(|| format!("bin/{platform}_{configuration}"))
}

/// Output folder override declared by `target`, most specific first.
fn folder_override<'t>(target: &'t TargetDecl, platform: &str, configuration: &str) -> Option<&'t str> {
    let mut keys = if configuration == "debug" {
        vec![format!("{platform}_debug")]
    } else {
        vec![
            format!("{platform}_ndebug"),
            format!("{platform}_{configuration}"),
        ]
    };
    keys.push(platform.to_owned());
    keys.iter()
        .find_map(|key| target.output_folders.get(key))
        .map(String::as_str)
}

/// Resolve where `target` writes its artefact for `entry`.
#[must_use]
pub fn artefact(
    layout: &Layout,
    environment: &Environment,
    target: &TargetDecl,
    entry: &MatrixEntry,
) -> Artefact {
    let platform = entry.key.platform.as_str();
    let configuration = entry.key.configuration.as_str();
    let default_folder = default_output_folder(environment, platform, configuration);
    let relative = folder_override(target, platform, configuration).unwrap_or(&default_folder);
    let mut folder = absolutise(&layout.root, relative);
    if let Some(sub) = &target.output_sub_folder {
        folder = absolutise(&folder, sub);
    }
    let bin_dir = absolutise(&layout.root, &default_folder);

    let name = output_name(target, configuration);
    let (output_file, output_name) = target.kind.pattern_key().map_or_else(
        || (String::new(), String::new()),
        |key| {
            let pattern = scalar(environment, key).unwrap_or_else(|| PATTERN_SLOT.to_owned());
            let file = folder.join(pattern.replacen(PATTERN_SLOT, &name, 1));
            (file.into_string(), name)
        },
    );
    Artefact {
        output_dir: folder.into_string(),
        output_file,
        output_name,
        bin_dir: bin_dir.into_string(),
    }
}

/// Debugger settings of one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugLaunch {
    /// Debugger command.
    pub command: String,
    /// Debugger arguments.
    pub arguments: String,
    /// Program the debugger starts.
    pub path: String,
    /// Whether `path` names an external tool launcher.
    pub external_tool: bool,
}

/// Decide how the IDE debugs `target`.
///
/// Test configurations of shared libraries run inside the test runner.
/// Targets of a workspace built against an external engine may name a tool
/// launcher from the engine's output folder instead.
#[must_use]
pub fn debug_launch(
    workspace: &Workspace,
    layout: &Layout,
    environment: &Environment,
    target: &TargetDecl,
    entry: &MatrixEntry,
    artefact: &Artefact,
) -> DebugLaunch {
    let settings = &workspace.solution;
    if entry.is_test && target.kind == TargetKind::SharedLibrary {
        return DebugLaunch {
            command: format!("$(OutDir){}", settings.test_runner),
            arguments: format!("{} {}", artefact.output_file, settings.test_runner_args),
            path: artefact.output_file.clone(),
            external_tool: false,
        };
    }
    let default = DebugLaunch {
        command: "$(TargetPath)".to_owned(),
        arguments: String::new(),
        path: artefact.output_file.clone(),
        external_tool: false,
    };
    let Some(launcher) = target.tool_launcher_target.as_deref() else {
        return default;
    };
    if !layout.is_external_engine() {
        return default;
    }
    let pattern = scalar(environment, "cxxprogram_PATTERN").unwrap_or_else(|| "%s.exe".to_owned());
    let folder = Utf8Path::new(&artefact.output_dir)
        .file_name()
        .unwrap_or_default();
    let path = layout
        .engine_root
        .join(folder)
        .join(pattern.replacen(PATTERN_SLOT, launcher, 1));
    DebugLaunch {
        arguments: format!("--app-root \"{}\"", layout.root),
        path: path.into_string(),
        external_tool: true,
        ..default
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "row tests use expect for clearer failures")]

    use super::*;
    use crate::model::BuildConfigurationKey;
    use rstest::rstest;

    fn entry(configuration: &str, is_test: bool) -> MatrixEntry {
        let key = BuildConfigurationKey {
            spec: "all".into(),
            spec_display: "All".into(),
            platform: "win_x64".into(),
            configuration: configuration.into(),
        };
        MatrixEntry {
            label: key.label(),
            key,
            spec_index: 0,
            platform_index: 0,
            ide_platform: "x64".into(),
            toolset: "v141".into(),
            is_test,
            declared: true,
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(yaml: &str) -> T {
        crate::manifest::from_yaml(yaml).expect("value")
    }

    fn workspace(solution_extra: &str) -> Workspace {
        crate::manifest::from_str(&format!(
            "slnweave_version: 1.0.0\nsolution: {{ name: Demo, build_tool: waf{solution_extra} }}\n\
             ide: {{ name: vs2017, version: '15' }}\n"
        ))
        .expect("workspace")
    }

    fn layout(ws: &Workspace) -> Layout {
        Layout::new(ws, Utf8Path::new("/ws"), Utf8Path::new("slnweave.yml"), "Demo")
    }

    const ENV: &str = "cxxprogram_PATTERN: '%s.exe'
cxxshlib_PATTERN: '%s.dll'
cxxstlib_PATTERN: '%s.lib'
OUTPUT_FOLDER: Bin64
";

    #[rstest]
    #[case("debug", "core_d")]
    #[case("debug_test", "core_d")]
    #[case("profile", "core_nd")]
    fn output_names_follow_configuration(#[case] configuration: &str, #[case] expected: &str) {
        let target: TargetDecl = parse(
            "{ name: core, debug_output_file_name: core_d, ndebug_output_file_name: core_nd }",
        );
        assert_eq!(output_name(&target, configuration), expected);
        let plain: TargetDecl = parse("{ name: core, output_file_name: Core }");
        assert_eq!(output_name(&plain, configuration), "Core");
    }

    #[rstest]
    #[case("debug", "/ws/Bin64.Debug/Tools")]
    #[case("profile", "/ws/Bin64.Release/Tools")]
    #[case("release", "/ws/Bin64.Final/Tools")]
    fn output_folders_prefer_specific_overrides(#[case] configuration: &str, #[case] expected: &str) {
        let ws = workspace("");
        let target: TargetDecl = parse(
            "name: tool
kind: program
output_sub_folder: Tools
output_folders:
  win_x64_debug: Bin64.Debug
  win_x64_ndebug: Bin64.Release
  win_x64_release: Bin64.Ignored
",
        );
        let mut final_target = target.clone();
        final_target.output_folders.shift_remove("win_x64_ndebug");
        final_target
            .output_folders
            .insert("win_x64_release".into(), "Bin64.Final".into());
        let env: Environment = parse(ENV);
        let chosen = if configuration == "release" { &final_target } else { &target };
        let built = artefact(&layout(&ws), &env, chosen, &entry(configuration, false));
        assert_eq!(built.output_dir, expected);
        assert_eq!(built.output_file, format!("{expected}/tool.exe"));
        assert_eq!(built.bin_dir, "/ws/Bin64");
    }

    #[rstest]
    fn objects_have_no_artefact_name() {
        let ws = workspace("");
        let target: TargetDecl = parse("{ name: objs, kind: objects }");
        let env: Environment = parse("{}");
        let built = artefact(&layout(&ws), &env, &target, &entry("debug", false));
        assert_eq!(built.output_dir, "/ws/bin/win_x64_debug");
        assert!(built.output_file.is_empty() && built.output_name.is_empty());
    }

    #[rstest]
    fn test_libraries_run_in_the_test_runner() {
        let ws = workspace("");
        let target: TargetDecl = parse("{ name: core_tests, kind: shared_library }");
        let env: Environment = parse(ENV);
        let test_entry = entry("debug_test", true);
        let built = artefact(&layout(&ws), &env, &target, &test_entry);
        let launch = debug_launch(&ws, &layout(&ws), &env, &target, &test_entry, &built);
        assert_eq!(launch.command, "$(OutDir)AzTestRunner");
        assert_eq!(
            launch.arguments,
            "/ws/Bin64/core_tests.dll AzRunUnitTests --pause-on-completion --gtest_break_on_failure"
        );
        assert!(!launch.external_tool);
    }

    #[rstest]
    fn external_engines_launch_tools() {
        let ws = workspace(", engine_root: ../engine");
        let target: TargetDecl = parse("{ name: plugin, kind: shared_library, tool_launcher_target: Editor }");
        let env: Environment = parse(ENV);
        let debug = entry("debug", false);
        let built = artefact(&layout(&ws), &env, &target, &debug);
        let launch = debug_launch(&ws, &layout(&ws), &env, &target, &debug, &built);
        assert_eq!(launch.command, "$(TargetPath)");
        assert_eq!(launch.path, "/ws/../engine/Bin64/Editor.exe");
        assert_eq!(launch.arguments, "--app-root \"/ws\"");
        assert!(launch.external_tool);

        let local = workspace("");
        let plain = debug_launch(&local, &layout(&local), &env, &target, &debug, &built);
        assert_eq!(plain.path, "/ws/Bin64/plugin.dll");
        assert!(!plain.external_tool);
    }

    #[rstest]
    fn command_lines_per_project_kind() {
        let commands = Commands {
            tool: "waf",
            solution: "/ws/Solutions/Demo.sln".into(),
            verbose: true,
        };
        let debug = entry("debug", false);
        let params = "--execsolution=\"/ws/Solutions/Demo.sln\" --project-spec=all";
        let target = commands.for_target(&debug, Some("core"));
        assert_eq!(
            target.build,
            format!("waf build_win_x64_debug {params} --targets=core -v")
        );
        assert_eq!(
            target.rebuild,
            format!("waf clean_win_x64_debug build_win_x64_debug {params} --targets=core -v")
        );
        let install = commands.for_alias(AliasKind::InstallAll, &debug);
        assert_eq!(install.build, format!("waf build install {params} -v"));
        assert_eq!(install.clean, format!("waf clean {params} -v"));
        let view = commands.for_alias(AliasKind::ProjectView, &debug);
        assert_eq!(view.build, format!("waf {params} -v generate"));
        assert_eq!(view.rebuild, view.build);
        assert!(view.clean.is_empty());
    }
}
