//! Dependency flag-set ("uselib") probing.
//!
//! A target names flag sets under several setting scopes. Which scopes apply
//! depends on the platform and on whether the configuration builds tests.
//! Each named flag set is then looked up in the environment of the entry.

use tracing::debug;

use crate::ast::{Environment, Platform};

/// Suffix that marks a test configuration.
const TEST_SUFFIX: &str = "_test";

/// Setting scopes whose `uselib` lists apply to `platform` and
/// `configuration`, in probe order. The empty scope is generic.
///
/// Test configurations probe the `test*` scopes, keyed by the configuration
/// name without its `_test` suffix.
#[must_use]
pub fn probe_scopes(platform: &Platform, configuration: &str, is_test: bool) -> Vec<String> {
    let mut scopes = vec![String::new()];
    scopes.extend(platform.names().map(str::to_owned));
    if is_test {
        let stripped = configuration
            .strip_suffix(TEST_SUFFIX)
            .unwrap_or(configuration);
        scopes.extend(["test".to_owned(), "test_all".to_owned(), format!("test_{stripped}")]);
        scopes.extend(platform.names().map(|name| format!("test_{name}")));
        scopes.extend(platform.names().map(|name| format!("test_{name}_{stripped}")));
    } else {
        scopes.extend(platform.names().map(|name| format!("{name}_{configuration}")));
    }
    scopes
}

/// Include directories and defines contributed by one flag set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    /// Include directories, then system include directories.
    pub includes: Vec<String>,
    /// Preprocessor defines.
    pub defines: Vec<String>,
}

fn first_of<'e>(environment: &'e Environment, keys: [String; 2]) -> Option<Vec<&'e str>> {
    keys.iter()
        .find_map(|key| environment.get(key))
        .map(|values| values.iter().collect())
}

/// Look up flag set `name` in `environment`.
///
/// Each category falls back to its `D`-suffixed variant. Returns `None` when
/// the environment knows nothing about the name.
#[must_use]
pub fn lookup(environment: &Environment, name: &str) -> Option<FlagSet> {
    let includes = first_of(environment, [format!("INCLUDES_{name}"), format!("INCLUDES_{name}D")]);
    let system = first_of(
        environment,
        [
            format!("SYSTEM_INCLUDES_{name}"),
            format!("SYSTEM_INCLUDES_{name}D"),
        ],
    );
    let defines = first_of(environment, [format!("DEFINES_{name}"), format!("DEFINES_{name}D")]);
    if includes.is_none() && system.is_none() && defines.is_none() {
        debug!(flag_set = name, "flag set not found in environment");
        return None;
    }
    Some(FlagSet {
        includes: includes
            .into_iter()
            .chain(system)
            .flatten()
            .map(str::to_owned)
            .collect(),
        defines: defines
            .into_iter()
            .flatten()
            .map(str::to_owned)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "probe tests use expect for clearer failures")]

    use super::*;
    use rstest::rstest;

    fn platform() -> Platform {
        crate::manifest::from_yaml("{ name: win_x64, aliases: [win] }").expect("platform")
    }

    fn environment(yaml: &str) -> Environment {
        crate::manifest::from_yaml(yaml).expect("environment")
    }

    #[rstest]
    fn regular_configurations_probe_platform_configuration_scopes() {
        assert_eq!(
            probe_scopes(&platform(), "profile", false),
            ["", "win_x64", "win", "win_x64_profile", "win_profile"]
        );
    }

    #[rstest]
    fn test_configurations_probe_test_scopes() {
        assert_eq!(
            probe_scopes(&platform(), "debug_test", true),
            [
                "",
                "win_x64",
                "win",
                "test",
                "test_all",
                "test_debug",
                "test_win_x64",
                "test_win",
                "test_win_x64_debug",
                "test_win_debug"
            ]
        );
    }

    #[rstest]
    fn flagged_test_configurations_probe_test_scopes_without_the_suffix() {
        let scopes = probe_scopes(&platform(), "unit", true);
        assert!(scopes.contains(&"test_unit".to_owned()));
        assert!(scopes.contains(&"test_win_unit".to_owned()));
        assert!(!scopes.contains(&"win_unit".to_owned()));
    }

    #[rstest]
    fn unflagged_suffixes_follow_the_caller() {
        let scopes = probe_scopes(&platform(), "debug_test", false);
        assert_eq!(scopes.last().map(String::as_str), Some("win_debug_test"));
    }

    #[rstest]
    fn lookup_prefers_plain_keys_and_falls_back_to_debug_keys() {
        let env = environment(
            "INCLUDES_ZLIB: /sdk/zlib
INCLUDES_ZLIBD: /sdk/zlib_d
SYSTEM_INCLUDES_ZLIBD: [/sdk/sys]
DEFINES_ZLIBD: [ZLIB_DEBUG]
",
        );
        let found = lookup(&env, "ZLIB").expect("flag set");
        assert_eq!(found.includes, ["/sdk/zlib", "/sdk/sys"]);
        assert_eq!(found.defines, ["ZLIB_DEBUG"]);
    }

    #[rstest]
    fn unknown_flag_sets_contribute_nothing() {
        let env = environment("CFLAGS: /W4\n");
        assert!(lookup(&env, "ghost").is_none());
    }
}
