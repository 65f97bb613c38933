//! Hints attached to YAML and schema diagnostics.

/// Substring of a YAML parser message paired with advice for the author.
pub(crate) const YAML_HINTS: [(&str, &str); 5] = [
    (
        "did not find expected '-'",
        "Start list items with '-' and indent them under their key.",
    ),
    (
        "expected ':'",
        "Separate each key from its value with ':'.",
    ),
    (
        "mapping values are not allowed",
        "Quote values that contain ':' such as Windows drive paths.",
    ),
    (
        "found character that cannot start any token",
        "Remove stray characters and indent with spaces only.",
    ),
    (
        "unknown escape character",
        "Backslashes in double quotes start escapes; use single quotes for paths.",
    ),
];

/// Substring of a schema error paired with advice for the author.
pub(crate) const SCHEMA_HINTS: [(&str, &str); 3] = [
    (
        "unknown field",
        "Check the key's spelling; scoped settings belong under `scoped:`.",
    ),
    (
        "missing field",
        "Every target needs a `name`; the solution needs `name` and `build_tool`.",
    ),
    (
        "slnweave_version",
        "Declare the document version as a semantic version, e.g. 1.0.0.",
    ),
];
