//! # Config Schema
//!
//! The declarative table of every option the runner understands. Each entry states
//! its value kind, how values from different layers combine, and which layers may
//! set it. Nothing outside this table is ever treated as an option.

use crate::models::FlagValue;
use serde::Serialize;
use std::collections::BTreeMap;

/// The shape of an option's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    /// A boolean toggle (`--debug`, `--no-debug`).
    Flag,
    /// A free-form string.
    Text,
    /// A filesystem path.
    Path,
    /// A list of paths that may be given several times.
    PathList,
    /// A list of command paths (`"plugin install"`).
    CommandList,
    /// `auto`, `true` or `false`.
    Color,
    /// A string that is also accepted bare; a bare value is reported later.
    Endpoint,
}

/// How a value from a higher-precedence layer combines with what is already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    Override,
    Concatenate,
}

/// One row of the option table.
#[derive(Debug, Serialize)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub policy: MergePolicy,
    /// Accepted as a reserved command-line flag.
    pub runtime: bool,
    /// Accepted in config files.
    pub file: bool,
    /// Environment variable feeding the environment layer.
    pub env: Option<&'static str>,
    pub default: &'static str,
    pub desc: &'static str,
}

/// The single source of truth for all bootstrap options.
pub static OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        name: "path",
        kind: OptionKind::Path,
        policy: MergePolicy::Override,
        runtime: true,
        file: true,
        env: Some("WP_CLI_PATH"),
        default: "",
        desc: "Path to the host install.",
    },
    OptionSpec {
        name: "url",
        kind: OptionKind::Endpoint,
        policy: MergePolicy::Override,
        runtime: true,
        file: true,
        env: Some("WP_CLI_URL"),
        default: "",
        desc: "Pretend request came from given URL.",
    },
    OptionSpec {
        name: "blog",
        kind: OptionKind::Endpoint,
        policy: MergePolicy::Override,
        runtime: true,
        file: false,
        env: None,
        default: "",
        desc: "Deprecated. Use --url instead.",
    },
    OptionSpec {
        name: "config",
        kind: OptionKind::Path,
        policy: MergePolicy::Override,
        runtime: true,
        file: false,
        env: None,
        default: "",
        desc: "Path to the global config file.",
    },
    OptionSpec {
        name: "user",
        kind: OptionKind::Text,
        policy: MergePolicy::Override,
        runtime: true,
        file: true,
        env: Some("WP_CLI_USER"),
        default: "",
        desc: "Set the current user.",
    },
    OptionSpec {
        name: "require",
        kind: OptionKind::PathList,
        policy: MergePolicy::Concatenate,
        runtime: true,
        file: true,
        env: None,
        default: "",
        desc: "Load a file before running the command (may be used more than once).",
    },
    OptionSpec {
        name: "disabled_commands",
        kind: OptionKind::CommandList,
        policy: MergePolicy::Override,
        runtime: false,
        file: true,
        env: None,
        default: "",
        desc: "List of commands that can not be run.",
    },
    OptionSpec {
        name: "color",
        kind: OptionKind::Color,
        policy: MergePolicy::Override,
        runtime: true,
        file: true,
        env: Some("WP_CLI_COLOR"),
        default: "auto",
        desc: "Whether to colorize the output.",
    },
    OptionSpec {
        name: "debug",
        kind: OptionKind::Flag,
        policy: MergePolicy::Override,
        runtime: true,
        file: true,
        env: Some("WP_CLI_DEBUG"),
        default: "false",
        desc: "Show all diagnostic messages.",
    },
    OptionSpec {
        name: "quiet",
        kind: OptionKind::Flag,
        policy: MergePolicy::Override,
        runtime: true,
        file: true,
        env: Some("WP_CLI_QUIET"),
        default: "false",
        desc: "Suppress informational messages.",
    },
];

/// Finds an option by its exact name.
pub fn find_option(name: &str) -> Option<&'static OptionSpec> {
    OPTIONS.iter().find(|spec| spec.name == name)
}

/// Returns the option reserved for `flag` when it is a bootstrap-only flag.
/// Flags that are not reserved return `None` and stay with the command.
pub fn runtime_option(flag: &str) -> Option<&'static OptionSpec> {
    find_option(flag).filter(|spec| spec.runtime)
}

/// A value contributed by one layer, before typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Single(FlagValue),
    List(Vec<FlagValue>),
}

impl OptionValue {
    /// Wraps a flag value according to the option's shape; list options always
    /// become one-element lists so repeated flags can concatenate.
    pub fn for_spec(spec: &OptionSpec, value: FlagValue) -> Self {
        match spec.kind {
            OptionKind::PathList | OptionKind::CommandList => Self::List(vec![value]),
            _ => Self::Single(value),
        }
    }

    /// Combines `incoming` into `self` following `policy`.
    pub fn merge(&mut self, incoming: Self, policy: MergePolicy) {
        match (policy, &mut *self, incoming) {
            (MergePolicy::Concatenate, Self::List(current), Self::List(more)) => {
                current.extend(more);
            }
            (_, slot, incoming) => *slot = incoming,
        }
    }
}

/// The option values contributed by a single layer, keyed by option name.
pub type LayerValues = BTreeMap<&'static str, OptionValue>;
