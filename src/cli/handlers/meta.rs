// src/cli/handlers/meta.rs

// Handlers for the `cli` family. They run at the `before_host_load` checkpoint,
// so none of them may rely on an installed host.

use anyhow::{Result, anyhow};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::constants::ROOT_COMMAND;
use crate::core::{
    command_tree::CommandTree,
    config_schema::{self, OptionSpec},
    runner::Invocation,
};

/// Prints the version line.
pub fn version(inv: &Invocation<'_>) -> Result<()> {
    inv.reporter
        .line(format!(t!("cli.version.line"), version = env!("CARGO_PKG_VERSION")));
    Ok(())
}

/// Everything `cli info` reports.
#[derive(Debug, Serialize)]
struct CliInfo<'a> {
    version: &'static str,
    os: String,
    shell: Option<String>,
    host_root: Option<&'a Path>,
    config_files: &'a [std::path::PathBuf],
    lang: &'static str,
}

/// Prints information about the environment, as a table or as JSON.
pub fn info(inv: &Invocation<'_>) -> Result<()> {
    let info = CliInfo {
        version: env!("CARGO_PKG_VERSION"),
        os: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
        shell: std::env::var("SHELL").ok(),
        host_root: inv.context.host_root(),
        config_files: &inv.config.loaded_files,
        lang: env!("WP_LANG_EFFECTIVE"),
    };

    if inv.flag_text("format") == Some("json") {
        inv.reporter.line(serde_json::to_string(&info)?);
        return Ok(());
    }

    let none = t!("common.label.none");
    let files = if info.config_files.is_empty() {
        none.to_string()
    } else {
        info.config_files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let rows = [
        (t!("info.label.version"), info.version.to_string()),
        (t!("info.label.os"), info.os.clone()),
        (t!("info.label.shell"), info.shell.clone().unwrap_or_else(|| none.to_string())),
        (
            t!("info.label.host_root"),
            info.host_root
                .map_or_else(|| none.to_string(), |p| p.display().to_string()),
        ),
        (t!("info.label.config_files"), files),
        (t!("info.label.lang"), info.lang.to_string()),
    ];
    for (label, value) in rows {
        inv.reporter.line(format!("{:<16} {}", label.blue(), value));
    }
    Ok(())
}

/// Prints one completion candidate per line for the partial command line
/// given with `--line`.
pub fn completions(inv: &Invocation<'_>) -> Result<()> {
    let line = inv
        .flag_text("line")
        .ok_or_else(|| anyhow!(t!("cli.completions.error.missing_line")))?;
    for candidate in complete(inv.tree, line)? {
        inv.reporter.line(candidate);
    }
    Ok(())
}

/// Dumps the bootstrap option table as JSON.
pub fn param_dump(inv: &Invocation<'_>) -> Result<()> {
    let params: BTreeMap<&str, &OptionSpec> = config_schema::OPTIONS
        .iter()
        .map(|spec| (spec.name, spec))
        .collect();
    inv.reporter.line(serde_json::to_string(&params)?);
    Ok(())
}

/// Completion candidates for `line`, as typed after the prompt. The word under
/// the cursor is the last token, unless the line ends in whitespace.
pub fn complete(tree: &CommandTree, line: &str) -> Result<Vec<String>> {
    let mut words = shlex::split(line).ok_or_else(|| anyhow!(t!("cli.completions.error.unparsable")))?;
    if words.first().map(String::as_str) == Some(ROOT_COMMAND) {
        words.remove(0);
    }
    let current = if line.ends_with(char::is_whitespace) || words.is_empty() {
        String::new()
    } else {
        words.pop().unwrap_or_default()
    };

    let mut node = tree.root();
    for word in words.iter().filter(|w| !w.starts_with("--")) {
        match tree.find_subcommand(node, word) {
            Some(child) if tree.is_composite(child) => node = child,
            Some(child) => {
                node = child;
                break;
            }
            None => return Ok(Vec::new()),
        }
    }

    if current.starts_with('-') {
        let typed: Vec<&str> = words.iter().map(String::as_str).collect();
        return Ok(config_schema::OPTIONS
            .iter()
            .filter(|spec| spec.runtime)
            .map(|spec| format!("--{}", spec.name))
            .filter(|flag| flag.starts_with(&current) && !typed.iter().any(|w| w.starts_with(flag.as_str())))
            .collect());
    }

    Ok(tree
        .children(node)
        .into_iter()
        .map(|(name, _)| name.to_string())
        .filter(|name| name.starts_with(&current))
        .collect())
}
