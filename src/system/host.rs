//! # Host Environment
//!
//! The boundary between the runner and the installed host site. The runner only
//! ever talks to a [`HostEnvironment`]; [`FsHost`] is the implementation that
//! inspects an install on disk.

use crate::constants::{HOST_LOAD_FILENAME, HOST_VERSION_FILE};
use crate::core::command_tree::CommandTree;
use crate::core::paths;
use crate::models::{CommandPath, Flags};
use crate::state::BootstrapContext;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

lazy_static! {
    static ref VERSION_RE: Regex =
        Regex::new(r#"\$wp_version\s*=\s*['"]([^'"]+)['"]"#).expect("version pattern is valid");
    // define( 'NAME', 'value' );  Only string values are captured, single and
    // double quoted literals separately so escaped quotes survive.
    static ref DEFINE_RE: Regex = Regex::new(
        r#"define\s*\(\s*(?:'([^']+)'|"([^"]+)")\s*,\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")\s*\)\s*;"#
    )
    .expect("define pattern is valid");
    static ref SETTINGS_REQUIRE_RE: Regex =
        Regex::new(r"^\s*require.+wp-settings\.php").expect("settings pattern is valid");
    static ref OPEN_TAG_RE: Regex = Regex::new(r"^\s*<\?php\s*").expect("open tag pattern is valid");
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Could not read '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No version declaration found in '{0}'.")]
    VersionUnknown(String),
    #[error("Could not boot the host at '{0}': {1} is missing.")]
    Boot(String, &'static str),
    #[error("Could not serialize host call: {0}")]
    Handoff(#[from] serde_json::Error),
}

/// The host config file with everything that would bootstrap the full host
/// removed, plus the string constants it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolatedConfig {
    pub path: PathBuf,
    pub code: String,
    pub constants: BTreeMap<String, String>,
}

/// A command handed over to the host for execution.
#[derive(Debug, Serialize)]
pub struct HostCall<'a> {
    pub command: &'a CommandPath,
    pub args: &'a [String],
    pub flags: &'a Flags,
    #[serde(skip)]
    pub context: &'a BootstrapContext,
}

pub trait HostEnvironment: fmt::Debug {
    /// True when an install is present at `root`.
    fn exists(&self, root: &Path) -> bool;

    /// The installed host version.
    fn version(&self, root: &Path) -> Result<String, HostError>;

    /// Path of the host config file belonging to `root`, if any.
    fn locate_config(&self, root: &Path) -> Option<PathBuf>;

    /// Reads the host config without letting it bootstrap the host.
    fn isolated_config(&self, path: &Path) -> Result<IsolatedConfig, HostError>;

    /// Makes sure the command family `name` is present in `tree`.
    fn load_command(&self, name: &str, tree: &mut CommandTree) -> Result<(), HostError>;

    /// Loads a user-supplied file before the command runs.
    fn load_file(&self, path: &Path, ctx: &BootstrapContext) -> Result<(), HostError>;

    /// Boots the host with the state gathered so far.
    fn boot(&self, ctx: &BootstrapContext) -> Result<(), HostError>;

    /// Runs a command that needs the host.
    fn invoke(&self, call: &HostCall<'_>) -> anyhow::Result<()>;
}

/// Host driver backed by the install's files.
#[derive(Debug, Clone, Default)]
pub struct FsHost;

impl FsHost {
    pub fn new() -> Self {
        Self
    }
}

impl HostEnvironment for FsHost {
    fn exists(&self, root: &Path) -> bool {
        root.join(HOST_VERSION_FILE).is_file()
    }

    fn version(&self, root: &Path) -> Result<String, HostError> {
        let path = root.join(HOST_VERSION_FILE);
        let code = read(&path)?;
        VERSION_RE
            .captures(&code)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| HostError::VersionUnknown(path.display().to_string()))
    }

    fn locate_config(&self, root: &Path) -> Option<PathBuf> {
        paths::locate_host_config(root)
    }

    fn isolated_config(&self, path: &Path) -> Result<IsolatedConfig, HostError> {
        Ok(isolate_config_code(path, &read(path)?))
    }

    fn load_command(&self, name: &str, _tree: &mut CommandTree) -> Result<(), HostError> {
        // Bundled families are registered up front by the dispatcher.
        log::trace!("Command family '{}' is bundled.", name);
        Ok(())
    }

    fn load_file(&self, path: &Path, ctx: &BootstrapContext) -> Result<(), HostError> {
        fs::metadata(path)
            .and_then(|meta| {
                if meta.is_file() {
                    Ok(())
                } else {
                    Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"))
                }
            })
            .map_err(|e| HostError::Unreadable {
                path: path.display().to_string(),
                source: e,
            })?;
        ctx.record_loaded_file(path);
        Ok(())
    }

    fn boot(&self, ctx: &BootstrapContext) -> Result<(), HostError> {
        let root = ctx.host_root().unwrap_or(Path::new("."));
        let loader = root.join(HOST_LOAD_FILENAME);
        if !loader.is_file() {
            return Err(HostError::Boot(root.display().to_string(), HOST_LOAD_FILENAME));
        }
        ctx.record_loaded_file(&loader);
        log::debug!("Host booted from '{}'.", loader.display());
        Ok(())
    }

    /// Hands the call over as a single JSON document on stdout, for the host
    /// side to pick up.
    fn invoke(&self, call: &HostCall<'_>) -> anyhow::Result<()> {
        let mut handoff = serde_json::to_value(call).map_err(HostError::from)?;
        if let Some(object) = handoff.as_object_mut() {
            let ctx = call.context;
            object.insert("root".into(), serde_json::to_value(ctx.host_root())?);
            object.insert("request".into(), serde_json::to_value(ctx.request())?);
            object.insert("user".into(), serde_json::to_value(ctx.current_user())?);
            object.insert("constants".into(), serde_json::to_value(ctx.constants())?);
        }
        println!("{}", serde_json::to_string(&handoff)?);
        Ok(())
    }
}

fn read(path: &Path) -> Result<String, HostError> {
    fs::read_to_string(path).map_err(|e| HostError::Unreadable {
        path: path.display().to_string(),
        source: e,
    })
}

/// Strips the settings bootstrap line and the opening tag, and pins the magic
/// file constants to the config file's real location.
pub fn isolate_config_code(path: &Path, content: &str) -> IsolatedConfig {
    let file = format!("'{}'", path.display());
    let dir = format!("'{}'", path.parent().unwrap_or(Path::new(".")).display());

    let lines: Vec<String> = content
        .lines()
        .filter(|line| !SETTINGS_REQUIRE_RE.is_match(line))
        .map(|line| line.replace("__FILE__", &file).replace("__DIR__", &dir))
        .collect();
    let code = OPEN_TAG_RE.replace(&lines.join("\n"), "").into_owned();
    let constants = scan_defines(&code).into_iter().collect();

    IsolatedConfig {
        path: path.to_path_buf(),
        code,
        constants,
    }
}

/// Every `define('NAME', 'value')` with a string value, in source order.
/// Defines on commented-out lines are ignored and values are unescaped.
pub fn scan_defines(code: &str) -> Vec<(String, String)> {
    let live = strip_comment_lines(code);
    DEFINE_RE
        .captures_iter(&live)
        .filter_map(|caps| {
            let name = caps.get(1).or_else(|| caps.get(2))?.as_str().to_string();
            let value = match (caps.get(3), caps.get(4)) {
                (Some(single), _) => unescape_literal(single.as_str(), '\''),
                (None, Some(double)) => unescape_literal(double.as_str(), '"'),
                (None, None) => return None,
            };
            Some((name, value))
        })
        .collect()
}

/// Drops `//` and `#` comment lines and `/* */` blocks that start a line.
/// Trailing comments after code are left alone.
fn strip_comment_lines(code: &str) -> String {
    let mut live = Vec::new();
    let mut in_block = false;
    for line in code.lines() {
        let mut rest = line;
        if in_block {
            match rest.find("*/") {
                Some(end) => {
                    in_block = false;
                    rest = rest.get(end + 2..).unwrap_or_default();
                }
                None => continue,
            }
        }
        loop {
            let trimmed = rest.trim_start();
            if trimmed.starts_with("//") || trimmed.starts_with('#') {
                rest = "";
                break;
            }
            let Some(open) = trimmed.strip_prefix("/*") else {
                break;
            };
            match open.find("*/") {
                Some(end) => rest = open.get(end + 2..).unwrap_or_default(),
                None => {
                    in_block = true;
                    rest = "";
                    break;
                }
            }
        }
        live.push(rest);
    }
    live.join("\n")
}

/// Resolves the escapes of a quoted literal's body. Single quotes only know
/// `\'` and `\\`; double quotes also know the usual control escapes.
fn unescape_literal(body: &str, quote: char) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match (quote, chars.next()) {
            (_, Some(next)) if next == quote || next == '\\' => out.push(next),
            ('"', Some('n')) => out.push('\n'),
            ('"', Some('t')) => out.push('\t'),
            ('"', Some('r')) => out.push('\r'),
            ('"', Some('$')) => out.push('$'),
            (_, Some(next)) => {
                out.push('\\');
                out.push(next);
            }
            (_, None) => out.push('\\'),
        }
    }
    out
}

/// Compares dotted versions numerically. Missing components count as zero and
/// anything after the leading digits of a component is ignored.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split(['.', '-', '+'])
            .map(|part| {
                let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| a.get(i).copied().unwrap_or(0).cmp(&b.get(i).copied().unwrap_or(0)))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}
