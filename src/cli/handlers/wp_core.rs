// src/cli/handlers/wp_core.rs

use anyhow::{Context, Result, anyhow, bail};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use uuid::Uuid;

use crate::constants::{HOST_CONFIG_FILENAME, HOST_SETTINGS_FILENAME};
use crate::core::runner::Invocation;

lazy_static! {
    static ref TABLE_PREFIX_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").expect("prefix pattern is valid");
}

const SALT_KEYS: &[&str] = &[
    "AUTH_KEY",
    "SECURE_AUTH_KEY",
    "LOGGED_IN_KEY",
    "NONCE_KEY",
    "AUTH_SALT",
    "SECURE_AUTH_SALT",
    "LOGGED_IN_SALT",
    "NONCE_SALT",
];

/// Database settings written into a new host config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub prefix: String,
    pub charset: String,
}

impl DatabaseSettings {
    /// Reads the settings from the command flags. `dbname` and `dbuser` are
    /// required; everything else has the host's usual default.
    pub fn from_invocation(inv: &Invocation<'_>) -> Result<Self> {
        let required = |name: &str| {
            inv.flag_text(name)
                .map(str::to_string)
                .ok_or_else(|| anyhow!(format!(t!("core.config.error.missing_param"), param = name)))
        };
        let optional = |name: &str, default: &str| inv.flag_text(name).unwrap_or(default).to_string();

        let settings = Self {
            name: required("dbname")?,
            user: required("dbuser")?,
            password: optional("dbpass", ""),
            host: optional("dbhost", "localhost"),
            prefix: optional("dbprefix", "wp_"),
            charset: optional("dbcharset", "utf8"),
        };
        if !TABLE_PREFIX_RE.is_match(&settings.prefix) {
            bail!(t!("core.config.error.invalid_prefix"));
        }
        Ok(settings)
    }
}

/// The handler for `core config`: writes the host config into the host root.
pub fn config(inv: &Invocation<'_>) -> Result<()> {
    let root = inv
        .context
        .host_root()
        .ok_or_else(|| anyhow!(t!("core.error.no_root")))?;
    let target = root.join(HOST_CONFIG_FILENAME);
    if target.exists() && !inv.flag_enabled("force") {
        bail!(format!(t!("core.config.error.exists"), path = target.display()));
    }

    let settings = DatabaseSettings::from_invocation(inv)?;
    let salts = if inv.flag_enabled("skip-salts") {
        None
    } else {
        Some(generate_salts())
    };
    let content = render_config(&settings, salts.as_deref());

    fs::create_dir_all(root).with_context(|| format!("Failed to create '{}'", root.display()))?;
    fs::write(&target, content).with_context(|| format!("Failed to write '{}'", target.display()))?;
    inv.reporter
        .success(format!(t!("core.config.success"), path = target.display()));
    Ok(())
}

/// The handler for `core version`.
pub fn version(inv: &Invocation<'_>) -> Result<()> {
    let root = inv
        .context
        .host_root()
        .ok_or_else(|| anyhow!(t!("core.error.no_root")))?;
    inv.reporter.line(inv.host.version(root)?);
    Ok(())
}

/// Renders a host config defining the database constants, the optional salts
/// and the table prefix, ending with the settings bootstrap.
pub fn render_config(settings: &DatabaseSettings, salts: Option<&[(String, String)]>) -> String {
    let mut out = String::from("<?php\n");
    for (name, value) in [
        ("DB_NAME", &settings.name),
        ("DB_USER", &settings.user),
        ("DB_PASSWORD", &settings.password),
        ("DB_HOST", &settings.host),
        ("DB_CHARSET", &settings.charset),
    ] {
        out.push_str(&format!("define('{}', '{}');\n", name, php_quote(value)));
    }
    out.push_str("define('DB_COLLATE', '');\n\n");

    if let Some(salts) = salts {
        for (key, value) in salts {
            out.push_str(&format!("define('{}', '{}');\n", key, php_quote(value)));
        }
        out.push('\n');
    }

    out.push_str(&format!("$table_prefix = '{}';\n\n", settings.prefix));
    out.push_str("define('WP_DEBUG', false);\n\n");
    out.push_str("if ( !defined('ABSPATH') )\n\tdefine('ABSPATH', dirname(__FILE__) . '/');\n\n");
    out.push_str(&format!("require_once(ABSPATH . '{}');\n", HOST_SETTINGS_FILENAME));
    out
}

/// Escapes a value for a single-quoted literal.
fn php_quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// One 64-character key per salt constant. Each key is two v4 UUIDs drawn from
/// the OS random source, so nothing about the install predicts it.
fn generate_salts() -> Vec<(String, String)> {
    SALT_KEYS
        .iter()
        .map(|key| {
            let mut bytes = Vec::with_capacity(32);
            bytes.extend_from_slice(Uuid::new_v4().as_bytes());
            bytes.extend_from_slice(Uuid::new_v4().as_bytes());
            (key.to_string(), hex::encode(bytes))
        })
        .collect()
}
