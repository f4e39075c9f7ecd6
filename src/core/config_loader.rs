//! # Config Loader
//!
//! Discovers and reads every configuration layer: the global file, the project
//! file found by walking upward from the working directory, the process
//! environment and the reserved runtime flags. Each source becomes one
//! [`ConfigLayer`]; combining them is the resolver's job.
//!
//! A source that can not be read or parsed is never fatal. It is logged at debug
//! level and skipped, and the remaining layers still apply.

use crate::constants::{GLOBAL_CONFIG_DIR, GLOBAL_CONFIG_ENV, GLOBAL_CONFIG_FILENAME, PROJECT_CONFIG_FILENAMES};
use crate::core::config_schema::{self, LayerValues, OptionKind, OptionSpec, OptionValue};
use crate::core::paths;
use crate::models::{CommandPath, ExtraConfig, FlagValue, Flags};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Table holding per-command defaults inside a config file.
const COMMANDS_TABLE: &str = "commands";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not read config file '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Error parsing TOML in '{path}': {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Where a layer came from. The derived order is the precedence order: later
/// variants override earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    GlobalFile,
    ProjectFile,
    Environment,
    Runtime,
}

/// The option values and per-command defaults contributed by one source.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: ConfigSource,
    /// The file this layer was read from, for file sources.
    pub origin: Option<PathBuf>,
    pub values: LayerValues,
    pub extra: ExtraConfig,
    /// Values that were present but ignored, in user-facing form.
    pub warnings: Vec<String>,
}

impl ConfigLayer {
    pub fn new(source: ConfigSource) -> Self {
        Self {
            source,
            origin: None,
            values: LayerValues::new(),
            extra: ExtraConfig::new(),
            warnings: Vec::new(),
        }
    }

    /// The layer built from the reserved command-line flags.
    pub fn runtime(values: LayerValues) -> Self {
        Self {
            values,
            ..Self::new(ConfigSource::Runtime)
        }
    }
}

/// Finds and reads config sources relative to a working directory.
#[derive(Debug)]
pub struct ConfigLoader<'a> {
    cwd: &'a Path,
    env: BTreeMap<String, String>,
    home: Option<PathBuf>,
}

impl<'a> ConfigLoader<'a> {
    /// Creates a loader for `cwd`. The environment is passed in rather than read
    /// from the process so that callers decide what the loader sees.
    pub fn new<I>(cwd: &'a Path, env: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            cwd,
            env: env.into_iter().collect(),
            home: dirs::home_dir(),
        }
    }

    /// Overrides the home directory used for the default global config path.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Reads every available layer. `runtime` holds the reserved flags already
    /// split off the command line; its `--config` value picks the global file.
    pub fn load(&self, runtime: &LayerValues) -> Vec<ConfigLayer> {
        let mut layers = Vec::with_capacity(4);

        let explicit = match runtime.get("config") {
            Some(OptionValue::Single(FlagValue::Text(path))) => Some(path.as_str()),
            _ => None,
        };
        if let Some(path) = self.global_config_path(explicit) {
            layers.extend(read_file_layer(ConfigSource::GlobalFile, &path));
        }
        if let Some(path) = self.project_config_path() {
            layers.extend(read_file_layer(ConfigSource::ProjectFile, &path));
        }
        layers.push(self.environment_layer());
        layers.push(ConfigLayer::runtime(runtime.clone()));
        layers
    }

    /// The global config file: the explicit path, else the env override, else
    /// `~/.wp-cli/config.toml`. Only returned if it exists as a file.
    pub fn global_config_path(&self, explicit: Option<&str>) -> Option<PathBuf> {
        let candidate = match explicit.or_else(|| self.env.get(GLOBAL_CONFIG_ENV).map(String::as_str)) {
            Some(raw) if !raw.is_empty() => paths::expand_relative(self.cwd, raw),
            _ => self.home.as_ref()?.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILENAME),
        };
        if candidate.is_file() {
            Some(candidate)
        } else {
            log::debug!("No global config at '{}'.", candidate.display());
            None
        }
    }

    /// The nearest project config file at or above the working directory,
    /// without crossing from one host install into an enclosing one.
    pub fn project_config_path(&self) -> Option<PathBuf> {
        paths::find_file_upward(self.cwd, PROJECT_CONFIG_FILENAMES, paths::install_boundary())
    }

    /// Builds the environment layer from the `WP_CLI_*` variables in the schema.
    pub fn environment_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::new(ConfigSource::Environment);
        for spec in config_schema::OPTIONS {
            let Some(raw) = spec.env.and_then(|var| self.env.get(var)) else {
                continue;
            };
            log::trace!("Option '{}' taken from the environment.", spec.name);
            layer
                .values
                .insert(spec.name, OptionValue::for_spec(spec, FlagValue::Text(raw.clone())));
        }
        layer
    }
}

/// Reads one config file into a layer. Failures are logged and yield `None`.
fn read_file_layer(source: ConfigSource, path: &Path) -> Option<ConfigLayer> {
    match parse_config_file(source, path) {
        Ok(layer) => {
            log::debug!("Loaded {:?} config from '{}'.", source, path.display());
            Some(layer)
        }
        Err(e) => {
            log::debug!("Skipping config source: {}", e);
            None
        }
    }
}

/// Parses a TOML config file. Relative paths inside it are anchored at the
/// file's own directory.
pub fn parse_config_file(source: ConfigSource, path: &Path) -> Result<ConfigLayer, LoadError> {
    let content = fs::read_to_string(path).map_err(|e| LoadError::Unreadable {
        path: path.display().to_string(),
        source: e,
    })?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| LoadError::TomlParse {
        path: path.display().to_string(),
        source: e,
    })?;

    let base = path.parent().unwrap_or(Path::new("."));
    let mut layer = ConfigLayer::new(source);
    layer.origin = Some(path.to_path_buf());

    for (key, value) in table {
        if key == COMMANDS_TABLE {
            read_command_defaults(value, path, &mut layer);
            continue;
        }
        let Some(spec) = config_schema::find_option(&key).filter(|spec| spec.file) else {
            layer.warnings.push(format!(
                t!("config.warning.unknown_option"),
                option = key,
                path = path.display()
            ));
            continue;
        };
        match option_value(spec, value, base) {
            Some(parsed) => {
                layer.values.insert(spec.name, parsed);
            }
            None => layer.warnings.push(format!(
                t!("config.warning.invalid_value"),
                option = spec.name,
                path = path.display()
            )),
        }
    }
    Ok(layer)
}

/// Converts a TOML value into an option value of the option's kind.
fn option_value(spec: &OptionSpec, value: toml::Value, base: &Path) -> Option<OptionValue> {
    use toml::Value;

    let anchored = |raw: &str| FlagValue::Text(paths::expand_relative(base, raw).display().to_string());

    match (spec.kind, value) {
        (OptionKind::Flag | OptionKind::Color, Value::Boolean(b)) => {
            Some(OptionValue::Single(FlagValue::Switch(b)))
        }
        (OptionKind::Flag | OptionKind::Color, Value::String(s)) => {
            Some(OptionValue::Single(FlagValue::Text(s)))
        }
        (OptionKind::Path, Value::String(s)) => Some(OptionValue::Single(anchored(&s))),
        (OptionKind::Text | OptionKind::Endpoint, Value::String(s)) => {
            Some(OptionValue::Single(FlagValue::Text(s)))
        }
        (OptionKind::Text, Value::Integer(n)) => {
            Some(OptionValue::Single(FlagValue::Text(n.to_string())))
        }
        (OptionKind::PathList, Value::String(s)) => Some(OptionValue::List(vec![anchored(&s)])),
        (OptionKind::PathList, Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(anchored))
            .collect::<Option<Vec<_>>>()
            .map(OptionValue::List),
        (OptionKind::CommandList, Value::String(s)) => {
            Some(OptionValue::List(vec![FlagValue::Text(s)]))
        }
        (OptionKind::CommandList, Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(FlagValue::from))
            .collect::<Option<Vec<_>>>()
            .map(OptionValue::List),
        _ => None,
    }
}

/// Reads `[commands."<path>"]` tables into the layer's extra config.
fn read_command_defaults(value: toml::Value, path: &Path, layer: &mut ConfigLayer) {
    let toml::Value::Table(commands) = value else {
        layer.warnings.push(format!(
            t!("config.warning.invalid_value"),
            option = COMMANDS_TABLE,
            path = path.display()
        ));
        return;
    };

    for (name, defaults) in commands {
        let command = CommandPath::new(name.split_whitespace());
        let toml::Value::Table(defaults) = defaults else {
            layer.warnings.push(format!(
                t!("config.warning.invalid_value"),
                option = format!("{}.{}", COMMANDS_TABLE, name),
                path = path.display()
            ));
            continue;
        };

        let mut flags = Flags::new();
        for (flag, value) in defaults {
            match command_flag_value(value) {
                Some(v) => {
                    flags.insert(flag, v);
                }
                None => layer.warnings.push(format!(
                    t!("config.warning.invalid_value"),
                    option = format!("{}.{}", name, flag),
                    path = path.display()
                )),
            }
        }
        layer.extra.insert(command, flags);
    }
}

fn command_flag_value(value: toml::Value) -> Option<FlagValue> {
    use toml::Value;
    match value {
        Value::Boolean(b) => Some(FlagValue::Switch(b)),
        Value::String(s) => Some(FlagValue::Text(s)),
        Value::Integer(n) => Some(FlagValue::Text(n.to_string())),
        Value::Float(f) => Some(FlagValue::Text(f.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HOST_LOAD_FILENAME;
    use std::fs;
    use tempfile::tempdir;

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn test_parse_file_anchors_relative_paths() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("wp-cli.toml");
        fs::write(
            &file,
            r#"
path = "web/wp"
url = "example.test"
require = ["a.php", "/abs/b.php"]
disabled_commands = ["db drop"]
quiet = true

[commands."core config"]
dbuser = "root"
dbpass = 1234
"#,
        )
        .unwrap();

        let layer = parse_config_file(ConfigSource::ProjectFile, &file).unwrap();
        let expected_path = dir.path().join("web/wp").display().to_string();
        assert_eq!(
            layer.values.get("path"),
            Some(&OptionValue::Single(FlagValue::Text(expected_path)))
        );
        assert_eq!(
            layer.values.get("require"),
            Some(&OptionValue::List(vec![
                FlagValue::Text(dir.path().join("a.php").display().to_string()),
                FlagValue::from("/abs/b.php"),
            ]))
        );
        assert_eq!(
            layer.values.get("quiet"),
            Some(&OptionValue::Single(FlagValue::Switch(true)))
        );

        let defaults = layer.extra.get(&CommandPath::new(["core", "config"])).unwrap();
        assert_eq!(defaults.get("dbuser"), Some(&FlagValue::from("root")));
        assert_eq!(defaults.get("dbpass"), Some(&FlagValue::from("1234")));
        assert!(layer.warnings.is_empty());
    }

    #[test]
    fn test_unknown_and_mistyped_options_become_warnings() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("wp-cli.toml");
        fs::write(&file, "colour = true\nrequire = 42\nconfig = \"x.toml\"\n").unwrap();

        let layer = parse_config_file(ConfigSource::ProjectFile, &file).unwrap();
        assert!(layer.values.is_empty());
        assert_eq!(layer.warnings.len(), 3);
    }

    #[test]
    fn test_broken_file_is_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("wp-cli.toml"), "path = [unterminated").unwrap();

        let loader = ConfigLoader::new(dir.path(), no_env()).with_home(None);
        let layers = loader.load(&LayerValues::new());
        let sources: Vec<_> = layers.iter().map(|l| l.source).collect();
        assert_eq!(sources, vec![ConfigSource::Environment, ConfigSource::Runtime]);
    }

    #[test]
    fn test_nested_install_does_not_use_parent_project_config() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("sub");
        let cwd = nested.join("wp-content");
        fs::create_dir_all(&cwd).unwrap();
        fs::write(dir.path().join(HOST_LOAD_FILENAME), "").unwrap();
        fs::write(dir.path().join("wp-cli.toml"), "url = \"outer.test\"\n").unwrap();
        fs::write(nested.join(HOST_LOAD_FILENAME), "").unwrap();

        let loader = ConfigLoader::new(&cwd, no_env()).with_home(None);
        assert_eq!(loader.project_config_path(), None);

        // Without the nested install the parent's file is found.
        fs::remove_file(nested.join(HOST_LOAD_FILENAME)).unwrap();
        assert_eq!(loader.project_config_path(), Some(dir.path().join("wp-cli.toml")));
    }

    #[test]
    fn test_global_path_resolution_order() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("home");
        fs::create_dir_all(home.join(GLOBAL_CONFIG_DIR)).unwrap();
        fs::write(home.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILENAME), "").unwrap();
        fs::write(dir.path().join("env.toml"), "").unwrap();
        fs::write(dir.path().join("flag.toml"), "").unwrap();

        let env = vec![(GLOBAL_CONFIG_ENV.to_string(), "env.toml".to_string())];
        let loader = ConfigLoader::new(dir.path(), env).with_home(Some(home.clone()));
        assert_eq!(
            loader.global_config_path(Some("flag.toml")),
            Some(dir.path().join("flag.toml"))
        );
        assert_eq!(loader.global_config_path(None), Some(dir.path().join("env.toml")));

        let loader = ConfigLoader::new(dir.path(), no_env()).with_home(Some(home.clone()));
        assert_eq!(
            loader.global_config_path(None),
            Some(home.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILENAME))
        );
        assert_eq!(loader.global_config_path(Some("missing.toml")), None);
    }

    #[test]
    fn test_environment_layer_reads_schema_variables() {
        let dir = tempdir().unwrap();
        let env = vec![
            ("WP_CLI_URL".to_string(), "env.test".to_string()),
            ("WP_CLI_QUIET".to_string(), "1".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        let layer = ConfigLoader::new(dir.path(), env).environment_layer();
        assert_eq!(layer.values.len(), 2);
        assert_eq!(
            layer.values.get("url"),
            Some(&OptionValue::Single(FlagValue::from("env.test")))
        );
    }
}
