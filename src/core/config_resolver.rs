//! # Config Resolver
//!
//! Folds the layers produced by the loader into a single typed configuration.
//! Layers are applied from lowest to highest precedence; how a later value
//! combines with an earlier one is decided per option by the schema.
//!
//! Per-command defaults are collected separately and never leak into the merged
//! options: they only apply once a command path is dispatched.

use crate::core::config_loader::ConfigLayer;
use crate::core::config_schema::{self, LayerValues, OptionValue};
use crate::models::{CommandPath, ExtraConfig, FlagValue};
use serde::Serialize;
use std::path::PathBuf;

/// How output should be colorized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Colorize only when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn from_value(value: &FlagValue) -> Option<Self> {
        if value.as_text().is_some_and(|s| s.eq_ignore_ascii_case("auto")) {
            return Some(Self::Auto);
        }
        value
            .as_bool()
            .map(|on| if on { Self::Always } else { Self::Never })
    }

    /// Resolves `Auto` against whether the output stream is a terminal.
    pub fn enabled(self, is_terminal: bool) -> bool {
        match self {
            Self::Auto => is_terminal,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// The final, typed view of every option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedConfig {
    pub path: Option<PathBuf>,
    /// Kept untyped so that a bare `--url` can be reported when it is used.
    pub url: Option<FlagValue>,
    pub blog: Option<FlagValue>,
    pub config: Option<PathBuf>,
    pub user: Option<String>,
    pub require: Vec<PathBuf>,
    pub disabled_commands: Vec<CommandPath>,
    pub color: ColorMode,
    pub debug: bool,
    pub quiet: bool,
    /// Config files that contributed a layer, lowest precedence first.
    pub loaded_files: Vec<PathBuf>,
}

/// Everything the merge produces.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadResult {
    pub config: MergedConfig,
    pub extra: ExtraConfig,
    /// Ignored or suspicious values, meant to be shown to the user.
    pub warnings: Vec<String>,
}

/// Merges `layers` by precedence. The order of the slice does not matter.
pub fn merge(layers: &[ConfigLayer]) -> ConfigLoadResult {
    let mut ordered: Vec<&ConfigLayer> = layers.iter().collect();
    ordered.sort_by_key(|layer| layer.source);

    let mut values = LayerValues::new();
    let mut result = ConfigLoadResult::default();

    for layer in ordered {
        log::debug!(
            "Merging {:?} layer ({} options, {} command tables).",
            layer.source,
            layer.values.len(),
            layer.extra.len()
        );
        for (name, incoming) in &layer.values {
            let Some(spec) = config_schema::find_option(name) else {
                continue;
            };
            match values.get_mut(name) {
                Some(current) => current.merge(incoming.clone(), spec.policy),
                None => {
                    values.insert(spec.name, incoming.clone());
                }
            }
        }
        for (command, flags) in &layer.extra {
            result
                .extra
                .entry(command.clone())
                .or_default()
                .extend(flags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(origin) = &layer.origin {
            result.config.loaded_files.push(origin.clone());
        }
        result.warnings.extend(layer.warnings.iter().cloned());
    }

    apply_values(&values, &mut result);
    result
}

/// Converts the untyped merged values into `MergedConfig` fields.
fn apply_values(values: &LayerValues, result: &mut ConfigLoadResult) {
    let config = &mut result.config;
    let warnings = &mut result.warnings;

    let mut invalid = |option: &str, value: &dyn std::fmt::Display| {
        warnings.push(format!(
            t!("config.warning.ignored_value"),
            option = option,
            value = value
        ));
    };

    for (name, value) in values {
        match (*name, value) {
            ("url", OptionValue::Single(v)) => config.url = Some(v.clone()),
            ("blog", OptionValue::Single(v)) => config.blog = Some(v.clone()),
            ("path" | "config" | "user", OptionValue::Single(v)) => match v.as_text() {
                Some(text) if !text.is_empty() => match *name {
                    "path" => config.path = Some(PathBuf::from(text)),
                    "config" => config.config = Some(PathBuf::from(text)),
                    _ => config.user = Some(text.to_string()),
                },
                _ => invalid(name, v),
            },
            ("color", OptionValue::Single(v)) => match ColorMode::from_value(v) {
                Some(mode) => config.color = mode,
                None => invalid(name, v),
            },
            ("debug" | "quiet", OptionValue::Single(v)) => match v.as_bool() {
                Some(on) if *name == "debug" => config.debug = on,
                Some(on) => config.quiet = on,
                None => invalid(name, v),
            },
            ("require", OptionValue::List(items)) => {
                for item in items {
                    match item.as_text() {
                        Some(text) if !text.is_empty() => config.require.push(PathBuf::from(text)),
                        _ => invalid(name, item),
                    }
                }
            }
            ("disabled_commands", OptionValue::List(items)) => {
                for item in items {
                    match item.as_text() {
                        Some(text) => config
                            .disabled_commands
                            .push(CommandPath::new(text.split_whitespace())),
                        None => invalid(name, item),
                    }
                }
            }
            (other, value) => log::debug!("Option '{}' has an unexpected shape: {:?}", other, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_loader::ConfigSource;
    use crate::models::Flags;

    fn layer(source: ConfigSource, values: &[(&'static str, OptionValue)]) -> ConfigLayer {
        let mut layer = ConfigLayer::new(source);
        layer.values = values.iter().cloned().collect();
        layer
    }

    fn single(value: &str) -> OptionValue {
        OptionValue::Single(FlagValue::from(value))
    }

    #[test]
    fn test_precedence_follows_source_not_slice_order() {
        let layers = vec![
            layer(ConfigSource::Runtime, &[("url", single("cli.test"))]),
            layer(ConfigSource::GlobalFile, &[("url", single("global.test")), ("user", single("admin"))]),
            layer(ConfigSource::ProjectFile, &[("url", single("project.test"))]),
        ];
        let result = merge(&layers);
        assert_eq!(result.config.url, Some(FlagValue::from("cli.test")));
        assert_eq!(result.config.user.as_deref(), Some("admin"));
    }

    #[test]
    fn test_require_concatenates_across_layers() {
        let list = |items: &[&str]| OptionValue::List(items.iter().map(|s| FlagValue::from(*s)).collect());
        let layers = vec![
            layer(ConfigSource::GlobalFile, &[("require", list(&["/g.php"]))]),
            layer(ConfigSource::ProjectFile, &[("require", list(&["/p.php"]))]),
            layer(ConfigSource::Runtime, &[("require", list(&["/r1.php", "/r2.php"]))]),
        ];
        let result = merge(&layers);
        assert_eq!(
            result.config.require,
            vec![
                PathBuf::from("/g.php"),
                PathBuf::from("/p.php"),
                PathBuf::from("/r1.php"),
                PathBuf::from("/r2.php"),
            ]
        );
    }

    #[test]
    fn test_disabled_commands_are_overridden_not_concatenated() {
        let list = |items: &[&str]| OptionValue::List(items.iter().map(|s| FlagValue::from(*s)).collect());
        let layers = vec![
            layer(ConfigSource::GlobalFile, &[("disabled_commands", list(&["db drop"]))]),
            layer(ConfigSource::ProjectFile, &[("disabled_commands", list(&["plugin install"]))]),
        ];
        let result = merge(&layers);
        assert_eq!(
            result.config.disabled_commands,
            vec![CommandPath::new(["plugin", "install"])]
        );
    }

    #[test]
    fn test_typed_values_and_warnings() {
        let layers = vec![
            layer(
                ConfigSource::Environment,
                &[("color", single("maybe")), ("debug", single("1")), ("quiet", single("off"))],
            ),
            layer(
                ConfigSource::Runtime,
                &[("url", OptionValue::Single(FlagValue::Switch(true))), ("path", OptionValue::Single(FlagValue::Switch(true)))],
            ),
        ];
        let result = merge(&layers);
        assert_eq!(result.config.color, ColorMode::Auto);
        assert!(result.config.debug);
        assert!(!result.config.quiet);
        // A bare --url is kept for the runner to report; a bare --path is dropped here.
        assert_eq!(result.config.url, Some(FlagValue::Switch(true)));
        assert_eq!(result.config.path, None);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_extra_config_overlays_per_flag() {
        let path = CommandPath::new(["core", "config"]);
        let mut global = ConfigLayer::new(ConfigSource::GlobalFile);
        global.extra.insert(
            path.clone(),
            Flags::from([
                ("dbuser".to_string(), FlagValue::from("root")),
                ("dbhost".to_string(), FlagValue::from("db")),
            ]),
        );
        let mut project = ConfigLayer::new(ConfigSource::ProjectFile);
        project
            .extra
            .insert(path.clone(), Flags::from([("dbuser".to_string(), FlagValue::from("site"))]));

        let result = merge(&[project, global]);
        let flags = result.extra.get(&path).unwrap();
        assert_eq!(flags.get("dbuser"), Some(&FlagValue::from("site")));
        assert_eq!(flags.get("dbhost"), Some(&FlagValue::from("db")));
        assert_eq!(result.config, MergedConfig::default());
    }

    #[test]
    fn test_color_mode_resolution() {
        assert!(ColorMode::Auto.enabled(true));
        assert!(!ColorMode::Auto.enabled(false));
        assert!(ColorMode::Always.enabled(false));
        assert_eq!(ColorMode::from_value(&FlagValue::Switch(false)), Some(ColorMode::Never));
        assert_eq!(ColorMode::from_value(&FlagValue::from("AUTO")), Some(ColorMode::Auto));
    }
}
