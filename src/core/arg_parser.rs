// src/core/arg_parser.rs

use crate::core::config_schema::{self, LayerValues, OptionValue};
use crate::models::{ArgumentVector, FlagValue};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Flag '{0}' has an empty name.")]
    EmptyFlagName(String),
}

/// The command line split into what the command sees and what the bootstrap keeps.
#[derive(Debug, Clone, Default)]
pub struct ParsedArgs {
    /// Positional tokens and the flags destined for the command.
    pub args: ArgumentVector,
    /// Reserved bootstrap flags (`--path`, `--url`, `--require`, ...). These are
    /// merged as the highest-precedence config layer and never reach the command.
    pub runtime: LayerValues,
}

impl ParsedArgs {
    /// Parses raw CLI parameters (without the binary name).
    ///
    /// # Logic:
    /// - `--name=value` is a named argument carrying `value`.
    /// - `--name` is a bare switch, `--no-name` a negated switch.
    /// - Anything else, including single-dash tokens, is positional.
    /// - A flag whose name is a runtime option goes to the runtime bucket; a
    ///   repeated runtime flag follows the option's merge policy.
    pub fn new(cli_params: &[String]) -> Result<Self, ParseError> {
        let mut parsed = Self::default();

        for param in cli_params {
            let Some((name, value)) = split_flag(param)? else {
                parsed.args.positional.push(param.clone());
                continue;
            };

            match config_schema::runtime_option(name) {
                Some(spec) => {
                    log::trace!("Runtime flag '--{}' reserved for bootstrap.", name);
                    let incoming = OptionValue::for_spec(spec, value);
                    match parsed.runtime.get_mut(spec.name) {
                        Some(existing) => existing.merge(incoming, spec.policy),
                        None => {
                            parsed.runtime.insert(spec.name, incoming);
                        }
                    }
                }
                None => {
                    parsed.args.flags.insert(name.to_string(), value);
                }
            }
        }

        Ok(parsed)
    }

    /// Returns the single textual value of a runtime option, if given.
    pub fn runtime_text(&self, name: &str) -> Option<&str> {
        match self.runtime.get(name) {
            Some(OptionValue::Single(value)) => value.as_text(),
            _ => None,
        }
    }
}

/// Splits a `--flag` token into its name and value. Returns `Ok(None)` for tokens
/// that are not flags.
fn split_flag(param: &str) -> Result<Option<(&str, FlagValue)>, ParseError> {
    let Some(body) = param.strip_prefix("--") else {
        return Ok(None);
    };
    if body.is_empty() {
        // A lone `--` is kept as a positional token.
        return Ok(None);
    }

    let (name, value) = match body.split_once('=') {
        Some((name, value)) => (name, FlagValue::Text(value.to_string())),
        None => match body.strip_prefix("no-") {
            Some(negated) => (negated, FlagValue::Switch(false)),
            None => (body, FlagValue::Switch(true)),
        },
    };

    if name.is_empty() {
        return Err(ParseError::EmptyFlagName(param.to_string()));
    }
    Ok(Some((name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_cli_params(params: &[&str]) -> Vec<String> {
        params.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_splits_positional_flags_and_runtime() {
        let params = to_cli_params(&[
            "plugin",
            "install",
            "hello-dolly",
            "--activate",
            "--version=1.2",
            "--path=/srv/www",
            "--no-color",
        ]);
        let parsed = ParsedArgs::new(&params).unwrap();

        assert_eq!(parsed.args.positional, vec!["plugin", "install", "hello-dolly"]);
        assert_eq!(parsed.args.flags.get("activate"), Some(&FlagValue::Switch(true)));
        assert_eq!(parsed.args.flags.get("version"), Some(&FlagValue::from("1.2")));
        assert!(!parsed.args.has_flag("path"));
        assert!(!parsed.args.has_flag("color"));

        assert_eq!(parsed.runtime_text("path"), Some("/srv/www"));
        assert_eq!(
            parsed.runtime.get("color"),
            Some(&OptionValue::Single(FlagValue::Switch(false)))
        );
    }

    #[test]
    fn test_repeated_require_accumulates() {
        let params = to_cli_params(&["--require=a.php", "eval", "--require=b.php"]);
        let parsed = ParsedArgs::new(&params).unwrap();
        assert_eq!(
            parsed.runtime.get("require"),
            Some(&OptionValue::List(vec!["a.php".into(), "b.php".into()]))
        );
        assert_eq!(parsed.args.positional, vec!["eval"]);
    }

    #[test]
    fn test_single_dash_and_double_dash_are_positional() {
        let params = to_cli_params(&["eval", "-x", "--"]);
        let parsed = ParsedArgs::new(&params).unwrap();
        assert_eq!(parsed.args.positional, vec!["eval", "-x", "--"]);
        assert!(parsed.args.flags.is_empty());
    }

    #[test]
    fn test_value_may_contain_equals_and_be_empty() {
        let params = to_cli_params(&["--where=a=b", "--prefix="]);
        let parsed = ParsedArgs::new(&params).unwrap();
        assert_eq!(parsed.args.flags.get("where"), Some(&FlagValue::from("a=b")));
        assert_eq!(parsed.args.flags.get("prefix"), Some(&FlagValue::from("")));
    }

    #[test]
    fn test_empty_flag_name_is_rejected() {
        let params = to_cli_params(&["--=oops"]);
        assert_eq!(
            ParsedArgs::new(&params).unwrap_err(),
            ParseError::EmptyFlagName("--=oops".to_string())
        );
    }
}
