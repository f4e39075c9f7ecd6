// src/models.rs

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// --- ARGUMENT MODELS ---

/// The value carried by a `--flag`.
///
/// `--name` is `Switch(true)`, `--no-name` is `Switch(false)` and
/// `--name=value` is `Text("value")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    Switch(bool),
    Text(String),
}

impl FlagValue {
    /// Returns the textual value, or `None` for a bare switch.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Switch(_) => None,
        }
    }

    /// Interprets the value as a boolean. Textual values accept the usual spellings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Switch(b) => Some(*b),
            Self::Text(s) => match s.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" | "" => Some(false),
                _ => None,
            },
        }
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Switch(value)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Switch(b) => write!(f, "{}", b),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Named flags, ordered by name so output and comparisons are deterministic.
pub type Flags = BTreeMap<String, FlagValue>;

/// Positional tokens plus named flags, as seen after parsing.
///
/// Only the normalizer rewrites it; after normalization it is treated as immutable
/// for the remainder of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentVector {
    pub positional: Vec<String>,
    pub flags: Flags,
}

impl ArgumentVector {
    pub fn new<I, S>(positional: I, flags: Flags) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            positional: positional.into_iter().map(Into::into).collect(),
            flags,
        }
    }

    /// The first positional token, if any.
    pub fn first(&self) -> Option<&str> {
        self.positional.first().map(String::as_str)
    }

    /// Returns true if the positional tokens start with `prefix`.
    pub fn starts_with<S: AsRef<str>>(&self, prefix: &[S]) -> bool {
        starts_with_tokens(&self.positional, prefix)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }
}

/// Token-wise prefix comparison shared by the runner and the early-invoke registry.
pub fn starts_with_tokens<A: AsRef<str>, B: AsRef<str>>(tokens: &[A], prefix: &[B]) -> bool {
    prefix.len() <= tokens.len()
        && tokens
            .iter()
            .zip(prefix)
            .all(|(token, expected)| token.as_ref() == expected.as_ref())
}

// --- COMMAND PATHS ---

/// A sequence of command tokens such as `["plugin", "install"]`.
///
/// Comparisons are done token by token, never on the joined string, so a token
/// containing a space can not alias a two-token path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandPath(Vec<String>);

impl CommandPath {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, token: impl Into<String>) {
        self.0.push(token.into());
    }

    /// True if this path is exactly `tokens`.
    pub fn is<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        self.0.len() == tokens.len() && starts_with_tokens(&self.0, tokens)
    }
}

impl fmt::Display for CommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl FromStr for CommandPath {
    type Err = std::convert::Infallible;

    /// Splits a config key such as `"core config"` on whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.split_whitespace()))
    }
}

impl Serialize for CommandPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Per-command-path default flags, applied only when that exact path is dispatched.
pub type ExtraConfig = BTreeMap<CommandPath, Flags>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_path_parses_and_displays() {
        let path: CommandPath = "  plugin   install ".parse().unwrap();
        assert_eq!(path.tokens(), &["plugin".to_string(), "install".to_string()]);
        assert_eq!(path.to_string(), "plugin install");
        assert!(path.is(&["plugin", "install"]));
        assert!(!path.is(&["plugin"]));
    }

    #[test]
    fn test_token_prefix_does_not_match_joined_strings() {
        let tokens = vec!["plugin install".to_string()];
        assert!(!starts_with_tokens(&tokens, &["plugin", "install"]));
        assert!(starts_with_tokens(&tokens, &["plugin install"]));
        assert!(starts_with_tokens(&tokens, &[] as &[&str]));
    }

    #[test]
    fn test_flag_value_bool_spellings() {
        assert_eq!(FlagValue::from("yes").as_bool(), Some(true));
        assert_eq!(FlagValue::from("0").as_bool(), Some(false));
        assert_eq!(FlagValue::from("maybe").as_bool(), None);
        assert_eq!(FlagValue::Switch(true).as_text(), None);
    }
}
