// src/core/early_invoke.rs

use crate::models::{CommandPath, starts_with_tokens};
use std::collections::BTreeMap;

/// Command-path prefixes that want to be dispatched at a named lifecycle
/// checkpoint instead of after the host has loaded.
#[derive(Debug, Clone, Default)]
pub struct EarlyInvokeRegistry {
    checkpoints: BTreeMap<String, Vec<CommandPath>>,
}

impl EarlyInvokeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `full_path` at `checkpoint`. The first token is the root
    /// placeholder and is dropped; an empty remainder matches every command.
    pub fn register(&mut self, checkpoint: &str, full_path: &CommandPath) {
        let prefix = CommandPath::new(full_path.tokens().iter().skip(1).cloned());
        log::debug!("Early invoke at '{}' registered for '{}'.", checkpoint, prefix);
        let paths = self.checkpoints.entry(checkpoint.to_string()).or_default();
        if !paths.contains(&prefix) {
            paths.push(prefix);
        }
    }

    /// True when `args` starts with any prefix registered at `checkpoint`.
    pub fn check<S: AsRef<str>>(&self, checkpoint: &str, args: &[S]) -> bool {
        self.checkpoints
            .get(checkpoint)
            .is_some_and(|paths| paths.iter().any(|prefix| starts_with_tokens(args, prefix.tokens())))
    }

    /// Prefixes registered at `checkpoint`.
    pub fn registered(&self, checkpoint: &str) -> &[CommandPath] {
        self.checkpoints.get(checkpoint).map(Vec::as_slice).unwrap_or_default()
    }
}
