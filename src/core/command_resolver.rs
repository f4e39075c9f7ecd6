// src/core/command_resolver.rs

use crate::core::command_tree::{CommandTree, NodeId};
use crate::models::CommandPath;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("'{path}' is not a registered wp command. See 'wp help'.")]
    Unknown { path: CommandPath },
    #[error("The '{path}' command has been disabled from the config file.")]
    Disabled { path: CommandPath },
}

impl ResolveError {
    /// The deepest path that was tried.
    pub fn path(&self) -> &CommandPath {
        match self {
            Self::Unknown { path } | Self::Disabled { path } => path,
        }
    }
}

/// The node reached by walking the tree plus everything left over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub node: NodeId,
    /// Tokens consumed on the way down, without the root placeholder.
    pub path: CommandPath,
    /// Positional tokens that were not consumed.
    pub args: Vec<String>,
}

/// Walks `tree` from `root`, consuming one token per level while the current
/// node still has children.
///
/// Aliases are honored through [`CommandTree::find_subcommand`], but the
/// recorded path keeps the tokens as typed, which is also what `disabled` is
/// compared against.
pub fn resolve<S: AsRef<str>>(
    tree: &CommandTree,
    root: NodeId,
    args: &[S],
    disabled: &[CommandPath],
) -> Result<ResolvedCommand, ResolveError> {
    let mut node = root;
    let mut path = CommandPath::default();
    let mut remaining = args.iter().map(AsRef::as_ref);
    let mut consumed = 0usize;

    while tree.has_subcommands(node) {
        let Some(token) = remaining.next() else {
            break;
        };
        consumed += 1;
        path.push(token);

        let Some(child) = tree.find_subcommand(node, token) else {
            return Err(ResolveError::Unknown { path });
        };
        if disabled.contains(&path) {
            return Err(ResolveError::Disabled { path });
        }
        node = child;
    }

    log::debug!("Resolved '{}' after consuming {} token(s).", path, consumed);
    Ok(ResolvedCommand {
        node,
        path,
        args: remaining.map(str::to_string).collect(),
    })
}
