//! # Command Tree
//!
//! An arena of command nodes. The root is a composite named after the binary;
//! composites own their children by name, leaves carry a usage synopsis and the
//! handler that runs them. Parents are plain back-references into the arena.

use crate::constants::ROOT_COMMAND;
use crate::core::runner::Invocation;
use crate::models::CommandPath;
use std::collections::BTreeMap;
use thiserror::Error;

/// Function run when a leaf command is dispatched.
pub type Handler = fn(&Invocation<'_>) -> anyhow::Result<()>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node {0:?} does not exist in this command tree.")]
    UnknownNode(NodeId),
    #[error("'{0}' is a leaf command and can not have subcommands.")]
    NotComposite(CommandPath),
    #[error("'{0}' is already registered.")]
    Duplicate(CommandPath),
}

/// Index of a node inside its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub enum NodeKind {
    Composite {
        children: BTreeMap<String, NodeId>,
    },
    Leaf {
        /// Argument synopsis, e.g. `<plugin>... [--activate]`.
        synopsis: String,
        handler: Handler,
    },
}

#[derive(Debug, Clone)]
pub struct CommandNode {
    pub name: String,
    pub aliases: Vec<String>,
    pub parent: Option<NodeId>,
    /// One-line description shown in listings.
    pub desc: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTree {
    /// Creates a tree holding only the root composite.
    pub fn new() -> Self {
        Self {
            nodes: vec![CommandNode {
                name: ROOT_COMMAND.to_string(),
                aliases: Vec::new(),
                parent: None,
                desc: String::new(),
                kind: NodeKind::Composite {
                    children: BTreeMap::new(),
                },
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&CommandNode> {
        self.nodes.get(id.0)
    }

    /// Adds a composite under `parent`. Adding a composite that already exists
    /// returns the existing node, so command families can be loaded repeatedly.
    pub fn add_composite(&mut self, parent: NodeId, name: &str, desc: &str) -> Result<NodeId, TreeError> {
        if let Some(existing) = self.child_named(parent, name)? {
            return match self.get(existing).map(|node| &node.kind) {
                Some(NodeKind::Composite { .. }) => Ok(existing),
                _ => Err(TreeError::Duplicate(self.full_path(existing))),
            };
        }
        self.insert(
            parent,
            name,
            desc,
            NodeKind::Composite {
                children: BTreeMap::new(),
            },
        )
    }

    /// Adds a leaf command under `parent`.
    pub fn add_leaf(
        &mut self,
        parent: NodeId,
        name: &str,
        desc: &str,
        synopsis: &str,
        handler: Handler,
    ) -> Result<NodeId, TreeError> {
        if let Some(existing) = self.child_named(parent, name)? {
            return Err(TreeError::Duplicate(self.full_path(existing)));
        }
        self.insert(
            parent,
            name,
            desc,
            NodeKind::Leaf {
                synopsis: synopsis.to_string(),
                handler,
            },
        )
    }

    /// Registers an alternative name for `node`.
    pub fn alias(&mut self, node: NodeId, alias: &str) -> Result<(), TreeError> {
        let entry = self.nodes.get_mut(node.0).ok_or(TreeError::UnknownNode(node))?;
        if !entry.aliases.iter().any(|a| a == alias) {
            entry.aliases.push(alias.to_string());
        }
        Ok(())
    }

    /// Finds the child of `node` matching `token`, by exact name first and then
    /// by alias.
    pub fn find_subcommand(&self, node: NodeId, token: &str) -> Option<NodeId> {
        let children = self.children_of(node)?;
        children.get(token).copied().or_else(|| {
            children.values().copied().find(|child| {
                self.get(*child)
                    .is_some_and(|c| c.aliases.iter().any(|a| a == token))
            })
        })
    }

    /// True when `node` is a composite with at least one child.
    pub fn has_subcommands(&self, node: NodeId) -> bool {
        self.children_of(node).is_some_and(|children| !children.is_empty())
    }

    pub fn is_composite(&self, node: NodeId) -> bool {
        self.children_of(node).is_some()
    }

    /// Children of `node` in name order. Empty for leaves.
    pub fn children(&self, node: NodeId) -> Vec<(&str, NodeId)> {
        self.children_of(node)
            .map(|children| children.iter().map(|(name, id)| (name.as_str(), *id)).collect())
            .unwrap_or_default()
    }

    /// The handler of a leaf node.
    pub fn handler(&self, node: NodeId) -> Option<Handler> {
        match self.get(node).map(|n| &n.kind) {
            Some(NodeKind::Leaf { handler, .. }) => Some(*handler),
            _ => None,
        }
    }

    /// Names from the root down to `node`, root placeholder included.
    pub fn full_path(&self, node: NodeId) -> CommandPath {
        let mut names = Vec::new();
        let mut current = self.get(node);
        while let Some(n) = current {
            names.push(n.name.clone());
            current = n.parent.and_then(|p| self.get(p));
        }
        names.reverse();
        CommandPath::new(names)
    }

    /// The usage synopsis of `node`. A leaf renders one line; a composite lists
    /// one line per descendant leaf.
    pub fn usage(&self, node: NodeId) -> String {
        let mut lines = Vec::new();
        self.collect_usage_lines(node, &mut lines);

        let mut out = String::new();
        for (i, line) in lines.iter().enumerate() {
            out.push_str(if i == 0 { "usage: " } else { "   or: " });
            out.push_str(line);
            out.push('\n');
        }

        if self.is_composite(node) {
            let path = self.full_path(node);
            let sub_path = path.tokens().get(1..).unwrap_or_default().join(" ");
            let hint = if sub_path.is_empty() {
                format!(t!("tree.usage.more_info"), path = "")
            } else {
                format!(t!("tree.usage.more_info"), path = format!("{} ", sub_path))
            };
            out.push('\n');
            out.push_str(&hint);
            out.push('\n');
        }
        out
    }

    fn collect_usage_lines(&self, node: NodeId, lines: &mut Vec<String>) {
        match self.get(node).map(|n| &n.kind) {
            Some(NodeKind::Leaf { synopsis, .. }) => {
                let line = format!("{} {}", self.full_path(node), synopsis);
                lines.push(line.trim_end().to_string());
            }
            Some(NodeKind::Composite { children }) => {
                for child in children.values() {
                    self.collect_usage_lines(*child, lines);
                }
            }
            None => {}
        }
    }

    fn children_of(&self, node: NodeId) -> Option<&BTreeMap<String, NodeId>> {
        match self.get(node).map(|n| &n.kind) {
            Some(NodeKind::Composite { children }) => Some(children),
            _ => None,
        }
    }

    fn child_named(&self, parent: NodeId, name: &str) -> Result<Option<NodeId>, TreeError> {
        match self.get(parent).map(|n| &n.kind) {
            Some(NodeKind::Composite { children }) => Ok(children.get(name).copied()),
            Some(NodeKind::Leaf { .. }) => Err(TreeError::NotComposite(self.full_path(parent))),
            None => Err(TreeError::UnknownNode(parent)),
        }
    }

    fn insert(&mut self, parent: NodeId, name: &str, desc: &str, kind: NodeKind) -> Result<NodeId, TreeError> {
        let id = NodeId(self.nodes.len());
        let Some(NodeKind::Composite { children }) = self.nodes.get_mut(parent.0).map(|n| &mut n.kind) else {
            return Err(TreeError::UnknownNode(parent));
        };
        children.insert(name.to_string(), id);
        self.nodes.push(CommandNode {
            name: name.to_string(),
            aliases: Vec::new(),
            parent: Some(parent),
            desc: desc.to_string(),
            kind,
        });
        log::trace!("Registered command '{}'.", self.full_path(id));
        Ok(id)
    }
}
