// src/cli/handlers/help.rs

use anyhow::Result;
use colored::Colorize;

use crate::core::{
    command_resolver,
    command_tree::{CommandTree, NodeId},
    runner::Invocation,
};

/// The handler for `help [<command>...]`.
pub fn handle(inv: &Invocation<'_>) -> Result<()> {
    if inv.args.is_empty() {
        inv.reporter.line(render_markup(t!("cli.help.template")));
        inv.reporter.line(format!("{}", t!("help.header.commands").bold()));
        for line in command_listing(inv.tree, inv.tree.root()) {
            inv.reporter.line(line);
        }
        inv.reporter.line("");
        inv.reporter.line(format!(t!("tree.usage.more_info"), path = ""));
        return Ok(());
    }

    let resolved = command_resolver::resolve(inv.tree, inv.tree.root(), inv.args, &[])?;
    inv.reporter.line(render_page(inv.tree, resolved.node));
    Ok(())
}

/// One `name  description` line per child of `node`.
fn command_listing(tree: &CommandTree, node: NodeId) -> Vec<String> {
    let children = tree.children(node);
    let width = children.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    children
        .into_iter()
        .map(|(name, id)| {
            let desc = tree.get(id).map(|n| n.desc.as_str()).unwrap_or("");
            format!("  {:<width$}  {}", name, desc, width = width)
                .trim_end()
                .to_string()
        })
        .collect()
}

/// The help page of a single node: name, description, synopsis and, for
/// families, the subcommand listing.
fn render_page(tree: &CommandTree, node: NodeId) -> String {
    let mut page = Vec::new();
    page.push(format!("{}", t!("help.header.name").bold()));
    page.push(format!("\n  {}\n", tree.full_path(node)));

    if let Some(desc) = tree.get(node).map(|n| n.desc.as_str()).filter(|d| !d.is_empty()) {
        page.push(format!("{}", t!("help.header.description").bold()));
        page.push(format!("\n  {}\n", desc));
    }

    page.push(format!("{}", t!("help.header.synopsis").bold()));
    page.push(String::new());
    page.push(tree.usage(node).trim_end().to_string());

    if tree.has_subcommands(node) {
        page.push(format!("\n{}\n", t!("help.header.subcommands").bold()));
        page.extend(command_listing(tree, node));
    }
    page.join("\n")
}

/// Replaces the semantic tags of a catalog template with terminal styles.
/// With colors disabled the tags simply disappear.
pub fn render_markup(template: &str) -> String {
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();

    let title = if use_colors { "\x1b[1;33m" } else { "" }; // Bold Yellow
    let hl = if use_colors { "\x1b[1;36m" } else { "" }; // Bold Cyan
    let cmd = if use_colors { "\x1b[36m" } else { "" }; // Cyan
    let dim = if use_colors { "\x1b[2m" } else { "" };
    let reset = if use_colors { "\x1b[0m" } else { "" };

    template
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<hl>", hl)
        .replace("</hl>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &Invocation<'_>) -> Result<()> {
        Ok(())
    }

    fn tree() -> CommandTree {
        let mut tree = CommandTree::new();
        let root = tree.root();
        let plugin = tree.add_composite(root, "plugin", "Manage plugins.").unwrap();
        tree.add_leaf(plugin, "install", "Install a plugin.", "<plugin>...", noop)
            .unwrap();
        tree.add_leaf(plugin, "list", "", "[--format=<format>]", noop).unwrap();
        tree
    }

    #[test]
    fn test_render_markup_strips_tags_without_colors() {
        colored::control::set_override(false);
        assert_eq!(
            render_markup("<title>USAGE</title> <cmd>wp <command></cmd>"),
            "USAGE wp <command>"
        );
    }

    #[test]
    fn test_family_page_lists_subcommands() {
        colored::control::set_override(false);
        let tree = tree();
        let plugin = tree.find_subcommand(tree.root(), "plugin").unwrap();
        let page = render_page(&tree, plugin);
        assert!(page.contains("  wp plugin\n"));
        assert!(page.contains("Manage plugins."));
        assert!(page.contains("usage: wp plugin install <plugin>..."));
        assert!(page.contains("  install  Install a plugin."));
        assert!(page.lines().any(|l| l == "  list"));
    }

    #[test]
    fn test_leaf_page_has_no_subcommand_section() {
        colored::control::set_override(false);
        let tree = tree();
        let plugin = tree.find_subcommand(tree.root(), "plugin").unwrap();
        let list = tree.find_subcommand(plugin, "list").unwrap();
        let page = render_page(&tree, list);
        assert!(page.ends_with("usage: wp plugin list [--format=<format>]"));
        assert!(!page.contains(t!("help.header.description")));
    }
}
