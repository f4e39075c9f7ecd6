// src/cli/dispatcher.rs

use anyhow::Result;
use std::env;

use crate::{
    cli::handlers,
    constants::CHECKPOINT_BEFORE_HOST_LOAD,
    core::{
        command_tree::{CommandTree, Handler, NodeId, TreeError},
        early_invoke::EarlyInvokeRegistry,
        runner::Runner,
    },
    models::CommandPath,
    system::host::FsHost,
};

/// A command family: a composite node that only groups subcommands.
struct FamilyDefinition {
    path: &'static [&'static str],
    desc: &'static str,
    /// Checkpoint at which every command of the family may run early.
    early_invoke: Option<&'static str>,
}

/// A runnable command, its synopsis and its handler.
struct CommandDefinition {
    path: &'static [&'static str],
    aliases: &'static [&'static str],
    desc: &'static str,
    synopsis: &'static str,
    handler: Handler,
}

static FAMILY_REGISTRY: &[FamilyDefinition] = &[
    FamilyDefinition {
        path: &["cli"],
        desc: "Manage the command-line tool itself.",
        early_invoke: Some(CHECKPOINT_BEFORE_HOST_LOAD),
    },
    FamilyDefinition {
        path: &["core"],
        desc: "Download, install, update and otherwise manage the host install.",
        early_invoke: None,
    },
    FamilyDefinition {
        path: &["db"],
        desc: "Perform basic database operations.",
        early_invoke: None,
    },
    FamilyDefinition {
        path: &["plugin"],
        desc: "Manage plugins.",
        early_invoke: None,
    },
    FamilyDefinition {
        path: &["theme"],
        desc: "Manage themes.",
        early_invoke: None,
    },
    FamilyDefinition {
        path: &["post"],
        desc: "Manage posts.",
        early_invoke: None,
    },
    FamilyDefinition {
        path: &["user"],
        desc: "Manage users.",
        early_invoke: None,
    },
    FamilyDefinition {
        path: &["site"],
        desc: "Perform site-wide operations.",
        early_invoke: None,
    },
    FamilyDefinition {
        path: &["scaffold"],
        desc: "Generate code for post types, taxonomies and plugins.",
        early_invoke: None,
    },
];

/// The single source of truth for all bundled commands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        path: &["help"],
        aliases: &[],
        desc: "Get help on a command.",
        synopsis: "[<command>...]",
        handler: handlers::help::handle,
    },
    CommandDefinition {
        path: &["cli", "version"],
        aliases: &[],
        desc: "Print the version.",
        synopsis: "",
        handler: handlers::meta::version,
    },
    CommandDefinition {
        path: &["cli", "info"],
        aliases: &[],
        desc: "Print information about the environment.",
        synopsis: "[--format=<format>]",
        handler: handlers::meta::info,
    },
    CommandDefinition {
        path: &["cli", "completions"],
        aliases: &[],
        desc: "Generate tab completion strings.",
        synopsis: "--line=<line>",
        handler: handlers::meta::completions,
    },
    CommandDefinition {
        path: &["cli", "param-dump"],
        aliases: &[],
        desc: "Dump the list of global parameters, as JSON.",
        synopsis: "",
        handler: handlers::meta::param_dump,
    },
    CommandDefinition {
        path: &["core", "config"],
        aliases: &[],
        desc: "Generate a wp-config.php file.",
        synopsis: "--dbname=<dbname> --dbuser=<dbuser> [--dbpass=<dbpass>] [--dbhost=<dbhost>] [--dbprefix=<dbprefix>] [--skip-salts] [--force]",
        handler: handlers::wp_core::config,
    },
    CommandDefinition {
        path: &["core", "version"],
        aliases: &[],
        desc: "Display the host version.",
        synopsis: "",
        handler: handlers::wp_core::version,
    },
    CommandDefinition {
        path: &["core", "install"],
        aliases: &[],
        desc: "Create the host tables in the database.",
        synopsis: "--url=<url> --title=<site-title> --admin_user=<username> --admin_password=<password> --admin_email=<email>",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["core", "multisite-install"],
        aliases: &[],
        desc: "Install a multisite network.",
        synopsis: "[--url=<url>] [--base=<url-path>] --title=<network-title> --admin_user=<username> --admin_password=<password> --admin_email=<email>",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["db", "query"],
        aliases: &[],
        desc: "Execute a query against the database.",
        synopsis: "[<sql>]",
        handler: handlers::db::query,
    },
    CommandDefinition {
        path: &["db", "cli"],
        aliases: &["console"],
        desc: "Open a mysql console using the host credentials.",
        synopsis: "",
        handler: handlers::db::cli,
    },
    CommandDefinition {
        path: &["plugin", "list"],
        aliases: &[],
        desc: "Get a list of plugins.",
        synopsis: "[--format=<format>] [--fields=<fields>]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["plugin", "install"],
        aliases: &[],
        desc: "Install a plugin.",
        synopsis: "<plugin|zip|url>... [--version=<version>] [--force] [--activate]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["plugin", "activate"],
        aliases: &[],
        desc: "Activate a plugin.",
        synopsis: "<plugin>... [--network]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["plugin", "deactivate"],
        aliases: &[],
        desc: "Deactivate a plugin.",
        synopsis: "<plugin>... [--network]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["plugin", "update"],
        aliases: &[],
        desc: "Update one or more plugins.",
        synopsis: "[<plugin>...] [--all] [--version=<version>]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["theme", "list"],
        aliases: &[],
        desc: "Get a list of themes.",
        synopsis: "[--format=<format>] [--fields=<fields>]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["theme", "install"],
        aliases: &[],
        desc: "Install a theme.",
        synopsis: "<theme|zip|url>... [--version=<version>] [--force] [--activate]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["theme", "activate"],
        aliases: &[],
        desc: "Activate a theme.",
        synopsis: "<theme>",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["theme", "update"],
        aliases: &[],
        desc: "Update one or more themes.",
        synopsis: "[<theme>...] [--all] [--version=<version>]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["post", "list"],
        aliases: &[],
        desc: "Get a list of posts.",
        synopsis: "[--<field>=<value>] [--format=<format>] [--fields=<fields>]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["user", "list"],
        aliases: &[],
        desc: "List users.",
        synopsis: "[--role=<role>] [--format=<format>] [--fields=<fields>]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["site", "list"],
        aliases: &[],
        desc: "List all sites in a multisite install.",
        synopsis: "[--network_id=<id>] [--format=<format>] [--fields=<fields>]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["site", "create"],
        aliases: &[],
        desc: "Create a site in a multisite install.",
        synopsis: "--slug=<slug> [--title=<title>] [--email=<email>] [--network_id=<network-id>]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["scaffold", "plugin"],
        aliases: &[],
        desc: "Generate starter code for a plugin.",
        synopsis: "<slug> [--plugin_name=<title>] [--activate]",
        handler: handlers::forward::handle,
    },
    CommandDefinition {
        path: &["import"],
        aliases: &[],
        desc: "Import content from a WXR file.",
        synopsis: "<file>... --authors=<authors> [--skip=<data-type>]",
        handler: handlers::forward::handle,
    },
];

/// Builds the bundled command tree and registers the early-invoke families.
pub fn build_command_tree() -> Result<(CommandTree, EarlyInvokeRegistry), TreeError> {
    let mut tree = CommandTree::new();
    let mut early_invoke = EarlyInvokeRegistry::new();

    for family in FAMILY_REGISTRY {
        let node = add_composite_path(&mut tree, family.path, family.desc)?;
        if let Some(checkpoint) = family.early_invoke {
            early_invoke.register(checkpoint, &tree.full_path(node));
        }
    }

    for command in COMMAND_REGISTRY {
        let Some((name, parents)) = command.path.split_last() else {
            continue;
        };
        let parent = add_composite_path(&mut tree, parents, "")?;
        let node = tree.add_leaf(parent, name, command.desc, command.synopsis, command.handler)?;
        for alias in command.aliases {
            tree.alias(node, alias)?;
        }
    }

    log::trace!(
        "Command tree ready; early invoke at '{}': {:?}",
        CHECKPOINT_BEFORE_HOST_LOAD,
        early_invoke.registered(CHECKPOINT_BEFORE_HOST_LOAD)
    );
    Ok((tree, early_invoke))
}

/// Walks `path` from the root, creating missing composites on the way.
fn add_composite_path(tree: &mut CommandTree, path: &[&str], desc: &str) -> Result<NodeId, TreeError> {
    let mut node = tree.root();
    for (i, name) in path.iter().enumerate() {
        let is_last = i + 1 == path.len();
        node = tree.add_composite(node, name, if is_last { desc } else { "" })?;
    }
    Ok(node)
}

/// The main application dispatcher: runs the whole lifecycle for `args` against
/// the install found from the current directory.
pub fn dispatch(args: Vec<String>) -> Result<()> {
    log::debug!("Dispatching args: {:?}", args);

    let cwd = env::current_dir()?;
    let (tree, early_invoke) = build_command_tree()?;
    let host = FsHost::new();

    let mut runner = Runner::new(&host, tree, early_invoke, args, cwd).with_env(env::vars());
    let outcome = runner.run()?;
    log::debug!("Run finished with {:?}", outcome);
    Ok(())
}

/// The full path of every bundled leaf, as typed after the binary name.
pub fn bundled_commands() -> Vec<CommandPath> {
    COMMAND_REGISTRY
        .iter()
        .map(|command| CommandPath::new(command.path.iter().copied()))
        .collect()
}
