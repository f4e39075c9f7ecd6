//! # Argument Normalizer
//!
//! Transparently converts legacy spellings into their canonical form before any
//! command lookup happens. Every rule looks only at positional tokens and at the
//! presence of flags. Rules run in table order; later rules rely on the tokens
//! produced by earlier ones (the help promotion must see aliased names, the meta
//! command promotion must see that `--help` already produced a positional token).

use crate::models::{ArgumentVector, FlagValue};

/// A single rewrite rule and the name it is logged under.
struct Conversion {
    name: &'static str,
    apply: fn(&mut ArgumentVector),
}

/// The ordered rule table.
static CONVERSIONS: &[Conversion] = &[
    Conversion {
        name: "top-level-alias",
        apply: top_level_aliases,
    },
    Conversion {
        name: "core-admin-name",
        apply: core_admin_name,
    },
    Conversion {
        name: "site-site-id",
        apply: site_site_id,
    },
    Conversion {
        name: "update-all",
        apply: update_all,
    },
    Conversion {
        name: "plugin-scaffold",
        apply: plugin_scaffold,
    },
    Conversion {
        name: "help-flag",
        apply: help_flag,
    },
    Conversion {
        name: "list-ids",
        apply: list_ids,
    },
    Conversion {
        name: "json-format",
        apply: json_format,
    },
    Conversion {
        name: "meta-flags",
        apply: meta_flags,
    },
];

const TOP_LEVEL_ALIASES: &[(&str, &str)] = &[("sql", "db"), ("blog", "site")];

const META_FLAGS: &[&str] = &["version", "info", "completions"];

/// Applies every back-compat conversion, in order.
pub fn normalize(mut args: ArgumentVector) -> ArgumentVector {
    for conversion in CONVERSIONS {
        let before = log::log_enabled!(log::Level::Trace).then(|| args.clone());
        (conversion.apply)(&mut args);
        if let Some(before) = before
            && before != args
        {
            log::trace!("Back-compat conversion '{}' applied: {:?}", conversion.name, args);
        }
    }
    args
}

fn leading_is(args: &ArgumentVector, candidates: &[&str]) -> bool {
    args.first().is_some_and(|first| candidates.contains(&first))
}

fn second_is(args: &ArgumentVector, expected: &str) -> bool {
    args.positional.get(1).is_some_and(|second| second == expected)
}

/// Moves a flag's value onto another name.
fn rename_flag(args: &mut ArgumentVector, from: &str, to: &str) {
    if let Some(value) = args.flags.remove(from) {
        args.flags.insert(to.to_string(), value);
    }
}

// sql -> db, blog -> site
fn top_level_aliases(args: &mut ArgumentVector) {
    if let Some(first) = args.positional.first_mut()
        && let Some((_, new)) = TOP_LEVEL_ALIASES.iter().find(|(old, _)| old == first)
    {
        *first = (*new).to_string();
    }
}

// core (multisite-)install --admin_name=  ->  --admin_user=
fn core_admin_name(args: &mut ArgumentVector) {
    if leading_is(args, &["core"]) {
        rename_flag(args, "admin_name", "admin_user");
    }
}

// site --site_id=  ->  site --network_id=
fn site_site_id(args: &mut ArgumentVector) {
    if leading_is(args, &["site"]) {
        rename_flag(args, "site_id", "network_id");
    }
}

// {plugin|theme} update-all  ->  {plugin|theme} update --all
fn update_all(args: &mut ArgumentVector) {
    if leading_is(args, &["plugin", "theme"]) && second_is(args, "update-all") {
        if let Some(second) = args.positional.get_mut(1) {
            *second = "update".to_string();
        }
        args.flags.insert("all".to_string(), FlagValue::Switch(true));
    }
}

// plugin scaffold  ->  scaffold plugin
fn plugin_scaffold(args: &mut ArgumentVector) {
    if args.starts_with(&["plugin", "scaffold"]) {
        args.positional.swap(0, 1);
    }
}

// foo --help  ->  help foo.  `--no-help` is dropped without promoting.
fn help_flag(args: &mut ArgumentVector) {
    if let Some(value) = args.flags.remove("help")
        && value.as_bool() != Some(false)
    {
        args.positional.insert(0, "help".to_string());
    }
}

// {post|user} list --ids  ->  {post|user} list --format=ids
fn list_ids(args: &mut ArgumentVector) {
    if leading_is(args, &["post", "user"])
        && second_is(args, "list")
        && args.flags.remove("ids").is_some()
    {
        args.flags
            .insert("format".to_string(), FlagValue::Text("ids".to_string()));
    }
}

// --json  ->  --format=json
fn json_format(args: &mut ArgumentVector) {
    if args.flags.remove("json").is_some() {
        args.flags
            .insert("format".to_string(), FlagValue::Text("json".to_string()));
    }
}

// --{version|info|completions}  ->  cli {version|info|completions}
fn meta_flags(args: &mut ArgumentVector) {
    if !args.positional.is_empty() {
        return;
    }
    if let Some(key) = META_FLAGS.iter().find(|key| args.has_flag(key)) {
        args.flags.remove(*key);
        args.positional = vec!["cli".to_string(), (*key).to_string()];
    }
}
