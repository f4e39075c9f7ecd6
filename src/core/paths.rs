// src/core/paths.rs

use crate::constants::{ENTRY_FILENAME, HOST_CONFIG_FILENAME, HOST_LOAD_FILENAME, HOST_SETTINGS_FILENAME};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    // `require( dirname( __FILE__ ) . '/wp/wp-blog-header.php' );`
    static ref BLOG_HEADER_REQUIRE: Regex =
        Regex::new(r#"(?m)^\s*require.+(['"])(.*wp-blog-header\.php)['"]"#)
            .expect("blog header pattern is valid");
}

/// Expands a leading `~` and anchors relative results at `base`.
pub fn expand_relative(base: &Path, raw: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw).as_ref());
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Walks from `start` towards the filesystem root and returns the first existing
/// file named in `names`. Within a directory, `names` are tried in order.
///
/// `stop` is consulted for every directory before its files are examined; once
/// it returns true the search gives up and nothing is found.
pub fn find_file_upward<F>(start: &Path, names: &[&str], mut stop: F) -> Option<PathBuf>
where
    F: FnMut(&Path) -> bool,
{
    for dir in start.ancestors() {
        if stop(dir) {
            log::debug!("Upward search for {:?} stopped at '{}'.", names, dir.display());
            return None;
        }
        if let Some(found) = names.iter().map(|name| dir.join(name)).find(|c| c.is_file()) {
            return Some(found);
        }
    }
    None
}

/// Stop predicate that ends an upward search once it has stepped out of one host
/// install into an enclosing one.
pub fn install_boundary() -> impl FnMut(&Path) -> bool {
    let mut installs_seen = 0usize;
    move |dir: &Path| {
        if dir.join(HOST_LOAD_FILENAME).is_file() {
            installs_seen += 1;
        }
        installs_seen > 1
    }
}

/// Directory of the nearest `wp-load.php` at or above `start`.
pub fn find_host_load_dir(start: &Path) -> Option<PathBuf> {
    find_file_upward(start, &[HOST_LOAD_FILENAME], |_| false)
        .and_then(|file| file.parent().map(Path::to_path_buf))
}

/// Inspects `<cwd>/index.php` for a front controller that requires the host's
/// blog header from another directory and returns that directory.
pub fn host_root_from_entry(cwd: &Path) -> Option<PathBuf> {
    let code = fs::read_to_string(cwd.join(ENTRY_FILENAME)).ok()?;
    let caps = BLOG_HEADER_REQUIRE.captures(&code)?;
    let line = caps.get(0)?.as_str();
    let dir = Path::new(caps.get(2)?.as_str()).parent()?;

    // `dirname( __FILE__ ) . '/wp/...'` is relative to the entry file even though
    // its literal part starts with a slash.
    let anchored_at_entry = line.contains("__FILE__") || line.contains("__DIR__");
    let root = if dir.as_os_str().is_empty() {
        cwd.to_path_buf()
    } else if dir.is_absolute() && !anchored_at_entry {
        dir.to_path_buf()
    } else {
        cwd.join(dir.strip_prefix("/").unwrap_or(dir))
    };
    log::debug!("Host root taken from '{}': '{}'", ENTRY_FILENAME, root.display());
    Some(root)
}

/// Locates the host config file: inside `root`, or one level up as long as that
/// parent is not itself a separate install.
pub fn locate_host_config(root: &Path) -> Option<PathBuf> {
    let local = root.join(HOST_CONFIG_FILENAME);
    if local.is_file() {
        return Some(local);
    }
    let parent = root.parent()?;
    let above = parent.join(HOST_CONFIG_FILENAME);
    (above.is_file() && !parent.join(HOST_SETTINGS_FILENAME).is_file()).then_some(above)
}

/// Canonicalizes `path` without UNC prefixes, keeping it unchanged when it does
/// not exist.
pub fn canonical_or_same(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
