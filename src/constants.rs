// src/constants.rs

/// Name of the binary, used as the root placeholder of every command path.
pub const ROOT_COMMAND: &str = "wp";

/// Environment variable that points at an alternative global config file.
pub const GLOBAL_CONFIG_ENV: &str = "WP_CLI_CONFIG_PATH";

/// Directory (under `$HOME`) holding the global config file.
pub const GLOBAL_CONFIG_DIR: &str = ".wp-cli";

/// The name of the global config file inside [`GLOBAL_CONFIG_DIR`].
pub const GLOBAL_CONFIG_FILENAME: &str = "config.toml";

/// Project config files, in lookup order within a single directory.
pub const PROJECT_CONFIG_FILENAMES: &[&str] = &["wp-cli.local.toml", "wp-cli.toml"];

/// Marker file present at the root of every host install.
pub const HOST_LOAD_FILENAME: &str = "wp-load.php";

/// The host's main configuration file.
pub const HOST_CONFIG_FILENAME: &str = "wp-config.php";

/// Presence of this file next to a config file means it belongs to another install.
pub const HOST_SETTINGS_FILENAME: &str = "wp-settings.php";

/// Relative path of the file declaring the host's version.
pub const HOST_VERSION_FILE: &str = "wp-includes/version.php";

/// Front controller inspected when no explicit path was configured.
pub const ENTRY_FILENAME: &str = "index.php";

/// Deprecated marker file holding the target URL.
pub const LEGACY_URL_FILENAME: &str = "wp-cli-blog";

/// Optional user table exported by the host for identity lookups.
pub const HOST_USERS_FILE: &str = "wp-content/wp-cli-users.json";

/// Oldest host version this tool can drive.
pub const MINIMUM_HOST_VERSION: &str = "3.4";

/// Endpoint used by installers when nothing else is known.
pub const DEFAULT_INSTALL_URL: &str = "http://example.com";

/// Checkpoint evaluated right before the host version is verified.
pub const CHECKPOINT_BEFORE_HOST_LOAD: &str = "before_host_load";

/// Admin screen hint published for the `plugin` family.
pub const PLUGIN_ADMIN_SCREEN: &str = "plugins.php";

/// Length in bytes of the cookie hash before hex encoding.
pub const COOKIE_HASH_BYTES: usize = 16;
