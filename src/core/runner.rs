//! # Runner
//!
//! Drives a single invocation from raw arguments to a dispatched command. The
//! work is split in two phases around the host boot:
//!
//! - **before host load**: load and merge configuration, set up output, resolve
//!   the host root and endpoint, run early-invoke checkpoints and perform every
//!   dispatch that must not wait for the host (`help`, `core config`, `db ...`).
//! - **after host load**: pick the filesystem method, switch to the requested
//!   user and dispatch.
//!
//! Each phase returns `ControlFlow::Break` once the process has nothing left to
//! do, so the caller knows whether to boot the host at all.

use crate::constants::{
    CHECKPOINT_BEFORE_HOST_LOAD, DEFAULT_INSTALL_URL, MINIMUM_HOST_VERSION, PLUGIN_ADMIN_SCREEN,
};
use crate::core::arg_parser::{ParseError, ParsedArgs};
use crate::core::command_resolver::{self, ResolveError};
use crate::core::command_tree::{CommandTree, NodeId};
use crate::core::config_loader::ConfigLoader;
use crate::core::config_resolver::{self, MergedConfig};
use crate::core::early_invoke::EarlyInvokeRegistry;
use crate::core::normalizer;
use crate::core::paths;
use crate::core::url_resolver;
use crate::models::{ArgumentVector, CommandPath, ExtraConfig, FlagValue, Flags};
use crate::state::{BootstrapContext, ContextError, FilesystemMethod, RequestTarget};
use crate::system::fetchers::{FetchError, HostUserFetcher, UserFetcher};
use crate::system::host::{self, HostCall, HostEnvironment, HostError};
use crate::system::output::{Reporter, Verbosity};
use std::cmp::Ordering;
use std::io::IsTerminal;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Required file '{path}' doesn't exist or isn't readable.")]
    RequiredFileMissing {
        path: String,
        #[source]
        source: HostError,
    },
    #[error(
        "This does not seem to be a WordPress install.\nPass --path=`path/to/wordpress` or run `wp core download`."
    )]
    HostEnvironmentMissing,
    #[error(
        "wp needs WordPress {minimum} or later to work properly. The version currently installed is {found}.\nTry running `wp core download --force`."
    )]
    HostEnvironmentOutdated { minimum: &'static str, found: String },
    #[error("wp-config.php not found.\nEither create one manually or use `wp core config`.")]
    HostConfigurationMissing,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("{0:#}")]
    Invocation(anyhow::Error),
    #[error("Could not boot the host: {0}")]
    HostBoot(#[source] HostError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    User(#[from] FetchError),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Lifecycle states, in the order a run moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Uninitialized,
    ConfigLoaded,
    PreHostChecks,
    HostReady,
    Dispatched,
    Terminated,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A leaf command ran.
    Dispatched(CommandPath),
    /// A command ran at an early-invoke checkpoint.
    EarlyInvoked(CommandPath),
    /// The arguments named a command family; its synopsis was shown.
    UsageShown(CommandPath),
}

/// Everything a leaf handler can see.
#[derive(Debug)]
pub struct Invocation<'a> {
    pub path: &'a CommandPath,
    pub node: NodeId,
    /// Positional arguments left after the command path.
    pub args: &'a [String],
    /// Command-line flags over the per-command config defaults.
    pub flags: &'a Flags,
    pub config: &'a MergedConfig,
    pub context: &'a BootstrapContext,
    pub host: &'a dyn HostEnvironment,
    pub tree: &'a CommandTree,
    pub reporter: &'a Reporter,
}

impl Invocation<'_> {
    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    /// The textual value of `--name=value`.
    pub fn flag_text(&self, name: &str) -> Option<&str> {
        self.flag(name).and_then(FlagValue::as_text)
    }

    /// True for `--name` and for truthy `--name=value` spellings.
    pub fn flag_enabled(&self, name: &str) -> bool {
        self.flag(name).and_then(FlagValue::as_bool).unwrap_or(false)
    }

    /// Forwards the command to the host.
    pub fn hand_to_host(&self) -> anyhow::Result<()> {
        self.host.invoke(&HostCall {
            command: self.path,
            args: self.args,
            flags: self.flags,
            context: self.context,
        })
    }
}

/// The lifecycle orchestrator. One runner serves one process.
#[derive(Debug)]
pub struct Runner<'h> {
    host: &'h dyn HostEnvironment,
    fetcher: Option<Box<dyn UserFetcher + 'h>>,
    tree: CommandTree,
    early_invoke: EarlyInvokeRegistry,
    reporter: Reporter,
    context: BootstrapContext,
    raw_args: Vec<String>,
    cwd: PathBuf,
    env: Vec<(String, String)>,
    home: Option<PathBuf>,
    is_terminal: bool,
    phase: Phase,
    arguments: ArgumentVector,
    config: MergedConfig,
    extra: ExtraConfig,
}

impl<'h> Runner<'h> {
    /// Creates a runner for `raw_args` (without the binary name) executed in `cwd`.
    pub fn new(
        host: &'h dyn HostEnvironment,
        tree: CommandTree,
        early_invoke: EarlyInvokeRegistry,
        raw_args: Vec<String>,
        cwd: PathBuf,
    ) -> Self {
        Self {
            host,
            fetcher: None,
            tree,
            early_invoke,
            reporter: Reporter::new(),
            context: BootstrapContext::new(),
            raw_args,
            cwd,
            env: Vec::new(),
            home: dirs::home_dir(),
            is_terminal: std::io::stdout().is_terminal(),
            phase: Phase::Uninitialized,
            arguments: ArgumentVector::default(),
            config: MergedConfig::default(),
            extra: ExtraConfig::new(),
        }
    }

    /// Environment variables visible to the config loader.
    pub fn with_env<I>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env = env.into_iter().collect();
        self
    }

    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replaces the user lookup. By default users are read from the host root.
    pub fn with_user_fetcher(mut self, fetcher: Box<dyn UserFetcher + 'h>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Whether stdout counts as a terminal for `color = auto`.
    pub fn with_terminal(mut self, is_terminal: bool) -> Self {
        self.is_terminal = is_terminal;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &MergedConfig {
        &self.config
    }

    pub fn extra_config(&self) -> &ExtraConfig {
        &self.extra
    }

    pub fn arguments(&self) -> &ArgumentVector {
        &self.arguments
    }

    pub fn context(&self) -> &BootstrapContext {
        &self.context
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// Runs both phases with the host boot in between.
    pub fn run(&mut self) -> Result<Outcome, RunnerError> {
        if let ControlFlow::Break(outcome) = self.before_host_load()? {
            return Ok(outcome);
        }
        self.boot_host()?;
        self.after_host_load()
    }

    /// The "before host load" phase.
    pub fn before_host_load(&mut self) -> Result<ControlFlow<Outcome>, RunnerError> {
        let result = self.prepare();
        match &result {
            Ok(ControlFlow::Continue(())) => {}
            Ok(ControlFlow::Break(_)) => self.terminate(None),
            Err(e) => self.terminate(Some(e)),
        }
        result
    }

    /// Boots the host through the host environment.
    pub fn boot_host(&mut self) -> Result<(), RunnerError> {
        let result = self.host.boot(&self.context).map_err(RunnerError::HostBoot);
        match &result {
            Ok(()) => self.transition(Phase::HostReady),
            Err(e) => self.terminate(Some(e)),
        }
        result
    }

    /// The "after host load" phase. Always ends with a dispatch.
    pub fn after_host_load(&mut self) -> Result<Outcome, RunnerError> {
        let result = self.finish();
        self.terminate(result.as_ref().err());
        result
    }

    /// Resolves `args` and runs the command found. Per-command defaults from
    /// the config files apply underneath `flags`.
    pub fn run_command(&self, args: &[String], flags: &Flags) -> Result<CommandPath, RunnerError> {
        let resolved = command_resolver::resolve(
            &self.tree,
            self.tree.root(),
            args,
            &self.config.disabled_commands,
        )?;

        let mut merged = self.extra.get(&resolved.path).cloned().unwrap_or_default();
        merged.extend(flags.iter().map(|(k, v)| (k.clone(), v.clone())));

        let Some(handler) = self.tree.handler(resolved.node) else {
            self.reporter.line(self.tree.usage(resolved.node).trim_end());
            return Ok(resolved.path);
        };

        log::debug!("Dispatching '{}' with {} argument(s).", resolved.path, resolved.args.len());
        let invocation = Invocation {
            path: &resolved.path,
            node: resolved.node,
            args: &resolved.args,
            flags: &merged,
            config: &self.config,
            context: &self.context,
            host: self.host,
            tree: &self.tree,
            reporter: &self.reporter,
        };
        handler(&invocation).map_err(RunnerError::Invocation)?;
        Ok(resolved.path)
    }

    fn transition(&mut self, to: Phase) {
        if self.phase != to {
            log::debug!("Runner phase {:?} -> {:?}", self.phase, to);
            self.phase = to;
        }
    }

    fn terminate(&mut self, error: Option<&RunnerError>) {
        if let Some(e) = error {
            log::debug!("Run terminated by error: {}", e);
        }
        self.transition(Phase::Terminated);
    }

    fn prepare(&mut self) -> Result<ControlFlow<Outcome>, RunnerError> {
        let warnings = self.init_config()?;
        self.init_output();
        for warning in warnings {
            self.reporter.warning(warning);
        }

        if self.arguments.positional.is_empty() {
            self.arguments.positional.push("help".to_string());
        }

        self.load_commands_and_files()?;

        if let Some(path) = self.composite_path() {
            return Ok(ControlFlow::Break(Outcome::UsageShown(path)));
        }

        let root = self.set_host_root()?;

        if self.arguments.first() == Some("help")
            && (self.arguments.positional.len() > 1 || !self.host.exists(&root))
        {
            return self.dispatch().map(|path| ControlFlow::Break(Outcome::Dispatched(path)));
        }

        let host_config = self.host.locate_config(&root);
        self.set_endpoint(&root, host_config.as_deref())?;

        self.transition(Phase::PreHostChecks);
        if self
            .early_invoke
            .check(CHECKPOINT_BEFORE_HOST_LOAD, &self.arguments.positional)
        {
            log::debug!("Early invoke at '{}'.", CHECKPOINT_BEFORE_HOST_LOAD);
            return self.dispatch().map(|path| ControlFlow::Break(Outcome::EarlyInvoked(path)));
        }

        if self.arguments.starts_with(&["core", "config"]) {
            return self.dispatch().map(|path| ControlFlow::Break(Outcome::Dispatched(path)));
        }
        self.check_host_version(&root)?;

        let host_config = host_config.ok_or(RunnerError::HostConfigurationMissing)?;

        if self.arguments.starts_with(&["db"]) {
            let isolated = self.host.isolated_config(&host_config)?;
            log::debug!(
                "Evaluated '{}' in isolation ({} constants).",
                isolated.path.display(),
                isolated.constants.len()
            );
            for (name, value) in &isolated.constants {
                self.context.define(name, value)?;
            }
            return self.dispatch().map(|path| ControlFlow::Break(Outcome::Dispatched(path)));
        }

        self.prepare_special_commands()?;
        Ok(ControlFlow::Continue(()))
    }

    fn finish(&mut self) -> Result<Outcome, RunnerError> {
        self.context.set_filesystem_method(FilesystemMethod::Direct)?;

        if let Some(ident) = self.config.user.clone() {
            let user = match &self.fetcher {
                Some(fetcher) => fetcher.get(&ident)?,
                None => {
                    let root = self.context.host_root().unwrap_or(self.cwd.as_path());
                    HostUserFetcher::new(root).get(&ident)?
                }
            };
            log::debug!("Running as user #{} ({}).", user.id, user.login);
            self.context.set_current_user(user)?;
        }

        self.dispatch().map(Outcome::Dispatched)
    }

    fn dispatch(&mut self) -> Result<CommandPath, RunnerError> {
        self.transition(Phase::Dispatched);
        self.run_command(&self.arguments.positional, &self.arguments.flags)
    }

    /// Parses and normalizes the arguments, then merges every config layer.
    /// Returns the config warnings, which are reported once output is set up.
    fn init_config(&mut self) -> Result<Vec<String>, RunnerError> {
        let parsed = ParsedArgs::new(&self.raw_args)?;
        self.arguments = normalizer::normalize(parsed.args);

        let layers = ConfigLoader::new(&self.cwd, self.env.iter().cloned())
            .with_home(self.home.clone())
            .load(&parsed.runtime);
        let result = config_resolver::merge(&layers);
        self.config = result.config;
        self.extra = result.extra;

        if self.config.path.is_none() {
            self.config.path = paths::find_host_load_dir(&self.cwd);
        }

        self.transition(Phase::ConfigLoaded);
        Ok(result.warnings)
    }

    fn init_output(&self) {
        let verbosity = Verbosity::from_flags(self.config.quiet, self.config.debug);
        self.reporter.set_verbosity(verbosity);
        if verbosity == Verbosity::Debug && log::max_level() < log::LevelFilter::Debug {
            log::set_max_level(log::LevelFilter::Debug);
        }
        colored::control::set_override(self.config.color.enabled(self.is_terminal));
        for file in &self.config.loaded_files {
            self.reporter.debug(format!("Using config file '{}'.", file.display()));
        }
    }

    fn load_commands_and_files(&mut self) -> Result<(), RunnerError> {
        if let Some(first) = self.arguments.first() {
            self.host.load_command(first, &mut self.tree)?;
        }
        for file in &self.config.require {
            let path = paths::expand_relative(&self.cwd, &file.to_string_lossy());
            self.host
                .load_file(&path, &self.context)
                .map_err(|source| RunnerError::RequiredFileMissing {
                    path: path.display().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// If the arguments stop at a command family, shows its synopsis.
    fn composite_path(&self) -> Option<CommandPath> {
        let resolved = command_resolver::resolve(
            &self.tree,
            self.tree.root(),
            &self.arguments.positional,
            &self.config.disabled_commands,
        )
        .ok()?;
        if !self.tree.has_subcommands(resolved.node) {
            return None;
        }
        self.reporter.line(self.tree.usage(resolved.node).trim_end());
        Some(resolved.path)
    }

    fn set_host_root(&self) -> Result<PathBuf, RunnerError> {
        let root = match &self.config.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.cwd.join(path),
            None => paths::host_root_from_entry(&self.cwd).unwrap_or_else(|| self.cwd.clone()),
        };
        log::debug!("Host root: '{}'", root.display());
        self.context.set_host_root(root.clone())?;
        self.context.set_document_root(paths::canonical_or_same(&root))?;
        Ok(root)
    }

    fn set_endpoint(&self, root: &Path, host_config: Option<&Path>) -> Result<(), RunnerError> {
        let mut notices = Vec::new();
        let target = url_resolver::guess_url(&self.config, root, host_config, &mut notices);
        for notice in notices {
            self.reporter.warning(notice.message());
        }
        match target {
            Some(target) => self.publish_endpoint(target),
            None => Ok(()),
        }
    }

    fn publish_endpoint(&self, target: RequestTarget) -> Result<(), RunnerError> {
        log::debug!("Endpoint: {} (host '{}', path '{}')", target.url, target.host, target.path);
        self.context.set_request(target)?;
        Ok(())
    }

    fn check_host_version(&self, root: &Path) -> Result<(), RunnerError> {
        if !self.host.exists(root) {
            return Err(RunnerError::HostEnvironmentMissing);
        }
        let found = self.host.version(root)?;
        if host::compare_versions(&found, MINIMUM_HOST_VERSION) == Ordering::Less {
            return Err(RunnerError::HostEnvironmentOutdated {
                minimum: MINIMUM_HOST_VERSION,
                found,
            });
        }
        Ok(())
    }

    /// State that specific command families need before the host boots.
    fn prepare_special_commands(&self) -> Result<(), RunnerError> {
        let installing = self.arguments.positional.get(1).map(String::as_str);
        if self.arguments.first() == Some("core")
            && matches!(installing, Some("install" | "multisite-install"))
        {
            self.context.mark_installing()?;
            if self.context.request().is_none() {
                match url_resolver::parse_endpoint(DEFAULT_INSTALL_URL) {
                    Ok(target) => self.publish_endpoint(target)?,
                    Err(e) => log::warn!("Default install URL is unusable: {}", e),
                }
            }

            if installing == Some("multisite-install")
                && let Some(target) = self.context.request()
            {
                let (site, blog) = url_resolver::network_records(target);
                self.context.set_network(site, blog)?;
                if self.context.cookie_hash().is_none() && self.context.constant("COOKIEHASH").is_none() {
                    self.context
                        .set_cookie_hash(url_resolver::cookie_hash(&target.host))?;
                }
            }
        }

        if self.arguments.starts_with(&["import"]) {
            self.context.mark_importing()?;
        }

        if self.arguments.starts_with(&["plugin"]) {
            self.context.set_admin_screen(PLUGIN_ADMIN_SCREEN)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::fetchers::{HostUser, StaticUserFetcher};
    use crate::system::host::IsolatedConfig;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    #[derive(Debug, Default)]
    struct MockHost {
        present: bool,
        version: String,
        config: Option<PathBuf>,
        constants: BTreeMap<String, String>,
        booted: Cell<bool>,
        loaded_commands: RefCell<Vec<String>>,
    }

    impl MockHost {
        fn installed(config: Option<PathBuf>) -> Self {
            Self {
                present: true,
                version: "6.4.2".to_string(),
                config,
                ..Self::default()
            }
        }
    }

    impl HostEnvironment for MockHost {
        fn exists(&self, _root: &Path) -> bool {
            self.present
        }

        fn version(&self, _root: &Path) -> Result<String, HostError> {
            Ok(self.version.clone())
        }

        fn locate_config(&self, _root: &Path) -> Option<PathBuf> {
            self.config.clone()
        }

        fn isolated_config(&self, path: &Path) -> Result<IsolatedConfig, HostError> {
            Ok(IsolatedConfig {
                path: path.to_path_buf(),
                code: String::new(),
                constants: self.constants.clone(),
            })
        }

        fn load_command(&self, name: &str, _tree: &mut CommandTree) -> Result<(), HostError> {
            self.loaded_commands.borrow_mut().push(name.to_string());
            Ok(())
        }

        fn load_file(&self, path: &Path, ctx: &BootstrapContext) -> Result<(), HostError> {
            fs::metadata(path).map_err(|e| HostError::Unreadable {
                path: path.display().to_string(),
                source: e,
            })?;
            ctx.record_loaded_file(path);
            Ok(())
        }

        fn boot(&self, _ctx: &BootstrapContext) -> Result<(), HostError> {
            self.booted.set(true);
            Ok(())
        }

        fn invoke(&self, _call: &HostCall<'_>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Records the dispatched path, its arguments and flags.
    fn record(inv: &Invocation<'_>) -> anyhow::Result<()> {
        let flags: Vec<String> = inv.flags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        inv.reporter.line(format!(
            "ran {} [{}] {{{}}}",
            inv.path,
            inv.args.join(","),
            flags.join(",")
        ));
        Ok(())
    }

    fn record_db_name(inv: &Invocation<'_>) -> anyhow::Result<()> {
        let db = inv.context.constant("DB_NAME").unwrap_or_default();
        inv.reporter.line(format!("ran {} db={}", inv.path, db));
        Ok(())
    }

    fn fail(_: &Invocation<'_>) -> anyhow::Result<()> {
        anyhow::bail!("handler failed")
    }

    fn tree() -> CommandTree {
        let mut tree = CommandTree::new();
        let root = tree.root();
        tree.add_leaf(root, "help", "", "[<command>...]", record).unwrap();
        let core = tree.add_composite(root, "core", "").unwrap();
        for name in ["config", "install", "multisite-install", "version"] {
            tree.add_leaf(core, name, "", "", record).unwrap();
        }
        let db = tree.add_composite(root, "db", "").unwrap();
        tree.add_leaf(db, "query", "", "[<sql>]", record_db_name).unwrap();
        let plugin = tree.add_composite(root, "plugin", "").unwrap();
        tree.add_leaf(plugin, "list", "", "[--format=<format>]", record).unwrap();
        tree.add_leaf(plugin, "install", "", "<plugin>...", record).unwrap();
        let cli = tree.add_composite(root, "cli", "").unwrap();
        tree.add_leaf(cli, "version", "", "", record).unwrap();
        tree.add_leaf(root, "import", "", "<file>", record).unwrap();
        tree.add_leaf(root, "eval", "", "<code>", fail).unwrap();
        tree
    }

    fn build<'h>(host: &'h MockHost, cwd: &TempDir, args: &[&str]) -> Runner<'h> {
        let mut early = EarlyInvokeRegistry::new();
        early.register(CHECKPOINT_BEFORE_HOST_LOAD, &CommandPath::new(["wp", "cli"]));
        Runner::new(
            host,
            tree(),
            early,
            args.iter().map(|s| s.to_string()).collect(),
            cwd.path().to_path_buf(),
        )
        .with_home(None)
        .with_terminal(false)
        .with_reporter(Reporter::capturing())
    }

    fn ran(runner: &Runner<'_>) -> Vec<String> {
        runner
            .reporter()
            .captured()
            .into_iter()
            .filter(|line| line.starts_with("ran "))
            .collect()
    }

    #[test]
    fn test_core_config_runs_without_a_host() {
        let cwd = tempdir().unwrap();
        let host = MockHost::default();
        let mut runner = build(&host, &cwd, &["core", "config", "--dbname=wp"]);

        let outcome = runner.run().unwrap();
        assert_eq!(outcome, Outcome::Dispatched(CommandPath::new(["core", "config"])));
        assert_eq!(ran(&runner), vec!["ran core config [] {dbname=wp}"]);
        assert!(!host.booted.get());
        assert_eq!(runner.phase(), Phase::Terminated);
    }

    #[test]
    fn test_db_commands_use_isolated_config_without_boot() {
        let cwd = tempdir().unwrap();
        let mut host = MockHost::installed(Some(cwd.path().join("wp-config.php")));
        host.constants.insert("DB_NAME".to_string(), "wordpress".to_string());

        let mut runner = build(&host, &cwd, &["sql", "query", "SELECT 1"]);
        let outcome = runner.run().unwrap();
        assert_eq!(outcome, Outcome::Dispatched(CommandPath::new(["db", "query"])));
        assert_eq!(ran(&runner), vec!["ran db query db=wordpress"]);
        assert!(!host.booted.get());
    }

    #[test]
    fn test_missing_host_is_fatal() {
        let cwd = tempdir().unwrap();
        let host = MockHost::default();
        let mut runner = build(&host, &cwd, &["plugin", "list"]);
        let err = runner.run().unwrap_err();
        assert!(matches!(err, RunnerError::HostEnvironmentMissing));
        assert!(err.to_string().contains("--path=`path/to/wordpress`"));
        assert_eq!(runner.phase(), Phase::Terminated);
    }

    #[test]
    fn test_outdated_host_is_fatal() {
        let cwd = tempdir().unwrap();
        let mut host = MockHost::installed(None);
        host.version = "3.3.2".to_string();
        let err = build(&host, &cwd, &["plugin", "list"]).run().unwrap_err();
        assert!(matches!(
            err,
            RunnerError::HostEnvironmentOutdated { ref found, .. } if found == "3.3.2"
        ));
    }

    #[test]
    fn test_missing_host_config_is_fatal() {
        let cwd = tempdir().unwrap();
        let host = MockHost::installed(None);
        let err = build(&host, &cwd, &["plugin", "list"]).run().unwrap_err();
        assert!(matches!(err, RunnerError::HostConfigurationMissing));
    }

    #[test]
    fn test_early_invoke_runs_before_version_check() {
        let cwd = tempdir().unwrap();
        let host = MockHost::default();
        let mut runner = build(&host, &cwd, &["--version"]);
        let outcome = runner.run().unwrap();
        assert_eq!(outcome, Outcome::EarlyInvoked(CommandPath::new(["cli", "version"])));
    }

    #[test]
    fn test_command_family_shows_usage() {
        let cwd = tempdir().unwrap();
        let host = MockHost::default();
        let mut runner = build(&host, &cwd, &["plugin"]);
        let outcome = runner.run().unwrap();
        assert_eq!(outcome, Outcome::UsageShown(CommandPath::new(["plugin"])));
        let output = runner.reporter().captured().join("\n");
        assert!(output.contains("usage: wp plugin install <plugin>..."));
        assert_eq!(host.loaded_commands.borrow().as_slice(), ["plugin"]);
    }

    #[test]
    fn test_help_works_without_host() {
        let cwd = tempdir().unwrap();
        let host = MockHost::default();
        let mut runner = build(&host, &cwd, &[]);
        let outcome = runner.run().unwrap();
        assert_eq!(outcome, Outcome::Dispatched(CommandPath::new(["help"])));

        let mut runner = build(&host, &cwd, &["plugin", "install", "--help"]);
        runner.run().unwrap();
        assert_eq!(ran(&runner), vec!["ran help [plugin,install] {}"]);
    }

    #[test]
    fn test_full_run_boots_and_switches_user() {
        let cwd = tempdir().unwrap();
        let host = MockHost::installed(Some(cwd.path().join("wp-config.php")));
        let admin = HostUser {
            id: 1,
            login: "admin".to_string(),
            email: "admin@example.com".to_string(),
            display_name: String::new(),
        };
        let mut runner = build(&host, &cwd, &["plugin", "list", "--user=admin", "--json"])
            .with_user_fetcher(Box::new(StaticUserFetcher::new(vec![admin.clone()])));

        let outcome = runner.run().unwrap();
        assert_eq!(outcome, Outcome::Dispatched(CommandPath::new(["plugin", "list"])));
        assert!(host.booted.get());
        let ctx = runner.context();
        assert_eq!(ctx.current_user(), Some(&admin));
        assert_eq!(ctx.admin_screen(), Some(PLUGIN_ADMIN_SCREEN));
        assert_eq!(ctx.filesystem_method(), Some(FilesystemMethod::Direct));
        assert_eq!(ran(&runner), vec!["ran plugin list [] {format=json}"]);
    }

    #[test]
    fn test_unknown_user_is_fatal() {
        let cwd = tempdir().unwrap();
        let host = MockHost::installed(Some(cwd.path().join("wp-config.php")));
        let mut runner = build(&host, &cwd, &["plugin", "list", "--user=ghost"])
            .with_user_fetcher(Box::new(StaticUserFetcher::default()));
        assert!(matches!(runner.run(), Err(RunnerError::User(FetchError::NotFound(_)))));
    }

    #[test]
    fn test_multisite_install_synthesizes_network() {
        let cwd = tempdir().unwrap();
        let host = MockHost::installed(Some(cwd.path().join("wp-config.php")));
        let mut runner = build(&host, &cwd, &["core", "multisite-install"]);

        let flow = runner.before_host_load().unwrap();
        assert_eq!(flow, ControlFlow::Continue(()));
        let ctx = runner.context();
        assert!(ctx.is_installing());
        assert_eq!(ctx.request().map(|r| r.host.as_str()), Some("example.com"));
        let site = ctx.current_site().unwrap();
        assert_eq!((site.domain.as_str(), site.path.as_str()), ("example.com", "/"));
        assert_eq!(ctx.cookie_hash(), Some(url_resolver::cookie_hash("example.com").as_str()));
        assert_eq!(runner.phase(), Phase::PreHostChecks);
    }

    #[test]
    fn test_import_sets_importer_flags() {
        let cwd = tempdir().unwrap();
        let host = MockHost::installed(Some(cwd.path().join("wp-config.php")));
        let mut runner = build(&host, &cwd, &["import", "dump.xml"]);
        runner.before_host_load().unwrap();
        assert!(runner.context().is_importing());
        assert!(runner.context().loads_importers());
    }

    #[test]
    fn test_unknown_and_disabled_commands() {
        let cwd = tempdir().unwrap();
        fs::write(
            cwd.path().join("wp-cli.toml"),
            "disabled_commands = [\"plugin install\"]\n",
        )
        .unwrap();
        let host = MockHost::installed(Some(cwd.path().join("wp-config.php")));

        let err = build(&host, &cwd, &["plugin", "frob"]).run().unwrap_err();
        assert_eq!(
            err.to_string(),
            "'plugin frob' is not a registered wp command. See 'wp help'."
        );

        let err = build(&host, &cwd, &["plugin", "install", "x"]).run().unwrap_err();
        assert_eq!(
            err.to_string(),
            "The 'plugin install' command has been disabled from the config file."
        );
    }

    #[test]
    fn test_command_defaults_sit_under_cli_flags() {
        let cwd = tempdir().unwrap();
        fs::write(
            cwd.path().join("wp-cli.toml"),
            "[commands.\"plugin list\"]\nformat = \"table\"\nfields = \"name\"\n",
        )
        .unwrap();
        let host = MockHost::installed(Some(cwd.path().join("wp-config.php")));
        let mut runner = build(&host, &cwd, &["plugin", "list", "--format=csv"]);
        runner.run().unwrap();
        assert_eq!(ran(&runner), vec!["ran plugin list [] {fields=name,format=csv}"]);
        assert!(runner.config().loaded_files.contains(&cwd.path().join("wp-cli.toml")));
    }

    #[test]
    fn test_missing_required_file_is_fatal() {
        let cwd = tempdir().unwrap();
        let host = MockHost::installed(None);
        let err = build(&host, &cwd, &["plugin", "list", "--require=missing.php"])
            .run()
            .unwrap_err();
        assert!(matches!(err, RunnerError::RequiredFileMissing { .. }));
    }

    #[test]
    fn test_bare_url_warns_and_continues() {
        let cwd = tempdir().unwrap();
        let host = MockHost::default();
        let mut runner = build(&host, &cwd, &["core", "config", "--url"]);
        runner.run().unwrap();
        assert!(runner
            .reporter()
            .captured()
            .contains(&"Warning: The --url parameter expects a value.".to_string()));
        assert!(runner.context().request().is_none());
    }

    #[test]
    fn test_unparsable_url_does_not_stop_early_commands() {
        let cwd = tempdir().unwrap();
        let host = MockHost::default();
        let mut runner = build(&host, &cwd, &["cli", "version", "--url=http://"]);

        let outcome = runner.run().unwrap();
        assert_eq!(outcome, Outcome::EarlyInvoked(CommandPath::new(["cli", "version"])));
        assert_eq!(ran(&runner), vec!["ran cli version [] {}"]);
        assert!(runner.context().request().is_none());
        assert!(runner
            .reporter()
            .captured()
            .iter()
            .any(|line| line.starts_with("Warning: Ignoring the URL 'http://'")));
    }

    #[test]
    fn test_explicit_path_sets_root() {
        let cwd = tempdir().unwrap();
        let host = MockHost::default();
        let mut runner = build(&host, &cwd, &["core", "config", "--path=site"]);
        runner.run().unwrap();
        assert_eq!(runner.context().host_root(), Some(cwd.path().join("site").as_path()));
    }

    #[test]
    fn test_handler_errors_become_invocation_errors() {
        let cwd = tempdir().unwrap();
        let host = MockHost::installed(Some(cwd.path().join("wp-config.php")));
        let err = build(&host, &cwd, &["eval", "1"]).run().unwrap_err();
        assert!(matches!(err, RunnerError::Invocation(_)));
        assert_eq!(err.to_string(), "handler failed");
    }
}
