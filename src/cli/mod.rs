use clap::Parser;

pub mod dispatcher;
pub mod handlers;

/// wp: bootstrap and dispatch core for an installed host site.
///
/// Every argument is handed to the runner untouched; global parameters such as
/// `--path` or `--url` are recognized there, not here.
#[derive(Parser, Debug)]
#[command(
    name = "wp",
    about,
    // `--help` and `--version` are rewritten into `help` and `cli version`.
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// The sequence of arguments passed to wp.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    pub args: Vec<String>,
}
