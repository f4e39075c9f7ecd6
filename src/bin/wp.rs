// src/bin/wp.rs

use clap::Parser;
use colored::*;
use wp_runner::cli::{Cli, dispatcher};

/// The main entry point of the `wp` binary.
/// It sets up logging, runs the dispatcher and performs centralized error
/// handling: this is the only place that prints a fatal error and exits.
fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    log::debug!("CLI args parsed: {:?}", cli);

    if let Err(e) = dispatcher::dispatch(cli.args) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
