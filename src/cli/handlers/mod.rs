// src/cli/handlers/mod.rs

// One module per command family. Every public function here has the
// `command_tree::Handler` signature.

pub mod db;
pub mod forward;
pub mod help;
pub mod meta;
pub mod wp_core;
