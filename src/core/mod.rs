// src/core/mod.rs

pub mod arg_parser;
pub mod command_resolver;
pub mod command_tree;
pub mod config_loader;
pub mod config_resolver;
pub mod config_schema;
pub mod early_invoke;
pub mod normalizer;
pub mod paths;
pub mod runner;
pub mod url_resolver;
