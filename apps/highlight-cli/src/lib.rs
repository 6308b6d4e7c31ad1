//! Command-line front end for highlight-core
//!
//! Each subcommand of `pdf-highlight` is a thin wrapper in [`commands`] that
//! reads files, calls the library and reports errors with context.

pub mod commands;
pub mod config;

pub use config::Config;
