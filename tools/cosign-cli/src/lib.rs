//! The `cosign` command-line tool: an offline front end over the protocol core and the
//! template interpreter.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod offline;
pub mod store;

pub use commands::run;
