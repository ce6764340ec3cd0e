//! CLI module for peershuffle - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
