//! CLI subcommands.

pub mod common;
pub mod export;
pub mod fields;
