//! CLI subcommands.

pub mod altitude;
pub mod common;
pub mod config;
pub mod init;
pub mod plane;
pub mod select;
