//! Specsafe command-line front end
//!
//! The binary is a thin shell over this library: [`commands::cli`] builds
//! the argument parser, [`context::ProjectContext`] resolves the specs root
//! and configuration, and [`commands::run`] dispatches to the allocator,
//! snapshot engine and completeness crates.

#![warn(unreachable_pub)]

pub mod commands;
pub mod config;
pub mod context;
pub mod logging;

pub use commands::{cli, exit_code, run, PromptConfirm};
pub use config::{Config, CONFIG_FILE};
pub use context::ProjectContext;
