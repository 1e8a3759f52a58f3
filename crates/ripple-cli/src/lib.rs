//! Ripple CLI
//!
//! Command-line front end for the impact analysis engine:
//! - `analyze` runs the pipeline on one change event file
//! - `graph` prints the dependency neighbourhood of an entity
//! - `classify` diffs two API contract files

pub mod commands;
pub mod error;
pub mod logging;
pub mod router;

pub use error::{CliError, Result};
pub use router::{Cli, Commands, CommandRouter};
