//! Library side of the `strata` command-line tool
//!
//! Parsing and dispatch live here so they can be driven from tests with an
//! in-memory output buffer.

pub mod commands;
pub mod error;
pub mod router;

pub use error::{CliError, CliResult};
pub use router::{Cli, CommandRouter, Commands};
