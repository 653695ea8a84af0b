// Command handlers for the strata CLI

pub mod admin;
pub mod entry;

pub use admin::{FlushCommand, InfoCommand};
pub use entry::{DeleteCommand, GetCommand, HasCommand, SetCommand};

use std::io::Write;

use strata_cache::CacheContext;

use crate::error::CliResult;

/// A command run against a cache context, writing its output to `out`
pub trait Command {
    fn execute(&self, context: &CacheContext, out: &mut dyn Write) -> CliResult<()>;
}
