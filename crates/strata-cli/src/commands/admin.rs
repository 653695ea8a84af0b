// Whole-cache commands: flush, info

use std::io::Write;

use serde_json::json;
use strata_cache::plugin::list_discovered_plugins;
use strata_cache::CacheContext;
use tracing::info;

use super::Command;
use crate::error::{CliError, CliResult};

/// Flush the configured backend, or every cache with `all`
pub struct FlushCommand {
    pub all: bool,
}

impl FlushCommand {
    pub fn new(all: bool) -> Self {
        Self { all }
    }
}

impl Command for FlushCommand {
    fn execute(&self, context: &CacheContext, out: &mut dyn Write) -> CliResult<()> {
        let flushed = if self.all {
            context.flush_all()
        } else {
            context.cache().flush_all()
        };
        info!(all = self.all, flushed, "Flush requested from command line");

        if !flushed {
            return Err(CliError::Failed(format!(
                "backend '{}' could not be fully flushed",
                context.cache().backend().kind()
            )));
        }
        writeln!(out, "flushed")?;
        Ok(())
    }
}

/// Print the active settings and backend details as JSON
pub struct InfoCommand;

impl Command for InfoCommand {
    fn execute(&self, context: &CacheContext, out: &mut dyn Write) -> CliResult<()> {
        let report = json!({
            "settings": serde_json::to_value(context.settings())?,
            "backend_kind": context.cache().backend().kind(),
            "multi_cache_id": context.multi().cache_id(),
            "plugins": list_discovered_plugins(),
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        Ok(())
    }
}
