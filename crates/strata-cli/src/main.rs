// strata CLI entry point

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use strata_cache::CacheContext;
use strata_cli::{Cli, CliError, CommandRouter};
use strata_hooks::{InMemoryHookRegistry, RequestLifecycle};

fn main() {
    let cli = Cli::parse();
    strata_common::init_logging(cli.log_level);

    if let Err(e) = run(&cli) {
        let code = match e.downcast_ref::<CliError>() {
            Some(cli_error) => {
                eprintln!("{}", cli_error.user_message());
                cli_error.exit_code()
            }
            None => {
                eprintln!("error: {e:#}");
                1
            }
        };
        std::process::exit(code);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = CommandRouter::settings(cli)?;
    let registry = Arc::new(InMemoryHookRegistry::new());
    let lifecycle = RequestLifecycle::new(registry.clone());
    let context = CacheContext::new(settings, registry).context("failed to set up caches")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = CommandRouter::execute(cli, &context, &mut out);

    // One invocation is one request.
    lifecycle.end_request(context.settings().mode.persist_event());
    out.flush()?;

    result.map_err(anyhow::Error::from)
}
