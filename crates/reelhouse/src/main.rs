mod cli;
mod commands;
mod console;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use reelhouse_api::{MemoryTokenStore, TokenStore};
use reelhouse_config::KeyringTokenStore;
use reelhouse_core::AppContext;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::console::{ConsoleNotifier, TerminalNavigator};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a backend
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "reelhouse", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let ctx = build_context(&cli.global, &cmd)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &ctx, &cli.global).await
        }
    }
}

/// Build an `AppContext` from the config file, environment and CLI overrides.
fn build_context(global: &GlobalOpts, cmd: &Command) -> Result<AppContext, CliError> {
    let mut cfg = reelhouse_config::load_config()?;

    if let Some(ref url) = global.url {
        cfg.website_url = Some(url.clone());
    }
    if global.insecure {
        cfg.defaults.insecure = true;
    }
    if let Some(secs) = global.timeout {
        cfg.defaults.timeout = secs;
    }

    let client_config = reelhouse_config::to_client_config(&cfg)?;

    // login/logout always act on the keyring; --token only borrows a
    // credential for this one process.
    let tokens: Arc<dyn TokenStore> = match (&global.token, cmd) {
        (Some(token), cmd) if !matches!(cmd, Command::Login(_) | Command::Logout) => {
            Arc::new(MemoryTokenStore::with_token(token.clone()))
        }
        _ => Arc::new(KeyringTokenStore::new()),
    };

    let ctx = AppContext::new(
        client_config,
        tokens,
        Arc::new(TerminalNavigator),
        Arc::new(ConsoleNotifier::from_global(global)),
    )?;
    Ok(ctx)
}
