//! Config subcommand handlers. None of these touch the backend.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = reelhouse_config::load_config()?;
            if let Some(ref url) = global.url {
                cfg.website_url = Some(url.clone());
            }
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{e}")),
                |c| c.website_url.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", reelhouse_config::config_path().display());
            Ok(())
        }

        // ── Set website URL ─────────────────────────────────────────
        ConfigCommand::SetUrl { url } => {
            let parsed = reelhouse_config::parse_website_url(&url)?;
            let mut cfg = reelhouse_config::load_config()?;
            cfg.website_url = Some(url.trim().trim_end_matches('/').to_owned());
            reelhouse_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Website URL set to {parsed}");
            }
            Ok(())
        }
    }
}
