//! Shared helpers for command handlers.

use std::io::IsTerminal;

use reelhouse_core::AppContext;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Fail early when there is no credential to send.
pub fn require_session(ctx: &AppContext) -> Result<(), CliError> {
    if ctx.session().is_authenticated() {
        Ok(())
    } else {
        Err(CliError::NoCredentials)
    }
}

/// Turn a facade result into a CLI result. The facade has already told the
/// user what went wrong; this only picks the exit path.
pub fn completed<T>(ctx: &AppContext, outcome: Option<T>) -> Result<T, CliError> {
    outcome.ok_or_else(|| failed(ctx))
}

pub fn succeeded(ctx: &AppContext, ok: bool) -> Result<(), CliError> {
    if ok { Ok(()) } else { Err(failed(ctx)) }
}

fn failed(ctx: &AppContext) -> CliError {
    if ctx.session().is_authenticated() {
        CliError::Reported
    } else {
        CliError::SessionExpired
    }
}
