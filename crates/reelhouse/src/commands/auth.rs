//! Sign-in and sign-out.

use std::io::BufRead;

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use reelhouse_core::{AppContext, Failure};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::error::CliError;

pub async fn login(ctx: &AppContext, args: &LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let token = read_token(args, global)?;
    ctx.sign_in(&token)?;

    // One authenticated call tells us whether the backend accepts it.
    match ctx.playlists().try_fetch().await {
        Ok(playlists) => {
            ctx.requester()
                .notifier()
                .success(&format!("Signed in ({} playlists)", playlists.len()));
            Ok(())
        }
        Err(Failure::SessionExpired) => Err(CliError::SessionExpired),
        Err(failure) => {
            warn!(error = %failure, "token stored but could not be verified");
            Err(failure.into())
        }
    }
}

pub fn logout(ctx: &AppContext) -> Result<(), CliError> {
    ctx.sign_out()?;
    ctx.requester().notifier().success("Signed out");
    Ok(())
}

fn read_token(args: &LoginArgs, global: &GlobalOpts) -> Result<SecretString, CliError> {
    let raw = if let Some(ref token) = global.token {
        token.clone()
    } else if args.token_stdin {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        line
    } else {
        rpassword::prompt_password("Access token: ")?
    };

    let token = SecretString::from(raw.trim().to_owned());
    if token.expose_secret().is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "token cannot be empty".into(),
        });
    }
    Ok(token)
}
