//! Command dispatch: bridges CLI args -> core services -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod films;
pub mod notifications;
pub mod playlists;
pub mod realtime;
pub mod util;

use reelhouse_core::AppContext;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(ctx, &args, global).await,
        Command::Logout => auth::logout(ctx),
        Command::Playlists(args) => playlists::handle(ctx, args, global).await,
        Command::Notifications(args) => notifications::handle(ctx, args, global).await,
        Command::Search(args) => films::search(ctx, &args, global).await,
        Command::Listen(args) => realtime::listen(ctx, &args, global).await,
        Command::Send(args) => realtime::send(ctx, &args).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
