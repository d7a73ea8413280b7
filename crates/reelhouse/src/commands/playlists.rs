//! Playlist command handlers.

use tabled::Tabled;

use reelhouse_core::{AppContext, Playlist};

use crate::cli::{GlobalOpts, PlaylistsArgs, PlaylistsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PlaylistRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Films")]
    films: usize,
}

impl From<&Playlist> for PlaylistRow {
    fn from(p: &Playlist) -> Self {
        Self {
            id: p.playlist_id,
            name: p.playlist_name.clone(),
            films: p.films.len(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &AppContext, args: PlaylistsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_session(ctx)?;
    let service = ctx.playlists();

    match args.command {
        PlaylistsCommand::List => {
            let playlists = util::completed(ctx, service.fetch().await)?;
            let out = output::render_list(
                global.output,
                &playlists,
                |p| PlaylistRow::from(p),
                |p| p.playlist_id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PlaylistsCommand::Create { name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(CliError::Validation {
                    field: "name".into(),
                    reason: "playlist name cannot be empty".into(),
                });
            }
            util::succeeded(ctx, service.create(name).await)
        }

        PlaylistsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete playlist {id}?"), global.yes)? {
                return Ok(());
            }
            util::succeeded(ctx, service.delete(id).await)
        }

        PlaylistsCommand::AddFilm { playlist, film } => {
            util::succeeded(ctx, service.add_film(playlist, film).await)
        }
    }
}
