// ── Domain services ──
//
// Thin bindings of backend endpoints onto the request facade. Mutations
// report success with a toast and return `false` when the facade already
// reported a failure.

mod films;
mod notifications;
mod playlist;

pub use films::FilmService;
pub use notifications::{
    NOTIFICATION_DELETED, NOTIFICATION_QUEUE, NOTIFICATIONS_CLEARED, NotificationService,
};
pub use playlist::{FILM_ADDED, PLAYLIST_CREATED, PLAYLIST_DELETED, PlaylistService};
