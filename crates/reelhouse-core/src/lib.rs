// reelhouse-core: Request facade, notifications and domain services on top of reelhouse-api.

pub mod app;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod request;
pub mod services;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use app::AppContext;
pub use config::{ClientConfig, RealtimeSettings};
pub use error::{Failure, UNKNOWN_ERROR};
pub use notify::{NoopNotifier, Notification, NotificationBus, Notifier, Severity};
pub use request::Requester;
pub use services::{FilmService, NotificationService, PlaylistService};
pub use store::ListCache;
pub use stream::EntityStream;

pub use model::{
    AddFilmRequest, Film, FilmId, ListPayload, NotificationId, Page, Playlist, PlaylistId,
    SearchParams, UserNotification,
};

// Transport types embedders need to build an `AppContext`.
pub use reelhouse_api::{
    MemoryNavigator, MemoryTokenStore, Navigator, SessionExpiryPolicy, TlsMode, TokenStore,
};
