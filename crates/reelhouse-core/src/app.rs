// ── Application context ──
//
// Wires one session, one HTTP client, one realtime channel and the domain
// services together. Embedders build exactly one of these per process and
// pass it around; nothing here is global.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reelhouse_api::{ApiClient, Navigator, RealtimeChannel, Session, TokenStore};
use secrecy::SecretString;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::notify::Notifier;
use crate::request::Requester;
use crate::services::{FilmService, NotificationService, PlaylistService};

pub struct AppContext {
    config: ClientConfig,
    session: Arc<Session>,
    requester: Requester,
    realtime: RealtimeChannel,
    playlists: PlaylistService,
    notifications: NotificationService,
    films: FilmService,
    follower: ArcSwapOption<AbortHandle>,
}

impl AppContext {
    pub fn new(
        config: ClientConfig,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, reelhouse_api::Error> {
        let session = Arc::new(
            Session::new(tokens, navigator).with_login_route(config.login_route.clone()),
        );
        let client = Arc::new(ApiClient::new(
            &config.website_url,
            &config.transport(),
            Arc::clone(&session),
            config.session_expiry,
        )?);
        let realtime = RealtimeChannel::new(config.realtime_config()?, Arc::clone(&session));
        let requester = Requester::new(client, notifier);

        debug!(url = %config.website_url, "application context built");

        Ok(Self {
            playlists: PlaylistService::new(requester.clone()),
            notifications: NotificationService::new(requester.clone()),
            films: FilmService::new(requester.clone()),
            config,
            session,
            requester,
            realtime,
            follower: ArcSwapOption::empty(),
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }

    pub fn realtime(&self) -> &RealtimeChannel {
        &self.realtime
    }

    pub fn playlists(&self) -> &PlaylistService {
        &self.playlists
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    pub fn films(&self) -> &FilmService {
        &self.films
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the realtime channel and start following pushed notifications.
    /// Must run inside a Tokio runtime.
    pub fn mount(&self) {
        if self.follower.load().is_none() {
            let handle = self.notifications.follow(&self.realtime);
            self.follower.store(Some(Arc::new(handle.abort_handle())));
        }
        self.realtime.connect();
        info!("application mounted");
    }

    /// Close the realtime channel. Safe to call when not mounted.
    pub fn unmount(&self) {
        if let Some(follower) = self.follower.swap(None) {
            follower.abort();
        }
        self.realtime.disconnect();
        info!("application unmounted");
    }

    /// [`unmount`](Self::unmount), waiting for the socket to close cleanly.
    pub async fn shutdown(&self) {
        if let Some(follower) = self.follower.swap(None) {
            follower.abort();
        }
        self.realtime.shutdown().await;
    }

    /// Store a fresh credential and (re)open the realtime channel with it.
    pub fn sign_in(&self, token: &SecretString) -> Result<(), reelhouse_api::Error> {
        self.session.sign_in(token)?;
        if self.follower.load().is_some() {
            self.realtime.connect();
        }
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), reelhouse_api::Error> {
        self.realtime.disconnect();
        self.session.sign_out()
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("website_url", &self.config.website_url.as_str())
            .field("session", &self.session)
            .field("realtime", &self.realtime)
            .finish_non_exhaustive()
    }
}
