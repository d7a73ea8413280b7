use reelhouse_api::ApiRequest;
use serde::de::IgnoredAny;
use tracing::debug;

use crate::error::Failure;
use crate::model::{AddFilmRequest, FilmId, ListPayload, Playlist, PlaylistId};
use crate::request::Requester;
use crate::store::ListCache;
use crate::stream::{EntityStream, Snapshot};

const LIST_PATH: &str = "/playlist/get-user-playlist";
const CREATE_PATH: &str = "/playlist/create-playlist";
const ADD_FILM_PATH: &str = "/users/add-film-to-user-playlist";

pub const PLAYLIST_CREATED: &str = "Playlist created";
pub const PLAYLIST_DELETED: &str = "Playlist deleted";
pub const FILM_ADDED: &str = "Film added to playlist";

/// The signed-in user's playlists.
#[derive(Debug)]
pub struct PlaylistService {
    requester: Requester,
    cache: ListCache<Playlist>,
}

impl PlaylistService {
    pub fn new(requester: Requester) -> Self {
        Self {
            requester,
            cache: ListCache::new(),
        }
    }

    pub fn playlists(&self) -> Snapshot<Playlist> {
        self.cache.snapshot()
    }

    pub fn subscribe(&self) -> EntityStream<Playlist> {
        self.cache.subscribe()
    }

    /// Load the list from the backend and replace the cache with it.
    pub async fn fetch(&self) -> Option<Vec<Playlist>> {
        match self.try_fetch().await {
            Ok(playlists) => Some(playlists),
            Err(failure) => {
                self.requester.report(&failure);
                None
            }
        }
    }

    /// [`fetch`](Self::fetch) without the error toast.
    pub async fn try_fetch(&self) -> Result<Vec<Playlist>, Failure> {
        let payload: ListPayload<Playlist> = self.requester.try_get(LIST_PATH).await?;
        let playlists = payload.into_vec();
        debug!(count = playlists.len(), "playlists fetched");
        self.cache.replace(playlists.clone());
        Ok(playlists)
    }

    /// Create a playlist, then re-fetch so it shows up in the cache.
    pub async fn create(&self, name: &str) -> bool {
        let request = ApiRequest::post(CREATE_PATH).query("playlistName", name);
        if self.requester.execute::<IgnoredAny>(request).await.is_none() {
            return false;
        }
        self.requester.notifier().success(PLAYLIST_CREATED);
        self.fetch().await;
        true
    }

    pub async fn delete(&self, id: PlaylistId) -> bool {
        let path = format!("/users/playlists/{id}");
        if self.requester.delete::<IgnoredAny>(&path).await.is_none() {
            return false;
        }
        self.requester.notifier().success(PLAYLIST_DELETED);
        self.cache.retain(|p| p.playlist_id != id);
        true
    }

    pub async fn add_film(&self, playlist_id: PlaylistId, film_id: FilmId) -> bool {
        let body = AddFilmRequest {
            playlist_id,
            film_id,
        };
        if self
            .requester
            .post::<IgnoredAny, _>(ADD_FILM_PATH, &body)
            .await
            .is_none()
        {
            return false;
        }
        self.requester.notifier().success(FILM_ADDED);
        true
    }
}
