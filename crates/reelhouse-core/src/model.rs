// ── Domain model ──
//
// Wire shapes for the entities the backend hands out. Field names follow
// the backend's camelCase JSON.

use serde::{Deserialize, Serialize};

pub type PlaylistId = i64;
pub type FilmId = i64;
pub type NotificationId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub playlist_id: PlaylistId,
    pub playlist_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub films: Vec<Film>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub film_id: FilmId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
}

/// A persisted notification in the user's inbox (not a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotification {
    pub notification_id: NotificationId,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub read: bool,
}

// ── Payload envelopes ────────────────────────────────────────────────

/// A list response: either `{"results": [...]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Wrapped { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListPayload<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Wrapped { results } | Self::Bare(results) => results,
        }
    }
}

/// One page of results plus whatever paging metadata came with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PagePayload<T>")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: Option<u32>,
    pub total_pages: Option<u32>,
    pub total_results: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PagePayload<T> {
    #[serde(rename_all = "camelCase")]
    Paged {
        results: Vec<T>,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        total_pages: Option<u32>,
        #[serde(default)]
        total_results: Option<u64>,
    },
    Bare(Vec<T>),
}

impl<T> From<PagePayload<T>> for Page<T> {
    fn from(payload: PagePayload<T>) -> Self {
        match payload {
            PagePayload::Paged {
                results,
                page,
                total_pages,
                total_results,
            } => Self {
                results,
                page,
                total_pages,
                total_results,
            },
            PagePayload::Bare(results) => Self {
                results,
                page: None,
                total_pages: None,
                total_results: None,
            },
        }
    }
}

// ── Request shapes ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFilmRequest {
    pub playlist_id: PlaylistId,
    pub film_id: FilmId,
}

/// Film search parameters. Unset paging fields are left to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut out = vec![("query".to_owned(), self.query.clone())];
        if let Some(page) = self.page {
            out.push(("page".to_owned(), page.to_string()));
        }
        if let Some(size) = self.size {
            out.push(("size".to_owned(), size.to_string()));
        }
        out
    }
}
