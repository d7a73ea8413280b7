// Integration tests for the request facade and domain services using wiremock.
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reelhouse_api::{
    ApiClient, MemoryNavigator, MemoryTokenStore, Session, SessionExpiryPolicy, TokenStore,
    TransportConfig,
};
use reelhouse_core::{
    Failure, FilmService, Notification, NotificationService, Notifier, Playlist, PlaylistService,
    Requester, SearchParams, Severity,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

struct Harness {
    server: MockServer,
    requester: Requester,
    notifier: Arc<RecordingNotifier>,
    store: Arc<MemoryTokenStore>,
    navigator: Arc<MemoryNavigator>,
}

async fn setup() -> Harness {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryTokenStore::with_token("abc123"));
    let navigator = Arc::new(MemoryNavigator::new());
    let session = Arc::new(Session::new(store.clone(), navigator.clone()));
    let client = ApiClient::new(
        &Url::parse(&server.uri()).unwrap(),
        &TransportConfig::default(),
        session,
        SessionExpiryPolicy::default(),
    )
    .unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let requester = Requester::new(Arc::new(client), notifier.clone());
    Harness {
        server,
        requester,
        notifier,
        store,
        navigator,
    }
}

fn favorites() -> serde_json::Value {
    json!({ "results": [{ "playlistId": 1, "playlistName": "Favorites" }] })
}

// ── Request facade ──────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_playlists_returns_list_without_notification() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/playlist/get-user-playlist"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(favorites()))
        .expect(1)
        .mount(&h.server)
        .await;

    let service = PlaylistService::new(h.requester.clone());
    let playlists = service.fetch().await.unwrap();

    assert_eq!(
        playlists,
        vec![Playlist {
            playlist_id: 1,
            playlist_name: "Favorites".into(),
            films: Vec::new(),
        }]
    );
    assert_eq!(service.playlists().len(), 1);
    assert!(h.notifier.take().is_empty());
}

#[tokio::test]
async fn test_unauthorized_redirects_without_notification() {
    let h = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    let service = PlaylistService::new(h.requester.clone());
    assert!(service.fetch().await.is_none());

    assert!(h.store.get().is_none());
    assert_eq!(h.navigator.location().as_deref(), Some("/login"));
    assert!(h.notifier.take().is_empty());
}

#[tokio::test]
async fn test_failure_publishes_exactly_one_error_with_server_message() {
    let h = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/playlist/create-playlist"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Playlist name taken" })),
        )
        .mount(&h.server)
        .await;

    let service = PlaylistService::new(h.requester.clone());
    assert!(!service.create("Favorites").await);

    assert_eq!(h.notifier.take(), vec![Notification::error("Playlist name taken")]);
}

#[tokio::test]
async fn test_failure_without_server_message_uses_error_text() {
    let h = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&h.server)
        .await;

    let result: Option<serde_json::Value> = h.requester.get("/films/search").await;
    assert!(result.is_none());
    assert_eq!(
        h.notifier.take(),
        vec![Notification::error("Request failed with status code 404")]
    );
}

#[tokio::test]
async fn test_result_path_returns_reason_and_stays_quiet() {
    let h = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "message": "bad page" })))
        .mount(&h.server)
        .await;

    let err = h
        .requester
        .try_get::<serde_json::Value>("/films/search")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Failure::Rejected {
            status: 422,
            message: "bad page".into()
        }
    );
    assert!(h.notifier.take().is_empty());

    h.requester.report(&err);
    assert_eq!(h.notifier.take(), vec![Notification::error("bad page")]);
}

// ── Playlists ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_try_fetch_is_quiet_on_failure() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/playlist/get-user-playlist"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "error": "maintenance" })))
        .mount(&h.server)
        .await;

    let service = PlaylistService::new(h.requester.clone());
    let err = service.try_fetch().await.unwrap_err();

    assert_eq!(err.message(), "maintenance");
    assert!(h.notifier.take().is_empty());
    assert!(service.playlists().is_empty());
}

#[tokio::test]
async fn test_create_playlist_notifies_and_refreshes() {
    let h = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/playlist/create-playlist"))
        .and(query_param("playlistName", "Late Night"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/playlist/get-user-playlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "playlistId": 1, "playlistName": "Favorites" },
            { "playlistId": 2, "playlistName": "Late Night" }
        ])))
        .expect(1)
        .mount(&h.server)
        .await;

    let service = PlaylistService::new(h.requester.clone());
    let mut stream = service.subscribe();
    assert!(service.create("Late Night").await);

    let notes = h.notifier.take();
    assert_eq!(notes, vec![Notification::success("Playlist created")]);

    let snapshot = stream.changed().await.unwrap();
    assert!(snapshot.iter().any(|p| p.playlist_name == "Late Night"));
}

#[tokio::test]
async fn test_delete_playlist_filters_cache() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/playlist/get-user-playlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [
            { "playlistId": 1, "playlistName": "Favorites" },
            { "playlistId": 2, "playlistName": "Late Night" }
        ]})))
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/playlists/2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    let service = PlaylistService::new(h.requester.clone());
    service.fetch().await.unwrap();
    assert!(service.delete(2).await);

    let names: Vec<String> = service
        .playlists()
        .iter()
        .map(|p| p.playlist_name.clone())
        .collect();
    assert_eq!(names, vec!["Favorites".to_owned()]);
    assert_eq!(h.notifier.take(), vec![Notification::success("Playlist deleted")]);
}

#[tokio::test]
async fn test_add_film_posts_ids() {
    let h = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/users/add-film-to-user-playlist"))
        .and(body_json(json!({ "playlistId": 4, "filmId": 99 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let service = PlaylistService::new(h.requester.clone());
    assert!(service.add_film(4, 99).await);
    assert_eq!(
        h.notifier.take(),
        vec![Notification::success("Film added to playlist")]
    );
}

// ── Notifications ───────────────────────────────────────────────────

#[tokio::test]
async fn test_notification_delete_and_clear() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/user-notification/get-all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "notificationId": 10, "message": "New release" },
            { "notificationId": 11, "message": "Playlist shared" }
        ])))
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/user-notification/delete"))
        .and(query_param("notificationId", "10"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/user-notification/clear-all"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.server)
        .await;

    let service = NotificationService::new(h.requester.clone());
    assert_eq!(service.fetch().await.unwrap().len(), 2);

    assert!(service.delete(10).await);
    assert_eq!(service.notifications().len(), 1);
    assert_eq!(service.notifications()[0].notification_id, 11);

    assert!(service.clear_all().await);
    assert!(service.notifications().is_empty());

    let severities: Vec<(Severity, String)> = h
        .notifier
        .take()
        .into_iter()
        .map(|n| (n.severity, n.message))
        .collect();
    assert_eq!(
        severities,
        vec![
            (Severity::Success, "Notification deleted".to_owned()),
            (Severity::Success, "All notifications cleared".to_owned()),
        ]
    );
}

#[tokio::test]
async fn test_failed_clear_keeps_cache() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/user-notification/get-all"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "results": [{ "notificationId": 1, "message": "hi" }] })),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.server)
        .await;

    let service = NotificationService::new(h.requester.clone());
    service.fetch().await.unwrap();
    assert!(!service.clear_all().await);
    assert_eq!(service.notifications().len(), 1);
    assert_eq!(h.notifier.take().len(), 1);
}

// ── Films ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_search_passes_parameters() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/films/search"))
        .and(query_param("query", "noir"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "filmId": 3, "title": "The Third Man", "releaseYear": 1949 }],
            "page": 2,
            "totalPages": 4,
            "totalResults": 61
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let films = FilmService::new(h.requester.clone());
    let page = films
        .search(&SearchParams::new("noir").page(2))
        .await
        .unwrap();

    assert_eq!(page.results[0].title, "The Third Man");
    assert_eq!(page.results[0].release_year, Some(1949));
    assert_eq!(page.total_results, Some(61));
}
