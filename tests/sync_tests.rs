//! Integration tests for the sync pass: ownership filtering, bounded
//! concurrency, progress reporting and snapshot publishing.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use spotidash::{AppError, CatalogClient, Config, SnapshotStore, SyncOrchestrator};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn connect(server: &MockServer) -> CatalogClient {
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user1",
            "display_name": "Test User"
        })))
        .mount(server)
        .await;

    let config = Config {
        access_token: "test-token".to_string(),
        api_base: server.uri(),
    };

    CatalogClient::new(&config).await.unwrap()
}

fn page(items: Vec<Value>, total: usize) -> Value {
    json!({
        "href": "",
        "items": items,
        "limit": 100,
        "next": null,
        "offset": 0,
        "previous": null,
        "total": total
    })
}

fn track_item(id: &str, name: &str, added_at: &str) -> Value {
    json!({
        "added_at": added_at,
        "track": {
            "type": "track",
            "id": id,
            "name": name,
            "uri": format!("spotify:track:{id}"),
            "duration_ms": 180000,
            "is_local": false,
            "artists": [{ "name": "Artist" }],
            "album": { "images": [] }
        }
    })
}

fn playlist_json(id: &str, name: &str, owner: &str, collaborative: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "collaborative": collaborative,
        "images": [],
        "owner": { "id": owner, "display_name": owner }
    })
}

async fn mount_playlists(server: &MockServer, playlists: Vec<Value>) {
    let total = playlists.len();
    Mock::given(method("GET"))
        .and(path("/users/user1/playlists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(playlists, total)))
        .mount(server)
        .await;
}

async fn mount_tracks(server: &MockServer, playlist_id: &str, items: Vec<Value>) {
    let total = items.len();
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{playlist_id}/tracks")))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(items, total)))
        .mount(server)
        .await;
}

async fn mount_tracks_delayed(
    server: &MockServer,
    playlist_id: &str,
    items: Vec<Value>,
    delay: Duration,
) {
    let total = items.len();
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{playlist_id}/tracks")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(items, total))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

async fn mount_liked(server: &MockServer, items: Vec<Value>) {
    let total = items.len();
    Mock::given(method("GET"))
        .and(path("/me/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(items, total)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sync_skips_playlists_the_user_cannot_edit() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    mount_playlists(
        &server,
        vec![
            playlist_json("p1", "Mine", "user1", false),
            playlist_json("p2", "Shared", "someone-else", true),
            playlist_json("p3", "Editorial", "someone-else", false),
        ],
    )
    .await;

    // No track mock for p3: requesting it would fail the pass.
    mount_tracks(
        &server,
        "p1",
        vec![track_item("t1", "One", "2024-01-01T00:00:00Z")],
    )
    .await;
    mount_tracks(
        &server,
        "p2",
        vec![track_item("t2", "Two", "2024-01-02T00:00:00Z")],
    )
    .await;
    mount_liked(
        &server,
        vec![track_item("t9", "Liked", "2024-02-01T00:00:00Z")],
    )
    .await;

    let orchestrator = SyncOrchestrator::new(client, SnapshotStore::new());
    let progress: Mutex<Vec<String>> = Mutex::new(Vec::new());

    let snapshot = orchestrator
        .sync(|msg| progress.lock().unwrap().push(msg.to_string()))
        .await
        .unwrap();

    // All playlists are listed, only editable ones carry tracks.
    assert_eq!(snapshot.playlists.len(), 3);
    let synced: Vec<&str> = snapshot
        .playlists_and_tracks
        .iter()
        .map(|pt| pt.playlist.id.as_str())
        .collect();
    assert_eq!(synced, vec!["p1", "p2"]);
    assert_eq!(snapshot.liked_tracks.len(), 1);
    assert_eq!(snapshot.liked_tracks[0].track.name, "Liked");

    let progress = progress.into_inner().unwrap();
    assert_eq!(
        progress,
        vec!["Loaded 1 of 2 playlists", "Loaded 2 of 2 playlists"]
    );
}

#[tokio::test]
async fn sync_reports_completions_as_they_arrive_and_keeps_input_order() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    mount_playlists(
        &server,
        vec![
            playlist_json("p1", "Slow", "user1", false),
            playlist_json("p2", "Medium", "user1", false),
            playlist_json("p3", "Fast", "user1", false),
        ],
    )
    .await;

    // Staggered delays, so completions arrive in reverse playlist order.
    for (id, millis) in [("p1", 400u64), ("p2", 200), ("p3", 50)] {
        mount_tracks_delayed(
            &server,
            id,
            vec![track_item(
                &format!("{id}-t"),
                "Song",
                "2024-01-01T00:00:00Z",
            )],
            Duration::from_millis(millis),
        )
        .await;
    }
    mount_liked(&server, Vec::new()).await;

    let orchestrator = SyncOrchestrator::new(client, SnapshotStore::new()).with_concurrency(3);

    let started = Instant::now();
    let progress: Mutex<Vec<(String, Duration)>> = Mutex::new(Vec::new());
    let snapshot = orchestrator
        .sync(|msg| {
            progress
                .lock()
                .unwrap()
                .push((msg.to_string(), started.elapsed()));
        })
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // Staggered fetches in parallel track the slowest one (400ms), not
    // the 650ms sum.
    assert!(
        elapsed < Duration::from_millis(600),
        "fetches ran sequentially: {:?}",
        elapsed
    );

    // Progress counts completions, whatever order they land in.
    let progress = progress.into_inner().unwrap();
    let messages: Vec<&str> = progress.iter().map(|(msg, _)| msg.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Loaded 1 of 3 playlists",
            "Loaded 2 of 3 playlists",
            "Loaded 3 of 3 playlists",
        ]
    );

    // The fastest fetch reports while the slowest is still in flight;
    // callbacks held back until the whole fan-out settled would all land
    // at 400ms or later.
    assert!(
        progress[0].1 < Duration::from_millis(350),
        "first completion reported at {:?}",
        progress[0].1
    );

    // Snapshot order follows the playlist listing, not completion order.
    let synced: Vec<&str> = snapshot
        .playlists_and_tracks
        .iter()
        .map(|pt| pt.playlist.id.as_str())
        .collect();
    assert_eq!(synced, vec!["p1", "p2", "p3"]);
}

#[tokio::test]
async fn sync_with_concurrency_one_still_completes() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    mount_playlists(
        &server,
        vec![
            playlist_json("p1", "First", "user1", false),
            playlist_json("p2", "Second", "user1", false),
        ],
    )
    .await;
    mount_tracks(
        &server,
        "p1",
        vec![track_item("t1", "One", "2024-01-01T00:00:00Z")],
    )
    .await;
    mount_tracks(
        &server,
        "p2",
        vec![track_item("t2", "Two", "2024-01-02T00:00:00Z")],
    )
    .await;
    mount_liked(&server, Vec::new()).await;

    let orchestrator = SyncOrchestrator::new(client, SnapshotStore::new()).with_concurrency(1);
    let progress: Mutex<Vec<String>> = Mutex::new(Vec::new());

    let snapshot = orchestrator
        .sync(|msg| progress.lock().unwrap().push(msg.to_string()))
        .await
        .unwrap();

    assert_eq!(snapshot.playlists_and_tracks.len(), 2);
    assert_eq!(
        progress.into_inner().unwrap(),
        vec!["Loaded 1 of 2 playlists", "Loaded 2 of 2 playlists"]
    );
}

#[tokio::test]
async fn sync_accepts_an_oversized_concurrency_cap() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    mount_playlists(&server, vec![playlist_json("p1", "Mine", "user1", false)]).await;
    mount_tracks(
        &server,
        "p1",
        vec![track_item("t1", "One", "2024-01-01T00:00:00Z")],
    )
    .await;
    mount_liked(&server, Vec::new()).await;

    let orchestrator =
        SyncOrchestrator::new(client, SnapshotStore::new()).with_concurrency(usize::MAX);

    let snapshot = orchestrator.sync(|_| {}).await.unwrap();

    assert_eq!(snapshot.playlists_and_tracks.len(), 1);
}

#[tokio::test]
async fn sync_fails_the_whole_pass_when_one_fetch_fails() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    mount_playlists(
        &server,
        vec![
            playlist_json("p1", "Fine", "user1", false),
            playlist_json("p2", "Broken", "user1", false),
        ],
    )
    .await;
    mount_tracks(
        &server,
        "p1",
        vec![track_item("t1", "One", "2024-01-01T00:00:00Z")],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/playlists/p2/tracks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = SnapshotStore::new();
    let orchestrator = SyncOrchestrator::new(client, store.clone());

    let result = orchestrator.sync(|_| {}).await;

    assert!(matches!(result, Err(AppError::Api { status: 500, .. })));

    // The playlist listing was already published; the failed stage and
    // everything after it were not.
    let snapshot = store.snapshot();
    assert_eq!(snapshot.playlists.len(), 2);
    assert!(snapshot.playlists_and_tracks.is_empty());
    assert!(snapshot.liked_tracks.is_empty());
}

#[tokio::test]
async fn failed_pass_keeps_track_data_from_the_previous_pass() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    mount_playlists(&server, vec![playlist_json("p1", "Mine", "user1", false)]).await;
    mount_tracks(
        &server,
        "p1",
        vec![track_item("t1", "Old Favorite", "2024-01-01T00:00:00Z")],
    )
    .await;
    mount_liked(
        &server,
        vec![track_item("t2", "Liked", "2024-01-01T00:00:00Z")],
    )
    .await;

    let store = SnapshotStore::new();
    let orchestrator = SyncOrchestrator::new(client, store.clone());
    orchestrator.sync(|_| {}).await.unwrap();

    // Second pass: the listing now has a new playlist, but every track
    // fetch fails.
    server.reset().await;
    mount_playlists(
        &server,
        vec![
            playlist_json("p1", "Mine", "user1", false),
            playlist_json("p4", "Brand New", "user1", false),
        ],
    )
    .await;
    for id in ["p1", "p4"] {
        Mock::given(method("GET"))
            .and(path(format!("/playlists/{id}/tracks")))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
    }

    let result = orchestrator.sync(|_| {}).await;
    assert!(result.is_err());

    // The new listing landed before the failure; track data is still from
    // the first pass.
    let snapshot = store.snapshot();
    assert_eq!(snapshot.playlists.len(), 2);
    assert_eq!(snapshot.playlists_and_tracks.len(), 1);
    assert_eq!(
        snapshot.playlists_and_tracks[0].entries[0].track.name,
        "Old Favorite"
    );
    assert_eq!(snapshot.liked_tracks.len(), 1);
}

#[tokio::test]
async fn sync_of_an_empty_library_yields_an_empty_snapshot() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    mount_playlists(&server, Vec::new()).await;
    mount_liked(&server, Vec::new()).await;

    let orchestrator = SyncOrchestrator::new(client, SnapshotStore::new());
    let progress: Mutex<Vec<String>> = Mutex::new(Vec::new());

    let snapshot = orchestrator
        .sync(|msg| progress.lock().unwrap().push(msg.to_string()))
        .await
        .unwrap();

    assert!(snapshot.playlists.is_empty());
    assert!(snapshot.playlists_and_tracks.is_empty());
    assert!(snapshot.liked_tracks.is_empty());
    assert!(progress.into_inner().unwrap().is_empty());
}
