//! Admin router over a real SQLite store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use nostr_ingest::store::{AuthorList, PoolSettings, SqliteStore, Store};
use nostr_ingest::{admin, AuthContext, Limits, Relay, RelayStats, VERSION};
use nostr_ingest_testkit::{now, TestFixture};

fn sqlite_relay(dir: &tempfile::TempDir) -> Arc<Relay<SqliteStore>> {
    let store = SqliteStore::open(dir.path().join("admin.sqlite"), PoolSettings::default()).unwrap();
    Arc::new(Relay::new(Arc::new(store), Limits::default()))
}

async fn get_info(relay: &Arc<Relay<SqliteStore>>) -> RelayStats {
    let response = admin::router(relay.clone())
        .oneshot(Request::get("/info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_info_counts_events() {
    let dir = tempfile::tempdir().unwrap();
    let relay = sqlite_relay(&dir);
    let fixture = TestFixture::new();

    for i in 0..3 {
        relay
            .publish(&fixture.make_event(1, now(), &format!("note {i}")))
            .await
            .unwrap();
    }

    let info = get_info(&relay).await;
    assert_eq!(info.version, VERSION);
    assert_eq!(info.num_events, 3);
    assert!(info.num_sessions >= 1);
    assert!(info.supported_nips.contains(&1));
}

#[tokio::test]
async fn test_reload_endpoint_applies_block_list() {
    let dir = tempfile::tempdir().unwrap();
    let relay = sqlite_relay(&dir);
    let fixture = TestFixture::new();
    let note = fixture.make_event(1, now(), "hello");

    assert!(relay.accept_event(&note, &AuthContext::anonymous()).accepted);

    relay
        .store()
        .add_author(AuthorList::Block, &fixture.public_key())
        .await
        .unwrap();

    let response = admin::router(relay.clone())
        .oneshot(Request::post("/reload").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());

    let decision = relay.accept_event(&note, &AuthContext::anonymous());
    assert!(!decision.accepted);
    assert!(decision.reason.unwrap().starts_with("blocked:"));
}
