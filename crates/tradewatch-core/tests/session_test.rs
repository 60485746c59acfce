#![allow(clippy::unwrap_used)]
// End-to-end tests for `Session` against a wiremock backend.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tradewatch_api::copy_trade::ListCopyWallets;
use tradewatch_api::models::{
    CopyWallet, CreateCopyWalletRequest, PlanTier, Protocol, TimeFrame, UpdateProfileRequest,
};
use tradewatch_api::traders::TraderRef;
use tradewatch_core::{CacheSettings, QueryKey, QueryStatus, Session, SessionConfig, StorageBackend};

// ── Helpers ─────────────────────────────────────────────────────────

fn cache() -> CacheSettings {
    CacheSettings {
        stale_time: Duration::from_secs(60),
        gc_time: Duration::from_secs(60),
        retry: 0,
        retry_delay: Duration::ZERO,
        invalidation_delay: Duration::from_millis(50),
    }
}

fn config(server: &MockServer) -> SessionConfig {
    SessionConfig::new(Url::parse(&server.uri()).unwrap()).with_cache(cache())
}

fn signed_in(server: &MockServer) -> Session {
    Session::new(config(server).with_token(SecretString::from("t0ken".to_owned()))).unwrap()
}

fn wallets(ids: &[&str]) -> serde_json::Value {
    ids.iter()
        .map(|id| json!({ "id": id, "name": format!("wallet {id}") }))
        .collect()
}

fn wallets_key() -> QueryKey {
    QueryKey::for_endpoint::<ListCopyWallets>(&())
}

async fn mount_wallets(server: &MockServer, ids: &[&str], times: u64) {
    Mock::given(method("GET"))
        .and(path("/copy-wallets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wallets(ids)))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

// ── Queries ─────────────────────────────────────────────────────────

#[tokio::test]
async fn current_leaderboard_follows_protocol_selection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leaderboards/KWENTA"))
        .and(query_param("timeFrame", "D7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "account": "0x1", "protocol": "KWENTA", "pnl": 100.0, "roi": 12.5 },
                { "account": "0x2", "protocol": "KWENTA", "pnl": 50.0, "roi": 30.0 }
            ],
            "meta": { "total": 2, "limit": 20, "offset": 0 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(config(&server)).unwrap();
    session.select_protocol(Protocol::Kwenta);
    session.select_time_frame(TimeFrame::Week);
    assert!(session.toggle_favourite(TraderRef {
        protocol: Protocol::Kwenta,
        account: "0x2".into(),
    }));

    let mut board = session.current_leaderboard().unwrap();
    let state = board.wait_settled().await.unwrap();
    assert_eq!(state.status, QueryStatus::Success);

    let page = state.data.unwrap();
    let rows = session.leaderboard_view(&page);
    let accounts: Vec<&str> = rows.iter().map(|r| r.account.as_str()).collect();
    assert_eq!(accounts, vec!["0x2", "0x1"]);
    assert_eq!(rows[0].rank, 2);
    assert!(rows[0].is_favourite);

    // A second observer is served from cache.
    let again = session.current_leaderboard().unwrap();
    assert!(again.data().is_some());
}

#[tokio::test]
async fn user_queries_wait_for_sign_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/copy-wallets"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wallets(&["w1"])))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(config(&server)).unwrap();
    assert!(!session.is_authenticated());

    let anonymous = session.copy_wallets().unwrap();
    assert!(!anonymous.is_enabled());
    assert_eq!(anonymous.state().status, QueryStatus::Idle);
    drop(anonymous);

    session
        .sign_in("0xme", SecretString::from("fresh".to_owned()))
        .unwrap();
    assert!(session.is_authenticated());
    assert_eq!(session.profile().get_state().wallet_address.as_deref(), Some("0xme"));

    let mut observer = session.copy_wallets().unwrap();
    let state = observer.wait_settled().await.unwrap();
    assert_eq!(state.data.unwrap().len(), 1);
}

#[tokio::test]
async fn sign_out_drops_user_scoped_queries() {
    let server = MockServer::start().await;
    mount_wallets(&server, &["w1"], 1).await;
    Mock::given(method("GET"))
        .and(path("/vaults"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let session = signed_in(&server);
    session
        .queries()
        .set_data(wallets_key(), Vec::<CopyWallet>::new())
        .unwrap();
    let mut vaults = session.vaults().unwrap();
    vaults.wait_settled().await.unwrap();

    session.sign_out().unwrap();

    assert!(!session.is_authenticated());
    assert!(!session.queries().contains(&wallets_key()));
    assert!(session.queries().contains(vaults.key()));
    assert!(session.profile().get_state().wallet_address.is_none());
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_refetches_wallets_after_delay() {
    let server = MockServer::start().await;
    mount_wallets(&server, &["w1"], 1).await;
    mount_wallets(&server, &["w1", "w2"], 10).await;
    Mock::given(method("POST"))
        .and(path("/copy-wallets"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": "w2", "name": "wallet w2" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = signed_in(&server);
    let mut observer = session.copy_wallets().unwrap();
    let first = observer.wait_settled().await.unwrap();
    assert_eq!(first.data.unwrap().len(), 1);

    let created = session
        .create_copy_wallet(CreateCopyWalletRequest {
            name: "wallet w2".into(),
            protocol: Protocol::Gmx,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "w2");

    // Nothing refetched until the invalidation delay has passed.
    assert_eq!(observer.data().unwrap().len(), 1);

    let refreshed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = observer.changed().await.unwrap();
            if state.is_success() && state.data.as_ref().is_some_and(|d| d.len() == 2) {
                break state;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(refreshed.data.unwrap()[1].id, "w2");
}

#[tokio::test]
async fn failed_delete_restores_wallet() {
    let server = MockServer::start().await;
    mount_wallets(&server, &["w1", "w2"], 10).await;
    Mock::given(method("DELETE"))
        .and(path("/copy-wallets/w1"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "message": "boom" }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let session = signed_in(&server);
    let mut observer = session.copy_wallets().unwrap();
    observer.wait_settled().await.unwrap();

    let deleting = {
        let session = session.clone();
        tokio::spawn(async move { session.delete_copy_wallet("w1").await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let optimistic = session
        .queries()
        .get_data::<Vec<CopyWallet>>(&wallets_key())
        .unwrap();
    assert_eq!(optimistic.len(), 1);
    assert_eq!(optimistic[0].id, "w2");

    assert!(deleting.await.unwrap().is_err());

    let restored = observer.wait_settled().await.unwrap();
    assert_eq!(restored.data.unwrap().len(), 2);
}

#[tokio::test]
async fn delete_forgets_saved_order() {
    let server = MockServer::start().await;
    mount_wallets(&server, &["w2"], 10).await;
    Mock::given(method("DELETE"))
        .and(path("/copy-wallets/w1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let session = signed_in(&server);
    session.set_copy_wallet_order(vec!["w1".into(), "w2".into()]);

    session.delete_copy_wallet("w1").await.unwrap();

    assert_eq!(session.profile().get_state().copy_wallet_order, vec!["w2".to_owned()]);
}

#[tokio::test]
async fn update_profile_mirrors_into_state() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "username": "alice",
            "plan": "VIP"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = signed_in(&server);
    let profile = session
        .update_profile(UpdateProfileRequest {
            username: "alice".into(),
        })
        .await
        .unwrap();
    assert_eq!(profile.id, "u1");

    let state = session.profile().get_state();
    assert_eq!(state.display_name.as_deref(), Some("alice"));
    assert_eq!(state.plan, PlanTier::Vip);

    // The cached profile is already up to date.
    let me = session.me().unwrap();
    assert_eq!(me.data().unwrap().username.as_deref(), Some("alice"));
}

// ── Persistence ─────────────────────────────────────────────────────

#[tokio::test]
async fn preferences_survive_restart() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageBackend::Directory(dir.path().to_path_buf());
    let trader = TraderRef {
        protocol: Protocol::Gmx,
        account: "0xabc".into(),
    };

    {
        let session = Session::new(config(&server).with_storage(storage.clone())).unwrap();
        session.select_protocol(Protocol::Hyperliquid);
        session.toggle_favourite(trader.clone());
        session
            .sign_in("0xme", SecretString::from("t0ken".to_owned()))
            .unwrap();
    }

    let session = Session::new(config(&server).with_storage(storage)).unwrap();
    assert_eq!(session.protocol().get_state().protocol, Protocol::Hyperliquid);

    let profile = session.profile().get_state();
    assert!(profile.is_favourite(&trader));
    assert_eq!(profile.wallet_address.as_deref(), Some("0xme"));
    assert!(!profile.is_signed_in());
    assert!(!session.is_authenticated());
}
