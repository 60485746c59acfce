#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tradewatch_api::models::{
    CreateCopyWalletRequest, PositionStatus, Protocol, TimeFrame, UpdateCopyWalletRequest,
};
use tradewatch_api::traders::{LeaderboardParams, PnlParams, PositionsParams, TraderRef};
use tradewatch_api::{ApiClient, Error, ErrorKind, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_bearer_token_is_attached() {
    let server = MockServer::start().await;
    let transport =
        TransportConfig::default().with_bearer_token(SecretString::from("s3cret".to_owned()));
    let client = ApiClient::new(&server.uri(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "username": "alice",
            "plan": "PREMIUM"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let me = client.me().await.unwrap();
    assert_eq!(me.id, "u1");
    assert_eq!(me.username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_unauthorized_is_http_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "jwt expired",
            "code": "auth.expired"
        })))
        .mount(&server)
        .await;

    let err = client.me().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(err.api_error_code(), Some("auth.expired"));
    assert_eq!(err.to_string(), "HTTP 401: jwt expired");
}

// ── Traders ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_leaderboard_sends_query_params() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/leaderboards/KWENTA"))
        .and(query_param("timeFrame", "D7"))
        .and(query_param("sortBy", "roi"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "account": "0x1", "protocol": "KWENTA", "pnl": 100.0, "roi": 12.5 },
                { "account": "0x2", "protocol": "KWENTA", "pnl": 50.0, "roi": 30.0 }
            ],
            "meta": { "total": 2, "limit": 10, "offset": 0 }
        })))
        .mount(&server)
        .await;

    let page = client
        .leaderboard(&LeaderboardParams {
            protocol: Protocol::Kwenta,
            time_frame: TimeFrame::Week,
            sort_by: "roi".into(),
            limit: 10,
            offset: 0,
        })
        .await
        .unwrap();

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.meta.total, 2);
    assert_eq!(page.data[1].account, "0x2");
}

#[tokio::test]
async fn test_trader_detail() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/traders/GMX/0xabc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account": "0xabc",
            "protocol": "GMX",
            "stats": { "D30": { "pnl": 10.0, "roi": 1.5, "totalWin": 3, "totalLose": 1 } },
            "copyCount": 7
        })))
        .mount(&server)
        .await;

    let profile = client
        .trader(&TraderRef {
            protocol: Protocol::Gmx,
            account: "0xabc".into(),
        })
        .await
        .unwrap();
    assert_eq!(profile.copy_count, 7);
    assert_eq!(profile.stats["D30"].total_win, 3);
}

#[tokio::test]
async fn test_positions_filter_by_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/traders/GMX/0xabc/positions"))
        .and(query_param("status", "open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "p1",
                "account": "0xabc",
                "indexToken": "0xeth",
                "isLong": true,
                "size": 1000.0,
                "status": "open"
            }]
        })))
        .mount(&server)
        .await;

    let page = client
        .trader_positions(&PositionsParams {
            protocol: Protocol::Gmx,
            account: "0xabc".into(),
            status: PositionStatus::Open,
            limit: 50,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(page.data[0].status, PositionStatus::Open);
    assert!(page.data[0].is_long);
    assert_eq!(page.meta.total, 0);
}

#[tokio::test]
async fn test_pnl_series() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/traders/GMX/0xabc/pnl"))
        .and(query_param("timeFrame", "D30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dates": ["2024-06-01T00:00:00Z", null, "2024-06-03T00:00:00Z"],
            "values": [1.0, 2.0, 3.0]
        })))
        .mount(&server)
        .await;

    let series = client
        .trader_pnl(&PnlParams {
            protocol: Protocol::Gmx,
            account: "0xabc".into(),
            time_frame: TimeFrame::Month,
        })
        .await
        .unwrap();
    assert_eq!(series.dates.len(), 3);
    assert!(series.dates[1].is_none());
}

// ── Copy trading ────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_copy_wallet_posts_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/copy-wallets"))
        .and(body_json(json!({ "name": "main", "protocol": "HYPERLIQUID" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "w1",
            "name": "main",
            "balance": 0.0
        })))
        .mount(&server)
        .await;

    let wallet = client
        .create_copy_wallet(&CreateCopyWalletRequest {
            name: "main".into(),
            protocol: Protocol::Hyperliquid,
        })
        .await
        .unwrap();
    assert_eq!(wallet.id, "w1");
}

#[tokio::test]
async fn test_update_copy_wallet_puts_name_only() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/copy-wallets/w1"))
        .and(body_json(json!({ "name": "renamed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "w1",
            "name": "renamed"
        })))
        .mount(&server)
        .await;

    let wallet = client
        .update_copy_wallet(&UpdateCopyWalletRequest {
            id: "w1".into(),
            name: "renamed".into(),
        })
        .await
        .unwrap();
    assert_eq!(wallet.name, "renamed");
}

#[tokio::test]
async fn test_delete_copy_wallet_accepts_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/copy-wallets/w1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_copy_wallet("w1").await.unwrap();
}

#[tokio::test]
async fn test_subscription_absent_decodes_to_none() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    assert!(client.my_subscription().await.unwrap().is_none());
}

// ── Failure taxonomy ────────────────────────────────────────────────

#[tokio::test]
async fn test_decode_error_carries_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/vaults"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let err = client.vaults().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    match err {
        Error::Decode { body, .. } => assert!(body.contains("unexpected")),
        other => panic!("expected Decode error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_plain_text_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/referrals/stats"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client.referral_stats().await.unwrap_err();
    assert_eq!(err.http_status(), Some(502));
    assert!(err.is_transient());
    assert_eq!(err.to_string(), "HTTP 502: bad gateway");
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Nothing listens on the discard port of localhost.
    let client = ApiClient::from_reqwest("http://127.0.0.1:9", reqwest::Client::new()).unwrap();
    let err = client.subscription_plans().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.http_status().is_none());
}
