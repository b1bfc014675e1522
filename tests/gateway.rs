//! End-to-end tests against a real listener: REST payouts and the
//! WebSocket block feed.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_test::assert_ok;
use tokio_tungstenite::tungstenite::Message;

use faucet_gateway::api::build_app;
use faucet_gateway::app_state::{AppState, PublicUrls, WsSettings};
use faucet_gateway::domain::{BlockEvent, FundRecord, Hub, ReservationManager, ReservationPolicy};
use faucet_gateway::service::{FaucetService, run_block_ingestion};
use faucet_gateway::wallet::MemoryWallet;

const FAUCET_ADDR: &str = "faucet-self";

struct Harness {
    addr: SocketAddr,
    wallet: MemoryWallet,
    hub: Hub,
}

async fn start(funds: Vec<FundRecord>) -> Harness {
    start_with(funds, false).await
}

async fn start_with(funds: Vec<FundRecord>, echo: bool) -> Harness {
    let wallet = MemoryWallet::new(FAUCET_ADDR, funds);
    let hub = Hub::spawn(64);
    let faucet = FaucetService::new(
        Arc::new(wallet.clone()),
        ReservationManager::new(ReservationPolicy::default()),
        FAUCET_ADDR.to_string(),
    );

    let app = build_app(AppState {
        faucet: Arc::new(faucet),
        hub: hub.clone(),
        ws: WsSettings {
            queue_depth: 16,
            echo,
        },
        urls: Arc::new(PublicUrls {
            http_url: "http://localhost".to_string(),
            ws_url: "ws://localhost".to_string(),
        }),
    });

    let listener = assert_ok!(tokio::net::TcpListener::bind("127.0.0.1:0").await);
    let addr = assert_ok!(listener.local_addr());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    tokio::spawn({
        let wallet = Arc::new(wallet.clone());
        let hub = hub.clone();
        async move {
            let _ = run_block_ingestion(wallet, hub).await;
        }
    });
    while wallet.open_streams().await == 0 {
        tokio::task::yield_now().await;
    }

    Harness { addr, wallet, hub }
}

async fn wait_for_subscribers(hub: &Hub, n: usize) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while assert_ok!(hub.connection_count().await) != n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "hub never reached {n} subscribers");
}

#[tokio::test]
async fn new_block_reaches_websocket_subscriber() {
    let h = start(Vec::new()).await;

    let (mut socket, _) = assert_ok!(
        tokio_tungstenite::connect_async(format!("ws://{}/ws", h.addr)).await
    );
    wait_for_subscribers(&h.hub, 1).await;

    h.wallet
        .push_block(BlockEvent {
            block_id: vec![0xca, 0xfe],
            height: 7,
            producer_id: "producer-a".to_string(),
            txids: vec![vec![0x01, 0x02]],
        })
        .await;

    let next = tokio::time::timeout(Duration::from_secs(5), socket.next()).await;
    let Ok(Some(Ok(Message::Text(text)))) = next else {
        panic!("expected a text frame");
    };
    let json: Value = assert_ok!(serde_json::from_str(text.as_str()));
    assert_eq!(json["blockID"], "cafe");
    assert_eq!(json["height"], 7);
    assert_eq!(json["producerID"], "producer-a");
    assert_eq!(json["txids"], serde_json::json!(["0102"]));
}

#[tokio::test]
async fn closed_socket_is_unregistered() {
    let h = start(Vec::new()).await;

    let (socket, _) = assert_ok!(
        tokio_tungstenite::connect_async(format!("ws://{}/ws", h.addr)).await
    );
    wait_for_subscribers(&h.hub, 1).await;

    drop(socket);
    wait_for_subscribers(&h.hub, 0).await;
}

async fn next_text<S>(socket: &mut S) -> String
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let next = tokio::time::timeout(Duration::from_secs(5), socket.next()).await;
    let Ok(Some(Ok(Message::Text(text)))) = next else {
        panic!("expected a text frame");
    };
    text.as_str().to_string()
}

#[tokio::test]
async fn echo_rebroadcasts_text_to_every_subscriber() {
    let h = start_with(Vec::new(), true).await;
    let url = format!("ws://{}/ws", h.addr);

    let (mut a, _) = assert_ok!(tokio_tungstenite::connect_async(url.as_str()).await);
    let (mut b, _) = assert_ok!(tokio_tungstenite::connect_async(url.as_str()).await);
    wait_for_subscribers(&h.hub, 2).await;

    assert_ok!(a.send(Message::text("hello")).await);

    assert_eq!(next_text(&mut b).await, "hello");
    assert_eq!(next_text(&mut a).await, "hello");
}

#[tokio::test]
async fn text_is_not_echoed_when_disabled() {
    let h = start(Vec::new()).await;
    let url = format!("ws://{}/ws", h.addr);

    let (mut a, _) = assert_ok!(tokio_tungstenite::connect_async(url.as_str()).await);
    let (mut b, _) = assert_ok!(tokio_tungstenite::connect_async(url.as_str()).await);
    wait_for_subscribers(&h.hub, 2).await;

    assert_ok!(a.send(Message::text("hello")).await);
    h.wallet
        .push_block(BlockEvent {
            block_id: vec![0x01],
            height: 1,
            producer_id: "producer-a".to_string(),
            txids: Vec::new(),
        })
        .await;

    // The block is the only thing either side receives.
    for socket in [&mut a, &mut b] {
        let json: Value = assert_ok!(serde_json::from_str(&next_text(socket).await));
        assert_eq!(json["height"], 1);
        let extra = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
        assert!(extra.is_err(), "unexpected frame after block");
    }
}

#[tokio::test]
async fn getcoins_over_http() {
    let h = start(vec![FundRecord::new(vec![9], 250_000_000, false)]).await;
    let client = reqwest::Client::new();

    let resp = assert_ok!(
        client
            .post(format!("http://{}/getcoins", h.addr))
            .json(&serde_json::json!({ "addr": "bob" }))
            .send()
            .await
    );
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let json: Value = assert_ok!(resp.json().await);
    assert_eq!(json["amount"], 100_000_000);

    let spends = h.wallet.spends().await;
    assert_eq!(spends.len(), 1);
    assert_eq!(spends.first().map(|s| s.destination.as_str()), Some("bob"));
}

#[tokio::test]
async fn payout_change_below_floor_is_not_spent() {
    // The only fund left after the first payout is its 50M change, which
    // is too small to count toward a payout.
    let h = start(vec![FundRecord::new(vec![1], 150_000_000, false)]).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/getcoins", h.addr);

    let first = assert_ok!(
        client
            .post(&url)
            .json(&serde_json::json!({ "addr": "carol" }))
            .send()
            .await
    );
    assert_eq!(first.status(), reqwest::StatusCode::OK);

    let second = assert_ok!(
        client
            .post(&url)
            .json(&serde_json::json!({ "addr": "dave" }))
            .send()
            .await
    );
    assert_eq!(second.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(h.wallet.spends().await.len(), 1);
}
