use core::time::Duration;
use futures::{SinkExt, StreamExt};
use griddle_server::server::{config::ServerConfig, service::KitchenService};
use std::net::SocketAddr;
use tokio::{net::TcpStream, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const PANCAKE_READY: &str = r#"{"status":"pancake-ready"}"#;
const DEMO: [&str; 4] = [
    r#"{"ingredient":"flour","grams":100}"#,
    r#"{"ingredient":"flour","grams":450}"#,
    r#"{"ingredient":"eggs","count":4}"#,
    r#"{"ingredient":"milk","litres":1.5}"#,
];
const WAIT: Duration = Duration::from_secs(5);

async fn start_kitchen() -> (SocketAddr, KitchenService) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let service = KitchenService::new(ServerConfig {
        server_addr: addr.to_string(),
        fry_duration: Duration::from_millis(50),
        ..ServerConfig::default()
    });
    let router = service.router();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    (addr, service)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
    client
}

async fn send_all(client: &mut Client, messages: &[&str]) {
    for message in messages {
        client.send(Message::text(*message)).await.unwrap();
    }
}

/// Next text message, or `None` once the kitchen has closed the connection.
async fn next_text(client: &mut Client) -> Option<String> {
    loop {
        match timeout(WAIT, client.next()).await.expect("kitchen replied in time") {
            Some(Ok(Message::Text(text))) => return Some(text.as_str().to_owned()),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            _ => return None,
        }
    }
}

async fn run_demo(client: &mut Client) -> Vec<String> {
    send_all(client, &DEMO).await;

    let mut received = Vec::new();
    for _ in 0..6 {
        received.push(next_text(client).await.expect("connection stayed open"));
    }
    received
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demo_run_acknowledges_every_ingredient_and_fries_two_pancakes() {
    let (addr, _service) = start_kitchen().await;
    let mut client = connect(addr).await;

    let received = run_demo(&mut client).await;

    assert_eq!(
        received[..4],
        [
            r#"{"status":"ingredient-received","ingredient":{"ingredient":"flour","grams":100}}"#,
            r#"{"status":"ingredient-received","ingredient":{"ingredient":"flour","grams":450}}"#,
            r#"{"status":"ingredient-received","ingredient":{"ingredient":"eggs","count":4}}"#,
            r#"{"status":"ingredient-received","ingredient":{"ingredient":"milk","litres":1.5}}"#,
        ]
    );
    assert_eq!(received[4..], [PANCAKE_READY, PANCAKE_READY]);

    client.close(None).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_close_is_answered_with_a_close_frame() {
    let (addr, service) = start_kitchen().await;
    let mut client = connect(addr).await;

    send_all(&mut client, &[r#"{"ingredient":"eggs","count":2}"#]).await;
    assert!(next_text(&mut client).await.is_some());

    client.send(Message::Close(None)).await.unwrap();
    let reply = timeout(WAIT, client.next()).await.expect("kitchen replied in time");
    assert!(
        matches!(reply, Some(Ok(Message::Close(_)))),
        "expected a close frame, got {reply:?}"
    );

    timeout(WAIT, async {
        while service.sessions_inflight() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session closed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_json_closes_only_the_offending_session() {
    let (addr, _service) = start_kitchen().await;
    let mut broken = connect(addr).await;
    let mut healthy = connect(addr).await;

    broken.send(Message::text("{not json")).await.unwrap();
    assert_eq!(next_text(&mut broken).await, None);

    let received = run_demo(&mut healthy).await;
    assert_eq!(
        received.iter().filter(|m| *m == PANCAKE_READY).count(),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_sessions_portion_independently() {
    let (addr, _service) = start_kitchen().await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;

    let (first_received, second_received) =
        tokio::join!(run_demo(&mut first), run_demo(&mut second));

    for received in [first_received, second_received] {
        assert_eq!(
            received.iter().filter(|m| *m == PANCAKE_READY).count(),
            2
        );
    }

    // With the leftover 50g of flour the second round completes exactly one
    // more portion in each session.
    for client in [&mut first, &mut second] {
        send_all(
            client,
            &[
                r#"{"ingredient":"eggs","count":2}"#,
                r#"{"ingredient":"flour","grams":200}"#,
            ],
        )
        .await;
        let mut texts = Vec::new();
        for _ in 0..3 {
            texts.push(next_text(client).await.expect("connection stayed open"));
        }
        assert_eq!(texts[2], PANCAKE_READY);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_closes_live_sessions_and_refuses_new_ones() {
    let (addr, service) = start_kitchen().await;
    let mut client = connect(addr).await;

    send_all(&mut client, &[r#"{"ingredient":"eggs","count":2}"#]).await;
    assert!(next_text(&mut client).await.is_some());

    service.shutdown().await;
    assert_eq!(service.sessions_inflight(), 0);
    assert_eq!(next_text(&mut client).await, None);

    assert!(connect_async(format!("ws://{addr}/")).await.is_err());
}
