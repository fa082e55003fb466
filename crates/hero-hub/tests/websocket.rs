//! End-to-end: the real router on an ephemeral port, driven by
//! tokio-tungstenite clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hero_core::HeroConfig;
use hero_hub::{build_router, AppState};
use hero_protocol::frames::ServerFrame;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_hub(config: HeroConfig) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(Arc::new(AppState::new(config)));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn config() -> HeroConfig {
    let mut config = HeroConfig::default();
    config.hub.auth.username = "admin".into();
    config.hub.auth.password = Some("s3cret".into());
    config
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}{path}")).await.expect("connect");
    ws
}

async fn next_frame(ws: &mut Client) -> ServerFrame {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("socket error");
        if let Message::Text(text) = msg {
            return ServerFrame::parse(text.as_str()).expect("server frame");
        }
    }
}

async fn send(ws: &mut Client, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn init_then_broadcast_to_all_participants() {
    let addr = spawn_hub(config()).await;
    let mut a = connect(addr, "/ws").await;
    let mut b = connect(addr, "/").await;

    assert!(matches!(next_frame(&mut a).await, ServerFrame::Init { .. }));
    assert!(matches!(next_frame(&mut b).await, ServerFrame::Init { .. }));

    send(
        &mut a,
        json!({
            "type": "report_obstacle",
            "obstacleType": "Fallen Tree",
            "coordinate": { "lat": 42.98, "lon": -81.25 },
            "description": "blocking both lanes"
        }),
    )
    .await;

    for ws in [&mut a, &mut b] {
        match next_frame(ws).await {
            ServerFrame::NewObstacle { obstacle } => {
                assert_eq!(obstacle.description, "blocking both lanes");
                assert_eq!(obstacle.marker_color, "#2E7D32");
            }
            other => panic!("expected new_obstacle, got {other:?}"),
        }
    }

    // a late joiner sees it in init
    let mut c = connect(addr, "/ws").await;
    match next_frame(&mut c).await {
        ServerFrame::Init { data } => assert_eq!(data.obstacles.len(), 1),
        other => panic!("expected init, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limited_sender_gets_private_error() {
    let addr = spawn_hub(config()).await;
    let mut a = connect(addr, "/ws").await;
    let mut b = connect(addr, "/ws").await;
    next_frame(&mut a).await;
    next_frame(&mut b).await;

    let chat = json!({ "type": "chat_message", "username": "alice", "message": "hi" });
    send(&mut a, chat.clone()).await;
    send(&mut a, chat).await;

    assert!(matches!(next_frame(&mut a).await, ServerFrame::NewChatMessage { .. }));
    match next_frame(&mut a).await {
        ServerFrame::Error { message, class, .. } => {
            assert!(message.starts_with("Please wait"), "{message}");
            assert!(message.ends_with("before sending another message"), "{message}");
            assert_eq!(class, Some(hero_core::EventClass::Chat));
        }
        other => panic!("expected error, got {other:?}"),
    }

    // b gets the first message and nothing else
    assert!(matches!(next_frame(&mut b).await, ServerFrame::NewChatMessage { .. }));
    let quiet = tokio::time::timeout(Duration::from_millis(300), b.next()).await;
    assert!(quiet.is_err(), "b should not receive the rejected message");
}

#[tokio::test]
async fn privileged_connection_can_remove() {
    let addr = spawn_hub(config()).await;
    let mut user = connect(addr, "/ws").await;
    let mut admin = connect(addr, "/ws?username=admin&password=s3cret").await;
    next_frame(&mut user).await;
    next_frame(&mut admin).await;

    send(
        &mut user,
        json!({
            "type": "ride_request",
            "coordinate": { "lat": 1.0, "lon": 2.0 },
            "description": "",
            "passengers": "2"
        }),
    )
    .await;
    let ServerFrame::NewRideRequest { request, .. } = next_frame(&mut user).await else {
        panic!("expected new_ride_request");
    };
    next_frame(&mut admin).await;

    // the owner alone may not remove it
    send(&mut user, json!({ "type": "remove_ride_request", "requestId": request.id })).await;
    assert!(matches!(next_frame(&mut user).await, ServerFrame::Error { .. }));

    send(&mut admin, json!({ "type": "remove_ride_request", "requestId": request.id })).await;
    let expected = ServerFrame::RideRequestRemoved { request_id: request.id.clone() };
    assert_eq!(next_frame(&mut admin).await, expected);
    assert_eq!(next_frame(&mut user).await, expected);
}

#[tokio::test]
async fn wrong_credentials_are_refused_with_401() {
    let addr = spawn_hub(config()).await;
    let err = connect_async(format!("ws://{addr}/ws?username=admin&password=guess"))
        .await
        .expect_err("upgrade must fail");
    match err {
        tungstenite::Error::Http(response) => assert_eq!(response.status().as_u16(), 401),
        other => panic!("expected HTTP 401, got {other:?}"),
    }
}

#[tokio::test]
async fn default_config_grants_privilege_to_nobody() {
    let addr = spawn_hub(HeroConfig::default()).await;
    for guess in ["change-me", "admin", ""] {
        let err = connect_async(format!("ws://{addr}/ws?username=admin&password={guess}"))
            .await
            .expect_err("no password is configured");
        assert!(matches!(err, tungstenite::Error::Http(ref r) if r.status().as_u16() == 401));
    }

    // ordinary participants still get in, but cannot remove
    let mut user = connect(addr, "/ws").await;
    next_frame(&mut user).await;
    send(&mut user, json!({ "type": "remove_obstacle", "obstacleId": "1" })).await;
    match next_frame(&mut user).await {
        ServerFrame::Error { message, .. } => assert!(message.starts_with("Not authorized")),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_frame_keeps_connection_open() {
    let addr = spawn_hub(config()).await;
    let mut a = connect(addr, "/ws").await;
    next_frame(&mut a).await;

    a.send(Message::Text("{not json".to_string().into())).await.unwrap();
    send(&mut a, json!({ "type": "chat_message", "message": "still here" })).await;

    match next_frame(&mut a).await {
        ServerFrame::NewChatMessage { message } => {
            assert_eq!(message.username, "Anonymous");
            assert_eq!(message.message, "still here");
        }
        other => panic!("expected new_chat_message, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_get_on_root_returns_banner() {
    let addr = spawn_hub(config()).await;
    let response = http_get(addr, "/").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("WebSocket server is running"));
}

#[tokio::test]
async fn health_reports_connections_and_counts() {
    let addr = spawn_hub(config()).await;
    let mut a = connect(addr, "/ws").await;
    next_frame(&mut a).await;

    let response = http_get(addr, "/health").await;
    let body = response.split("\r\n\r\n").nth(1).expect("body");
    let health: serde_json::Value = serde_json::from_str(body).expect("json body");
    assert_eq!(health["status"], "ok");
    assert_eq!(health["connections"], 1);
    assert_eq!(health["counts"]["chatMessages"], 0);
}
