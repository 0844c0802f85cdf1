//! End-to-end tests against a live server on an ephemeral port.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use herald_core::Event;
use herald_server::config::ServerConfig;
use herald_server::server::HeraldServer;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start(config: ServerConfig) -> (HeraldServer, String) {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let server = HeraldServer::new(config, handle);
    let (addr, _task) = server.listen().await.unwrap();
    (server, format!("127.0.0.1:{}", addr.port()))
}

async fn connect(addr: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

/// Next text frame as an [`Event`], skipping control frames.
async fn next_event(ws: &mut Ws) -> Event {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return Event::from_frame(text.as_str()).unwrap();
        }
    }
}

async fn wait_for_len(server: &HeraldServer, expected: usize) {
    for _ in 0..100 {
        if server.registry().len() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "registry len stayed at {} (expected {expected})",
        server.registry().len()
    );
}

async fn post_event(addr: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/events"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn new_connection_receives_established_frame() {
    let (server, addr) = start(ServerConfig::default()).await;
    let mut ws = connect(&addr).await;

    let hello = next_event(&mut ws).await;
    assert_eq!(hello.event_type, "connection.established");
    let id = hello.data.unwrap()["connectionId"].as_str().unwrap().to_owned();
    assert!(id.starts_with("conn_"));
    assert_eq!(server.registry().len(), 1);
}

#[tokio::test]
async fn published_event_reaches_every_connection() {
    let (server, addr) = start(ServerConfig::default()).await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let _ = next_event(&mut a).await;
    let _ = next_event(&mut b).await;
    wait_for_len(&server, 2).await;

    let resp = post_event(
        &addr,
        serde_json::json!({"type": "lead.created", "data": {"id": "L1"}}),
    )
    .await;
    assert_eq!(resp.status(), 202);
    let report: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(report["delivered"], 2);
    assert_eq!(report["failed"], 0);

    for ws in [&mut a, &mut b] {
        let event = next_event(ws).await;
        assert_eq!(event.event_type, "lead.created");
        assert_eq!(event.data.unwrap()["id"], "L1");
    }
}

#[tokio::test]
async fn client_close_detaches() {
    let (server, addr) = start(ServerConfig::default()).await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let _ = next_event(&mut a).await;
    let _ = next_event(&mut b).await;
    wait_for_len(&server, 2).await;

    a.close(None).await.unwrap();
    wait_for_len(&server, 1).await;

    let report = server
        .broadcaster()
        .publish(&Event::new("contact.created"));
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(next_event(&mut b).await.event_type, "contact.created");
}

#[tokio::test]
async fn dropped_socket_detaches() {
    let (server, addr) = start(ServerConfig::default()).await;
    let mut ws = connect(&addr).await;
    let _ = next_event(&mut ws).await;
    wait_for_len(&server, 1).await;

    drop(ws);
    wait_for_len(&server, 0).await;
}

#[tokio::test]
async fn late_joiner_gets_no_history() {
    let (server, addr) = start(ServerConfig::default()).await;
    let report = server.broadcaster().publish(&Event::new("lead.created"));
    assert_eq!(report.delivered, 0);

    let mut ws = connect(&addr).await;
    assert_eq!(next_event(&mut ws).await.event_type, "connection.established");

    let _ = server
        .broadcaster()
        .publish(&Event::new("verification.recorded"));
    assert_eq!(next_event(&mut ws).await.event_type, "verification.recorded");
}

#[tokio::test]
async fn connection_limit_refuses_upgrade() {
    let config = ServerConfig {
        max_connections: 1,
        ..ServerConfig::default()
    };
    let (server, addr) = start(config).await;
    let mut first = connect(&addr).await;
    let _ = next_event(&mut first).await;

    let err = connect_async(format!("ws://{addr}/ws")).await.unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(resp) => {
            assert_eq!(resp.status(), 503);
        }
        other => panic!("expected HTTP 503, got {other:?}"),
    }
    assert_eq!(server.registry().len(), 1);
}

#[tokio::test]
async fn silent_client_times_out() {
    let config = ServerConfig {
        heartbeat_interval_secs: 1,
        heartbeat_timeout_secs: 1,
        ..ServerConfig::default()
    };
    let (server, addr) = start(config).await;
    // Never polled after the handshake, so pings go unanswered.
    let _ws = connect(&addr).await;
    wait_for_len(&server, 1).await;

    for _ in 0..50 {
        if server.registry().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("silent connection was never detached");
}

#[tokio::test]
async fn shutdown_closes_connections() {
    let (server, addr) = start(ServerConfig::default()).await;
    let mut ws = connect(&addr).await;
    let _ = next_event(&mut ws).await;

    server.shutdown().shutdown();

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => return,
                Ok(_) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
    wait_for_len(&server, 0).await;
}

#[tokio::test]
async fn health_reports_live_connections() {
    let (server, addr) = start(ServerConfig::default()).await;
    let mut ws = connect(&addr).await;
    let _ = next_event(&mut ws).await;
    wait_for_len(&server, 1).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 1);
}

#[tokio::test]
async fn malformed_publish_is_rejected() {
    let (_server, addr) = start(ServerConfig::default()).await;
    let resp = post_event(&addr, serde_json::json!({"data": 1})).await;
    assert!(resp.status().is_client_error());
}
