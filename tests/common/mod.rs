//! Shared helpers for the end-to-end tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use ws_hub::registry::MembershipEvent;
use ws_hub::{HubServer, ServerConfig};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub server: Arc<HubServer>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<ws_hub::error::Result<()>>,
}

impl TestServer {
    /// Boot a server with `config`, bound to 127.0.0.1:0.
    ///
    /// The drain timeout is shortened so a stuck shutdown fails fast.
    pub async fn start(config: ServerConfig) -> Self {
        let config = config
            .bind("127.0.0.1:0")
            .drain_timeout(Duration::from_secs(1));
        let server = Arc::new(HubServer::new(config));
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn({
            let server = Arc::clone(&server);
            async move {
                server
                    .serve_until(listener, async move {
                        let _ = stop_rx.await;
                    })
                    .await
            }
        });

        Self {
            addr,
            server,
            stop: Some(stop_tx),
            handle,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/connect", self.addr)
    }

    pub fn broadcast_url(&self) -> String {
        format!("http://{}/broadcast", self.addr)
    }

    pub fn events(&self) -> broadcast::Receiver<MembershipEvent> {
        self.server.registry().subscribe()
    }

    /// Request shutdown and wait for the server to stop.
    pub async fn stop(mut self) -> ws_hub::error::Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        timeout(TIMEOUT, self.handle)
            .await
            .expect("timeout waiting for server to stop")
            .expect("server task panicked")
    }
}

/// Open a raw WebSocket connection.
pub async fn connect(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

/// Read the next text frame, skipping control frames.
pub async fn read_text(ws: &mut WsStream) -> String {
    read_text_within(ws, TIMEOUT)
        .await
        .expect("timeout waiting for message")
}

/// Read the next text frame if one arrives within `within`.
pub async fn read_text_within(ws: &mut WsStream, within: Duration) -> Option<String> {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        let msg = tokio::time::timeout_at(deadline, ws.next())
            .await
            .ok()?
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return Some(text.to_string());
        }
    }
}

/// Wait until `count` membership events matching `joins` have been seen.
pub async fn wait_for_events(
    events: &mut broadcast::Receiver<MembershipEvent>,
    joins: bool,
    count: usize,
) {
    let mut seen = 0;
    while seen < count {
        let event = timeout(TIMEOUT, events.recv())
            .await
            .expect("timeout waiting for membership event")
            .expect("membership channel closed");
        if event.is_join() == joins {
            seen += 1;
        }
    }
}
