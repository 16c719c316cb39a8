use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::accept_async;
use tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::input::Signal;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Input {
        #[serde(default)]
        signals: Vec<Signal>,
    },
    Ping,
}

impl ClientMessage {
    fn from_json(txt: &str) -> Option<Self> {
        serde_json::from_str(txt).ok()
    }
}

pub async fn start_websocket_server(addr: SocketAddr, state: Arc<Mutex<SharedState>>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;

    info!("🌐 WebSocket listening on ws://{}", addr);

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };

        tokio::spawn(handle_client(raw, peer, Arc::clone(&state)));
    }
}

async fn handle_client(raw: TcpStream, peer: SocketAddr, state: Arc<Mutex<SharedState>>) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%peer, %err, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Create outgoing message channel
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client_id = Uuid::new_v4();

    {
        let mut shared = state.lock().await;
        shared.register_client(client_id, tx.clone());
    }

    // -------------------------------
    // 2) Spawn send-loop task
    // -------------------------------
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    info!(%client_id, %peer, "🟢 Client connected");

    // Send welcome through the outgoing TX channel
    let welcome = json!({ "type": "welcome", "client_id": client_id.to_string() });
    let _ = tx.send(welcome.to_string());

    // -------------------------------
    // 3) Main receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };

        if !msg.is_text() {
            continue;
        }
        let text = match msg.to_text() {
            Ok(t) => t,
            Err(_) => continue,
        };

        match ClientMessage::from_json(text) {
            Some(ClientMessage::Ping) => {
                let _ = tx.send(json!({ "type": "pong" }).to_string());
            }
            Some(ClientMessage::Input { signals }) => {
                debug!(%client_id, ?signals, "input");
                let mut shared = state.lock().await;
                shared.update_input(&client_id, signals);
            }
            None => warn!(%client_id, "malformed client message"),
        }
    }

    info!(%client_id, "🔴 Client disconnected");
    let mut shared = state.lock().await;
    shared.remove_client(&client_id);
}
