//! Mock price feed server for integration tests.
//!
//! Provides a WebSocket server that can:
//! - Record the request URI of every connection
//! - Push text frames to connected clients
//! - Drop connections without a close handshake
//! - Count close frames received from clients

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub enum ServerCommand {
    Push(String),
    DropAll,
}

#[derive(Default)]
struct Shared {
    uris: Mutex<Vec<String>>,
    connections: AtomicU32,
    closes_received: AtomicU32,
}

/// A mock price feed server.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    commands: broadcast::Sender<ServerCommand>,
    shared: Arc<Shared>,
}

impl MockFeedServer {
    /// Start a new mock server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared::default());
        let (commands, _) = broadcast::channel(64);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let shared_clone = shared.clone();
        let commands_clone = commands.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let shared = shared_clone.clone();
                        let commands = commands_clone.subscribe();
                        tokio::spawn(handle_connection(stream, shared, commands));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            commands,
            shared,
        }
    }

    /// Feed base URL (without the asset query).
    pub fn url(&self) -> String {
        format!("ws://{}/prices", self.addr)
    }

    pub fn connection_count(&self) -> u32 {
        self.shared.connections.load(Ordering::SeqCst)
    }

    pub fn closes_received(&self) -> u32 {
        self.shared.closes_received.load(Ordering::SeqCst)
    }

    pub fn uris(&self) -> Vec<String> {
        self.shared.uris.lock().unwrap().clone()
    }

    /// Push a text frame to every open connection.
    pub fn push(&self, text: &str) {
        let _ = self.commands.send(ServerCommand::Push(text.to_string()));
    }

    /// Drop every open connection without a close frame.
    pub fn drop_all(&self) {
        let _ = self.commands.send(ServerCommand::DropAll);
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    shared: Arc<Shared>,
    mut commands: broadcast::Receiver<ServerCommand>,
) {
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        shared.uris.lock().unwrap().push(req.uri().to_string());
        shared.connections.fetch_add(1, Ordering::SeqCst);
        Ok(resp)
    };
    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) => {
                    shared.closes_received.fetch_add(1, Ordering::SeqCst);
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
            cmd = commands.recv() => match cmd {
                Ok(ServerCommand::Push(text)) => {
                    let _ = write.send(Message::Text(text)).await;
                }
                Ok(ServerCommand::DropAll) | Err(_) => break,
            },
        }
    }
}
