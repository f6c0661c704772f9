//! Mock price feed server.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

#[derive(Default)]
struct Shared {
    uris: Mutex<Vec<String>>,
    closes_received: AtomicU32,
}

pub struct MockFeedServer {
    addr: SocketAddr,
    frames: broadcast::Sender<String>,
    shared: Arc<Shared>,
}

impl MockFeedServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared::default());
        let (frames, _) = broadcast::channel(64);

        let shared_clone = shared.clone();
        let frames_clone = frames.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(
                    stream,
                    shared_clone.clone(),
                    frames_clone.subscribe(),
                ));
            }
        });

        Self {
            addr,
            frames,
            shared,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/prices", self.addr)
    }

    pub fn uris(&self) -> Vec<String> {
        self.shared.uris.lock().unwrap().clone()
    }

    pub fn closes_received(&self) -> u32 {
        self.shared.closes_received.load(Ordering::SeqCst)
    }

    /// Push a text frame to every open connection.
    pub fn push(&self, text: &str) {
        let _ = self.frames.send(text.to_string());
    }
}

async fn handle_connection(
    stream: TcpStream,
    shared: Arc<Shared>,
    mut frames: broadcast::Receiver<String>,
) {
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        shared.uris.lock().unwrap().push(req.uri().to_string());
        Ok(resp)
    };
    let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
        return;
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
            frame = frames.recv() => match frame {
                Ok(text) => {
                    let _ = write.send(Message::Text(text)).await;
                }
                Err(_) => break,
            },
        }
    }
}
