//! HTTP server implementation using axum.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use serde_json::json;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::state::{DashboardState, PageRequestError};
use crate::types::{BoardSnapshot, DashboardMessage};

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Take a slot; the returned guard releases it on drop.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    dashboard_state: DashboardState,
    broadcast_tx: broadcast::Sender<String>,
    connection_limiter: Arc<ConnectionLimiter>,
    config: DashboardConfig,
}

impl AppState {
    pub fn new(
        dashboard_state: DashboardState,
        broadcast_tx: broadcast::Sender<String>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            dashboard_state,
            broadcast_tx,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
        }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/page/{page}", post(request_page))
        .route("/ws", get(ws_handler))
        .route("/metrics", get(get_metrics))
        .layer(cors)
        .with_state(state)
}

/// Get the current board as JSON.
async fn get_snapshot(State(state): State<AppState>) -> Json<BoardSnapshot> {
    Json(state.dashboard_state.collect_snapshot())
}

/// Forward a navigation request to the engine.
async fn request_page(State(state): State<AppState>, Path(page): Path<u32>) -> Response {
    match state.dashboard_state.request_page(page).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "page_index": page }))).into_response(),
        Err(e @ PageRequestError::OutOfRange { .. }) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
        }
        Err(e @ PageRequestError::Closed) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": e.to_string() })))
                .into_response()
        }
    }
}

/// Prometheus text exposition.
async fn get_metrics() -> Response {
    match coinboard_telemetry::gather_text() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let Some(guard) = state.connection_limiter.try_acquire() else {
        warn!(
            current = state.connection_limiter.current_count(),
            max = state.config.max_connections,
            "WebSocket connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "New WebSocket connection"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Handle a WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the initial snapshot so no change is missed.
    let mut broadcast_rx = state.broadcast_tx.subscribe();

    let initial_msg = DashboardMessage::Snapshot(state.dashboard_state.collect_snapshot());
    if let Ok(json) = serde_json::to_string(&initial_msg) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            debug!("Failed to send initial snapshot, client disconnected");
            return;
        }
    }

    // Pongs are answered by axum; only close and errors matter here.
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send message, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, catching up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    info!(
        connections = state.connection_limiter.current_count().saturating_sub(1),
        "WebSocket connection closed"
    );
}

/// Run the dashboard HTTP server.
pub async fn run_server(
    dashboard_state: DashboardState,
    config: DashboardConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Views change at most once per delta batch or signal expiry; slow
    // clients skip to the latest.
    let (broadcast_tx, _) = broadcast::channel::<String>(32);

    let state = AppState::new(dashboard_state.clone(), broadcast_tx.clone(), config.clone());
    let app = create_router(state);

    tokio::spawn(crate::broadcast::run_broadcaster(
        dashboard_state.subscribe(),
        broadcast_tx,
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(port = config.port, "Starting dashboard server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
