//! coinboard-dashboard - HTTP/WebSocket bridge for the market board.
//!
//! A render collaborator that never touches engine state directly. It reads
//! the latest `BoardView` from a watch channel and forwards page requests
//! over an mpsc channel:
//!
//! - REST API for the current view and page navigation
//! - WebSocket push of the view on every change
//! - Prometheus text exposition
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      coinboard process                        │
//! │                                                              │
//! │  ┌──────────────────┐   watch<BoardView>   ┌──────────────┐  │
//! │  │ Application loop │ ───────────────────▶ │DashboardState│  │
//! │  │  (owns Board)    │ ◀─────────────────── │              │  │
//! │  └──────────────────┘   mpsc<PageRequest>  └──────┬───────┘  │
//! │                                                   │          │
//! │  ┌────────────────────────────────────────────────┼───────┐  │
//! │  │       axum HTTP Server (port 8080)             ▼       │  │
//! │  │  GET  /api/snapshot    → JSON view                     │  │
//! │  │  POST /api/page/{page} → navigation request            │  │
//! │  │  GET  /ws              → WebSocket, view on change     │  │
//! │  │  GET  /metrics         → Prometheus text               │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use coinboard_dashboard::{run_server, DashboardConfig, DashboardState};
//!
//! let state = DashboardState::new(view_rx, request_tx);
//! tokio::spawn(async move {
//!     if let Err(e) = run_server(state, DashboardConfig::default()).await {
//!         tracing::error!(error = %e, "Dashboard server failed");
//!     }
//! });
//! ```

mod broadcast;
mod config;
mod server;
mod state;
mod types;

pub use config::DashboardConfig;
pub use server::{create_router, run_server, AppState};
pub use state::{DashboardState, PageRequestError};
pub use types::{BoardSnapshot, DashboardMessage, RowSnapshot};
