//! coinboard - live paginated crypto market board.
//!
//! Wires the engine together:
//! - Page navigation: dual-source fetch and merge, page replacement
//! - Live feed: one subscription per displayed page
//! - Delta reconciliation and transient change signals
//! - Render collaborators: log renderer and the optional dashboard

pub mod app;
pub mod config;
pub mod error;
pub mod renderer;

pub use app::Application;
pub use config::{AppConfig, ConfigLocation};
pub use error::{AppError, AppResult};
pub use renderer::{run_log_renderer, LogRenderer};
