//! Board state for coinboard.
//!
//! Keeps the displayed page consistent while live deltas are overlaid:
//! - `PageStore`: sole owner of the current immutable page snapshot
//! - `Reconciler`: applies price deltas, producing new snapshots and change events
//! - `ChangeSignalTimer`: expires per-row increased/decreased indicators
//! - `Board`: navigation, feed and signal state machine driven by the app loop

pub mod board;
pub mod change_signal;
pub mod error;
pub mod page_store;
pub mod reconciler;

pub use board::{
    Board, BoardConfig, BoardStatus, BoardView, NavigationOutcome, NavigationTicket, PageRequest,
};
pub use change_signal::{ChangeSignal, ChangeSignalTimer};
pub use error::{FeedError, FeedResult};
pub use page_store::{AppliedDeltas, PageStore};
pub use reconciler::{apply_deltas, Reconciler, ReconcilerStats};
