//! Core domain types for the coinboard market board.
//!
//! This crate provides the value types shared by every other crate:
//! - `AssetId`: Identifier of an asset, stable across sources and time
//! - `Price`, `Percent`: Precision-safe numeric types
//! - `MarketRecord`, `Page`: Immutable snapshots of the displayed board
//! - `ChangeDirection`, `ChangeEvent`: Price movement derived from live deltas

pub mod decimal;
pub mod error;
pub mod market;
pub mod page;
pub mod signal;

pub use decimal::{Percent, Price};
pub use error::{CoreError, Result};
pub use market::{AssetId, MarketRecord};
pub use page::{Page, DEFAULT_PAGE_SIZE, DEFAULT_TOTAL_COUNT};
pub use signal::{ChangeDirection, ChangeEvent};
