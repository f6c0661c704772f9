//! Paginated market snapshot fetching for coinboard.
//!
//! Fetches one page from two independent REST sources and merges them:
//! - Primary source: rank, price, market cap, 24h change (required)
//! - Secondary source: 7d change and sparkline samples (optional)
//!
//! A secondary failure degrades the page to unenriched records; only a
//! primary failure fails the page.

pub mod error;
pub mod fetcher;
pub mod merger;
pub mod primary;
pub mod secondary;

pub use error::{RestError, RestResult};
pub use fetcher::{NormalizedPair, PageFetcher};
pub use merger::{MergeConfig, MergeReport, MergedPage, Merger};
pub use primary::{PrimaryClient, PrimaryConfig};
pub use secondary::{Enrichment, SecondaryClient, SecondaryConfig};
