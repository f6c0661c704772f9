//! Board engine.
//!
//! Single-owner state machine driven by the application loop. It ties the
//! page store, reconciler and signal timer together and decides what the
//! render collaborator sees.

use crate::change_signal::ChangeSignalTimer;
use crate::error::FeedResult;
use crate::page_store::PageStore;
use crate::reconciler::{Reconciler, ReconcilerStats};
use coinboard_core::page::validate_page;
use coinboard_core::{
    AssetId, ChangeDirection, ChangeEvent, MarketRecord, Page, Price, DEFAULT_PAGE_SIZE,
    DEFAULT_TOTAL_COUNT,
};
use coinboard_ws::{ConnectionState, FeedEvent, SubscriptionHandle};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Board configuration (`[board]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_total_count")]
    pub total_count: u32,
    /// One-based page shown at startup.
    #[serde(default = "default_initial_page")]
    pub initial_page: u32,
    /// How long a change signal stays visible (ms).
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_total_count() -> u32 {
    DEFAULT_TOTAL_COUNT
}

fn default_initial_page() -> u32 {
    1
}

fn default_dwell_ms() -> u64 {
    400
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            total_count: default_total_count(),
            initial_page: default_initial_page(),
            dwell_ms: default_dwell_ms(),
        }
    }
}

/// User-visible board status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BoardStatus {
    /// A page fetch is in flight.
    Loading { page_index: u32 },
    /// Page shown, feed healthy or not yet reporting.
    Live,
    /// Page shown with last known prices; the stream dropped.
    Degraded { reason: String },
    /// The primary source failed for this page.
    Failed { page_index: u32, reason: String },
}

/// What the render collaborator sees.
#[derive(Debug, Clone)]
pub struct BoardView {
    pub page: Arc<Page>,
    pub signals: Arc<BTreeMap<AssetId, ChangeDirection>>,
    pub status: BoardStatus,
    pub feed_state: ConnectionState,
    pub page_count: u32,
}

/// Page change request from a render collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_index: u32,
}

/// Identifies one navigation; only the latest one may complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationTicket {
    pub seq: u64,
    pub page_index: u32,
}

/// Result of completing a navigation.
#[derive(Debug, Clone)]
pub enum NavigationOutcome {
    /// The fetched page is now displayed.
    Replaced(Arc<Page>),
    /// The primary source failed; an empty page is displayed.
    Failed(Arc<Page>),
    /// A newer navigation started meanwhile; the result was dropped.
    Superseded,
}

/// Board engine state.
pub struct Board {
    config: BoardConfig,
    store: PageStore,
    reconciler: Reconciler,
    timer: ChangeSignalTimer,
    status: BoardStatus,
    feed_state: ConnectionState,
    nav_seq: u64,
    pending: Option<NavigationTicket>,
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        let store = PageStore::new(config.page_size, config.total_count);
        let status = BoardStatus::Loading {
            page_index: config.initial_page,
        };
        Self {
            config,
            store,
            reconciler: Reconciler::new(),
            timer: ChangeSignalTimer::new(),
            status,
            feed_state: ConnectionState::Disconnected,
            nav_seq: 0,
            pending: None,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn page_count(&self) -> u32 {
        coinboard_core::page::page_count(self.config.page_size, self.config.total_count)
    }

    pub fn current_page(&self) -> Arc<Page> {
        self.store.current_page()
    }

    pub fn status(&self) -> &BoardStatus {
        &self.status
    }

    pub fn feed_state(&self) -> ConnectionState {
        self.feed_state
    }

    pub fn pending_navigation(&self) -> Option<NavigationTicket> {
        self.pending
    }

    pub fn reconciler_stats(&self) -> ReconcilerStats {
        self.reconciler.stats()
    }

    /// Start navigating to one-based `page_index`.
    ///
    /// Any earlier navigation still in flight is superseded.
    pub fn begin_navigation(&mut self, page_index: u32) -> FeedResult<NavigationTicket> {
        validate_page(page_index, self.config.page_size, self.config.total_count)?;

        self.nav_seq += 1;
        let ticket = NavigationTicket {
            seq: self.nav_seq,
            page_index,
        };
        if let Some(previous) = self.pending.replace(ticket) {
            debug!(
                superseded = previous.page_index,
                page = page_index,
                "Navigation superseded"
            );
        }
        self.status = BoardStatus::Loading { page_index };
        info!(page = page_index, seq = ticket.seq, "Navigation started");
        Ok(ticket)
    }

    /// Complete a navigation with the merged records or the primary failure.
    ///
    /// On success or failure all pending change signals are cleared and the
    /// page is replaced, which invalidates every earlier subscription handle.
    pub fn complete_navigation(
        &mut self,
        ticket: NavigationTicket,
        result: Result<Vec<MarketRecord>, String>,
    ) -> NavigationOutcome {
        if self.pending != Some(ticket) {
            debug!(page = ticket.page_index, seq = ticket.seq, "Dropping superseded fetch result");
            return NavigationOutcome::Superseded;
        }
        self.pending = None;
        self.timer.clear_all();
        self.feed_state = ConnectionState::Disconnected;

        let page = Page::new(
            ticket.page_index,
            self.config.page_size,
            self.config.total_count,
            Vec::new(),
        );
        match result {
            Ok(records) => {
                let page = self.store.replace_page(Page { records, ..page });
                self.status = BoardStatus::Live;
                info!(
                    page = page.index,
                    generation = page.generation,
                    rows = page.len(),
                    enriched = page.is_enriched(),
                    "Page displayed"
                );
                NavigationOutcome::Replaced(page)
            }
            Err(reason) => {
                let page = self.store.replace_page(page);
                warn!(page = page.index, %reason, "Page failed");
                self.status = BoardStatus::Failed {
                    page_index: page.index,
                    reason,
                };
                NavigationOutcome::Failed(page)
            }
        }
    }

    /// Overlay a delta batch received on `handle`.
    ///
    /// Returns the change events, or `None` if the batch was stale.
    pub fn apply_prices(
        &mut self,
        handle: &SubscriptionHandle,
        prices: &HashMap<AssetId, Price>,
    ) -> Option<Vec<ChangeEvent>> {
        let applied = self.reconciler.reconcile(&self.store, handle, prices)?;
        let dwell = Duration::from_millis(self.config.dwell_ms);
        for event in &applied.events {
            self.timer.schedule(event.id.clone(), event.direction, dwell);
        }
        Some(applied.events)
    }

    /// Handle one feed event. Returns whether the view changed.
    pub fn on_feed_event(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::Prices { handle, prices } => self
                .apply_prices(&handle, &prices)
                .is_some_and(|events| !events.is_empty()),
            FeedEvent::State { generation, state } => {
                if !self.is_current(generation) {
                    return false;
                }
                self.feed_state = state;
                if state == ConnectionState::Open && matches!(self.status, BoardStatus::Degraded { .. }) {
                    info!(generation, "Stream recovered");
                    self.status = BoardStatus::Live;
                }
                true
            }
            FeedEvent::Disconnected {
                generation,
                reason,
                will_retry,
            } => {
                if !self.is_current(generation) {
                    return false;
                }
                warn!(generation, %reason, will_retry, "Stream disconnected, keeping last prices");
                if matches!(self.status, BoardStatus::Live | BoardStatus::Degraded { .. }) {
                    self.status = BoardStatus::Degraded { reason };
                }
                true
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.store.current_page().generation
    }

    /// Whether any change signal is pending.
    pub fn has_pending_signals(&self) -> bool {
        !self.timer.is_empty()
    }

    /// Wait for the next change signal to expire.
    pub async fn next_signal_expiry(&mut self) -> Option<AssetId> {
        self.timer.next_expired().await
    }

    pub fn signal(&self, id: &AssetId) -> ChangeDirection {
        self.timer.direction(id)
    }

    pub fn active_signals(&self) -> usize {
        self.timer.len()
    }

    /// Snapshot for render collaborators.
    pub fn view(&self) -> BoardView {
        BoardView {
            page: self.store.current_page(),
            signals: Arc::new(self.timer.signals()),
            status: self.status.clone(),
            feed_state: self.feed_state,
            page_count: self.page_count(),
        }
    }
}
