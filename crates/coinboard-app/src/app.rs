//! Main application orchestration.
//!
//! One event loop owns the board and serializes every mutation:
//! - Page requests from render collaborators
//! - Fetch results posted back by the spawned fetch task
//! - Feed events from the active subscription
//! - Change signal expiries

use crate::config::AppConfig;
use crate::error::AppResult;
use coinboard_core::AssetId;
use coinboard_feed::{Board, BoardView, NavigationOutcome, NavigationTicket, PageRequest};
use coinboard_rest::{
    MergedPage, Merger, PageFetcher, PrimaryClient, RestResult, SecondaryClient,
};
use coinboard_telemetry::Metrics;
use coinboard_ws::{FeedConnector, FeedEvent};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Feed events buffered while a teardown is in progress.
const FEED_CHANNEL_CAPACITY: usize = 1024;

const REQUEST_CHANNEL_CAPACITY: usize = 16;

/// Result of a spawned page fetch.
struct FetchOutcome {
    ticket: NavigationTicket,
    result: RestResult<MergedPage>,
}

/// Main application.
pub struct Application {
    config: AppConfig,
    board: Board,
    fetcher: Arc<PageFetcher>,
    connector: FeedConnector,
    feed_rx: mpsc::Receiver<FeedEvent>,
    request_tx: mpsc::Sender<PageRequest>,
    request_rx: mpsc::Receiver<PageRequest>,
    fetch_tx: mpsc::Sender<FetchOutcome>,
    fetch_rx: mpsc::Receiver<FetchOutcome>,
    in_flight: Option<JoinHandle<()>>,
    view_tx: watch::Sender<BoardView>,
}

impl Application {
    /// Create a new application. No I/O happens until `run`.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let primary = PrimaryClient::new(config.primary.clone())?;
        let secondary = SecondaryClient::new(config.secondary.clone())?;
        let fetcher = PageFetcher::new(
            primary,
            secondary,
            Merger::new(config.merge.clone()),
            config.board.page_size,
            config.board.total_count,
        );

        let (feed_tx, feed_rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let connector = FeedConnector::new(config.feed.clone(), feed_tx);
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let (fetch_tx, fetch_rx) = mpsc::channel(4);

        let board = Board::new(config.board.clone());
        let (view_tx, _) = watch::channel(board.view());

        Ok(Self {
            config,
            board,
            fetcher: Arc::new(fetcher),
            connector,
            feed_rx,
            request_tx,
            request_rx,
            fetch_tx,
            fetch_rx,
            in_flight: None,
            view_tx,
        })
    }

    /// Receiver of every published `BoardView`.
    pub fn view_receiver(&self) -> watch::Receiver<BoardView> {
        self.view_tx.subscribe()
    }

    /// Sender render collaborators use to request page changes.
    pub fn page_requests(&self) -> mpsc::Sender<PageRequest> {
        self.request_tx.clone()
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` resolves.
    pub async fn run_until<F>(mut self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            page_size = self.config.board.page_size,
            page_count = self.board.page_count(),
            dwell_ms = self.config.board.dwell_ms,
            "Starting board"
        );
        self.navigate(self.config.board.initial_page);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                Some(request) = self.request_rx.recv() => {
                    self.navigate(request.page_index);
                }

                Some(outcome) = self.fetch_rx.recv() => {
                    self.on_fetch_complete(outcome).await;
                }

                Some(event) = self.feed_rx.recv() => {
                    self.on_feed_event(event);
                }

                Some(id) = self.board.next_signal_expiry(), if self.board.has_pending_signals() => {
                    self.on_signal_expired(id);
                }
            }
        }

        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.connector.shutdown().await;
        info!(stats = ?self.board.reconciler_stats(), "Board stopped");
        Ok(())
    }

    /// Start fetching one-based `page_index`, superseding any fetch in flight.
    fn navigate(&mut self, page_index: u32) {
        let ticket = match self.board.begin_navigation(page_index) {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(page = page_index, error = %e, "Page request rejected");
                return;
            }
        };

        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }

        let fetcher = self.fetcher.clone();
        let tx = self.fetch_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = fetcher.fetch_merged(ticket.page_index).await;
            let _ = tx.send(FetchOutcome { ticket, result }).await;
        }));

        self.publish();
    }

    async fn on_fetch_complete(&mut self, outcome: FetchOutcome) {
        let FetchOutcome { ticket, result } = outcome;
        let result = result.map_err(|e| e.to_string());
        let report = result.as_ref().ok().map(|merged| merged.report.clone());

        let page = match self
            .board
            .complete_navigation(ticket, result.map(|merged| merged.records))
        {
            NavigationOutcome::Replaced(page) => {
                Metrics::page_fetched();
                if let Some(report) = report {
                    if !report.secondary_present {
                        Metrics::secondary_failed();
                    }
                    Metrics::merge_misaligned(report.misaligned);
                }
                page
            }
            NavigationOutcome::Failed(page) => {
                Metrics::page_failed();
                page
            }
            NavigationOutcome::Superseded => {
                Metrics::page_superseded();
                return;
            }
        };
        self.in_flight = None;

        // The new page is visible before its subscription opens.
        self.publish();
        Metrics::feed_state_set(&self.board.feed_state().to_string());
        let handle = self
            .connector
            .subscribe(page.generation, page.identifier_set())
            .await;
        debug!(
            generation = handle.generation(),
            assets = handle.assets().len(),
            "Subscription replaced"
        );
    }

    fn on_feed_event(&mut self, event: FeedEvent) {
        let changed = match event {
            FeedEvent::Prices { handle, prices } => {
                match self.board.apply_prices(&handle, &prices) {
                    Some(events) => {
                        Metrics::deltas_applied(events.len());
                        !events.is_empty()
                    }
                    None => {
                        Metrics::stale_discarded();
                        false
                    }
                }
            }
            other => {
                let changed = self.board.on_feed_event(other.clone());
                if changed {
                    match other {
                        FeedEvent::State { state, .. } => {
                            Metrics::feed_state_set(&state.to_string());
                        }
                        FeedEvent::Disconnected { will_retry, .. } => {
                            Metrics::feed_disconnected(will_retry);
                        }
                        FeedEvent::Prices { .. } => {}
                    }
                }
                changed
            }
        };

        if changed {
            self.publish();
        }
    }

    fn on_signal_expired(&mut self, id: AssetId) {
        debug!(asset = %id, "Change signal cleared");
        self.publish();
    }

    fn publish(&self) {
        Metrics::change_signals_active(self.board.active_signals());
        self.view_tx.send_replace(self.board.view());
    }
}
