//! Transient per-row change indicators.
//!
//! A signal is armed by a price move and reverts to `none` after the dwell
//! time. A newer move for the same row replaces the pending signal and
//! restarts its window.

use coinboard_core::{AssetId, ChangeDirection};
use futures_util::StreamExt;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::time::delay_queue::{self, DelayQueue};
use tracing::trace;

/// An active change indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSignal {
    pub direction: ChangeDirection,
    pub expires_at: Instant,
}

#[derive(Debug)]
struct Entry {
    key: delay_queue::Key,
    signal: ChangeSignal,
}

/// Schedules expiry of change signals.
#[derive(Debug, Default)]
pub struct ChangeSignalTimer {
    queue: DelayQueue<AssetId>,
    entries: HashMap<AssetId, Entry>,
}

impl ChangeSignalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a signal for `id`, replacing any pending one.
    ///
    /// Scheduling `ChangeDirection::None` clears the row instead.
    pub fn schedule(&mut self, id: AssetId, direction: ChangeDirection, dwell: Duration) {
        if direction.is_none() {
            self.clear(&id);
            return;
        }

        let expires_at = Instant::now() + dwell;
        let signal = ChangeSignal {
            direction,
            expires_at,
        };
        match self.entries.get_mut(&id) {
            Some(entry) => {
                self.queue.reset_at(&entry.key, expires_at);
                entry.signal = signal;
            }
            None => {
                let key = self.queue.insert_at(id.clone(), expires_at);
                self.entries.insert(id, Entry { key, signal });
            }
        }
    }

    /// Cancel the pending signal for `id`. Returns whether one existed.
    pub fn clear(&mut self, id: &AssetId) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                self.queue.remove(&entry.key);
                true
            }
            None => false,
        }
    }

    /// Cancel every pending signal.
    pub fn clear_all(&mut self) {
        self.queue.clear();
        self.entries.clear();
    }

    /// Wait for the next signal to expire and remove it.
    ///
    /// Resolves to `None` immediately when nothing is pending, so callers in
    /// a `select!` loop should guard on `!is_empty()`.
    pub async fn next_expired(&mut self) -> Option<AssetId> {
        let expired = self.queue.next().await?;
        let id = expired.into_inner();
        self.entries.remove(&id);
        trace!(asset = %id, "Change signal expired");
        Some(id)
    }

    /// Current direction for `id`.
    pub fn direction(&self, id: &AssetId) -> ChangeDirection {
        self.entries
            .get(id)
            .map_or(ChangeDirection::None, |e| e.signal.direction)
    }

    pub fn get(&self, id: &AssetId) -> Option<ChangeSignal> {
        self.entries.get(id).map(|e| e.signal)
    }

    /// Read-only copy of the active signals.
    pub fn signals(&self) -> BTreeMap<AssetId, ChangeDirection> {
        self.entries
            .iter()
            .map(|(id, e)| (id.clone(), e.signal.direction))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DWELL: Duration = Duration::from_millis(400);

    fn id(s: &str) -> AssetId {
        AssetId::from(s)
    }

    /// Timer wheel deadlines are rounded up to the next millisecond.
    fn assert_within_tick(elapsed: Duration, expected: Duration) {
        assert!(
            elapsed >= expected && elapsed <= expected + Duration::from_millis(1),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_expires_after_dwell() {
        let mut timer = ChangeSignalTimer::new();
        let start = Instant::now();
        timer.schedule(id("bitcoin"), ChangeDirection::Increased, DWELL);

        assert_eq!(timer.direction(&id("bitcoin")), ChangeDirection::Increased);

        let expired = timer.next_expired().await;
        assert_eq!(expired, Some(id("bitcoin")));
        assert_within_tick(Instant::now() - start, DWELL);
        assert_eq!(timer.direction(&id("bitcoin")), ChangeDirection::None);
        assert!(timer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_restarts_window() {
        let mut timer = ChangeSignalTimer::new();
        let start = Instant::now();
        timer.schedule(id("bitcoin"), ChangeDirection::Increased, DWELL);

        tokio::time::advance(Duration::from_millis(300)).await;
        timer.schedule(id("bitcoin"), ChangeDirection::Decreased, DWELL);
        assert_eq!(timer.len(), 1);

        let expired = timer.next_expired().await;
        assert_eq!(expired, Some(id("bitcoin")));
        assert_within_tick(Instant::now() - start, Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_direction_wins() {
        let mut timer = ChangeSignalTimer::new();
        timer.schedule(id("bitcoin"), ChangeDirection::Increased, DWELL);
        timer.schedule(id("bitcoin"), ChangeDirection::Decreased, DWELL);

        assert_eq!(timer.direction(&id("bitcoin")), ChangeDirection::Decreased);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_expiry() {
        let mut timer = ChangeSignalTimer::new();
        timer.schedule(id("bitcoin"), ChangeDirection::Increased, DWELL);
        timer.schedule(id("ethereum"), ChangeDirection::Decreased, DWELL * 2);

        assert!(timer.clear(&id("bitcoin")));
        assert!(!timer.clear(&id("bitcoin")));

        assert_eq!(timer.next_expired().await, Some(id("ethereum")));
        assert!(timer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_and_empty_queue() {
        let mut timer = ChangeSignalTimer::new();
        timer.schedule(id("bitcoin"), ChangeDirection::Increased, DWELL);
        timer.schedule(id("tether"), ChangeDirection::Decreased, DWELL);
        assert_eq!(timer.signals().len(), 2);

        timer.clear_all();

        assert!(timer.is_empty());
        assert_eq!(timer.next_expired().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_direction_clears() {
        let mut timer = ChangeSignalTimer::new();
        timer.schedule(id("bitcoin"), ChangeDirection::Increased, DWELL);
        timer.schedule(id("bitcoin"), ChangeDirection::None, DWELL);
        assert!(timer.is_empty());
    }
}
