//! Heartbeat monitoring for feed connections.
//!
//! Any inbound frame counts as a sign of life. After `interval_ms` of
//! silence a protocol ping is sent; if nothing arrives within `timeout_ms`
//! of that ping the connection is considered dropped.

use parking_lot::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// What the connection loop should do on a heartbeat check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    Idle,
    SendPing,
    TimedOut,
}

#[derive(Debug)]
struct HeartbeatState {
    last_frame: Instant,
    ping_sent_at: Option<Instant>,
}

/// Heartbeat monitor for one connection.
#[derive(Debug)]
pub struct HeartbeatManager {
    interval_ms: u64,
    timeout_ms: u64,
    state: RwLock<HeartbeatState>,
}

impl HeartbeatManager {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms,
            timeout_ms,
            state: RwLock::new(HeartbeatState {
                last_frame: Instant::now(),
                ping_sent_at: None,
            }),
        }
    }

    /// Reset heartbeat state (called on connection).
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.last_frame = Instant::now();
        state.ping_sent_at = None;
    }

    /// Record that a ping was sent.
    pub fn record_ping(&self) {
        self.state.write().ping_sent_at = Some(Instant::now());
        debug!("Recorded ping");
    }

    /// Record any inbound frame (text, pong, ping).
    pub fn record_frame(&self) {
        let now = Instant::now();
        let mut state = self.state.write();
        if let Some(sent) = state.ping_sent_at.take() {
            debug!(rtt_ms = (now - sent).as_millis() as u64, "Frame after ping");
        }
        state.last_frame = now;
    }

    /// Decide the next heartbeat step.
    pub fn check(&self) -> HeartbeatAction {
        let state = self.state.read();
        let now = Instant::now();
        match state.ping_sent_at {
            Some(sent) if now - sent > Duration::from_millis(self.timeout_ms) => {
                HeartbeatAction::TimedOut
            }
            Some(_) => HeartbeatAction::Idle,
            None if now - state.last_frame >= Duration::from_millis(self.interval_ms) => {
                HeartbeatAction::SendPing
            }
            None => HeartbeatAction::Idle,
        }
    }

    /// Time since the last inbound frame.
    pub fn time_since_last_frame(&self) -> Duration {
        Instant::now() - self.state.read().last_frame
    }

    /// Wait for the next heartbeat check.
    pub async fn wait_for_check(&self) {
        let period = (self.interval_ms / 2)
            .min(self.timeout_ms / 2)
            .max(1);
        tokio::time::sleep(Duration::from_millis(period)).await;
    }
}
