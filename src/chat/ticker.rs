//! Delay source that paces the reveal.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

/// Something that can wait for a typing delay.
#[async_trait]
pub trait Ticker: Send + Sync {
    async fn wait(&self, delay: Duration);
}

/// Real-time ticker backed by `tokio::time::sleep`.
#[derive(Debug, Default)]
pub struct TokioTicker;

#[async_trait]
impl Ticker for TokioTicker {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Ticker that never sleeps and records every requested delay.
#[derive(Debug, Default)]
pub struct InstantTicker {
    waits: Mutex<Vec<Duration>>,
}

impl InstantTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.waits.lock().map(|w| w.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Ticker for InstantTicker {
    async fn wait(&self, delay: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(delay);
        }
        // Still a suspension point, so select! loops get a chance to run.
        tokio::task::yield_now().await;
    }
}
