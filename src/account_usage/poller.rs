//! Background usage polling.
//!
//! One tokio task fetches on a fixed interval and posts each outcome to the
//! UI event channel. Fetches run sequentially, so the newest event on the
//! channel is always the newest reading.

use super::api_client::UsageFetcher;
use super::session::SessionCredentials;
use crate::tui::Event;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

pub struct UsagePoller {
    active: Arc<AtomicBool>,
    wake: Arc<Notify>,
    interval_ms: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl UsagePoller {
    /// Starts polling immediately; the first fetch does not wait for the
    /// interval.
    pub fn spawn(
        fetcher: Arc<dyn UsageFetcher>,
        credentials: SessionCredentials,
        interval: Duration,
        sender: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let active = Arc::new(AtomicBool::new(true));
        let wake = Arc::new(Notify::new());
        let interval_ms = Arc::new(AtomicU64::new(interval.as_millis() as u64));

        tracing::info!(
            "Starting usage poller every {}s with {:?}",
            interval.as_secs(),
            credentials
        );

        let handle = tokio::spawn(poll_loop(
            fetcher,
            credentials,
            Arc::clone(&active),
            Arc::clone(&wake),
            Arc::clone(&interval_ms),
            sender,
        ));

        Self {
            active,
            wake,
            interval_ms,
            handle,
        }
    }

    /// Cuts the current wait short and fetches now.
    pub fn refresh(&self) {
        self.wake.notify_one();
    }

    /// Takes effect from the next wait.
    pub fn set_interval(&self, interval: Duration) {
        tracing::debug!("Poll interval {:?} -> {:?}", self.interval(), interval);
        let millis = interval.as_millis() as u64;
        self.interval_ms.store(millis, Ordering::SeqCst);
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::SeqCst))
    }

    /// Stops the loop. A fetch already in flight finishes but its result is
    /// dropped.
    pub fn stop(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::info!("Stopping usage poller");
        }
        self.wake.notify_one();
        self.handle.abort();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.handle.is_finished()
    }
}

impl Drop for UsagePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    fetcher: Arc<dyn UsageFetcher>,
    credentials: SessionCredentials,
    active: Arc<AtomicBool>,
    wake: Arc<Notify>,
    interval_ms: Arc<AtomicU64>,
    sender: mpsc::UnboundedSender<Event>,
) {
    while active.load(Ordering::SeqCst) {
        let task_fetcher = Arc::clone(&fetcher);
        let task_credentials = credentials.clone();
        let result =
            tokio::task::spawn_blocking(move || task_fetcher.fetch(&task_credentials)).await;

        if !active.load(Ordering::SeqCst) {
            break;
        }

        let event = match result {
            Ok(Ok(report)) => Event::UsageFetched(report),
            Ok(Err(err)) if err.is_auth_failure() => {
                tracing::warn!("Usage poller stopping: {}", err);
                active.store(false, Ordering::SeqCst);
                let _ = sender.send(Event::SessionExpired);
                break;
            }
            Ok(Err(err)) => {
                tracing::warn!("Usage fetch failed: {}", err);
                Event::FetchFailed(err)
            }
            Err(join_err) => {
                tracing::error!("Usage fetch task failed: {}", join_err);
                Event::FetchFailed(super::FetchError::Network(join_err.to_string()))
            }
        };

        if sender.send(event).is_err() {
            tracing::debug!("Event channel closed, usage poller exiting");
            active.store(false, Ordering::SeqCst);
            break;
        }

        let wait = Duration::from_millis(interval_ms.load(Ordering::SeqCst));
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = wake.notified() => {}
        }
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
