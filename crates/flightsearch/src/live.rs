//! Live result feeds.
//!
//! A [`LiveFeed`] is a subscription handle yielding a sequence of snapshots.
//! Feeds are backed by a spawned task that pushes values over a bounded
//! channel; dropping (or [cancelling](LiveFeed::cancel)) the handle aborts the
//! task and releases whatever it holds.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::error::Result;

/// Capacity of the channel between a feed's producer task and its handle.
const FEED_BUFFER: usize = 16;

/// A cancellable stream of snapshots.
pub struct LiveFeed<T> {
    rx: mpsc::Receiver<T>,
    task: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> LiveFeed<T> {
    /// A feed that is already complete and never yields.
    #[must_use]
    pub fn empty() -> Self {
        let (_tx, rx) = mpsc::channel(1);
        Self { rx, task: None }
    }

    /// A feed that yields `value` once and completes.
    #[must_use]
    pub fn once(value: T) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // Capacity is 1 and the channel is fresh, so this cannot fail.
        let _ = tx.try_send(value);
        Self { rx, task: None }
    }

    /// Spawn `producer` and expose what it sends as a feed.
    ///
    /// The producer should stop when `Sender::send` fails, which happens once
    /// the handle is dropped. It is also aborted at its next suspension point.
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(mpsc::Sender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let task = tokio::spawn(producer(tx));
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Re-run `query` every time `changes` is bumped, emitting each result.
    ///
    /// The query runs once immediately. The feed ends when the change source
    /// is dropped or the handle is dropped.
    pub fn watching<Q>(mut changes: watch::Receiver<u64>, query: Q) -> Self
    where
        Q: Fn() -> T + Send + 'static,
    {
        Self::spawn(move |tx| async move {
            loop {
                let generation = *changes.borrow_and_update();
                trace!(generation, "Running live query");
                if tx.send(query()).await.is_err() {
                    break;
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the feed has completed.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Stop the feed. Equivalent to dropping it.
    pub fn cancel(self) {}

    /// Suppress snapshots that are followed by another within `period`.
    ///
    /// A snapshot is forwarded only after the source has been quiet for
    /// `period`. When the source completes, a pending snapshot is delivered
    /// straight away.
    #[must_use]
    pub fn debounce(mut self, period: Duration) -> Self {
        Self::spawn(move |tx| async move {
            let mut pending: Option<(T, Instant)> = None;
            loop {
                let deadline = pending.as_ref().map(|(_, at)| *at);
                tokio::select! {
                    next = self.next() => match next {
                        Some(value) => pending = Some((value, Instant::now() + period)),
                        None => {
                            if let Some((value, _)) = pending.take() {
                                let _ = tx.send(value).await;
                            }
                            break;
                        }
                    },
                    () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                        if let Some((value, _)) = pending.take() {
                            if tx.send(value).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
            debug!("Debounced feed finished");
        })
    }
}

impl<T: Send + 'static> LiveFeed<Result<T>> {
    /// End the feed right after the first `Err` it yields.
    #[must_use]
    pub fn fuse_on_error(mut self) -> Self {
        Self::spawn(move |tx| async move {
            while let Some(item) = self.next().await {
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    break;
                }
            }
        })
    }
}

impl<T> Drop for LiveFeed<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T> fmt::Debug for LiveFeed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveFeed")
            .field("active", &self.task.as_ref().is_some_and(|t| !t.is_finished()))
            .finish_non_exhaustive()
    }
}
