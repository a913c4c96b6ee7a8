//! Trailing-edge debounced writer.
//!
//! Holds at most one pending value. Scheduling a value replaces the pending
//! one and restarts the quiet-period timer; when the timer elapses the latest
//! value is handed to the sink. Re-arming cancels only the timer, never a
//! sink call that has already started.
//!
//! Every scheduled value gets a sequence number. Sink calls are serialised,
//! and a value whose sequence is not newer than the last one written is
//! dropped, so an older write can never land after a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Receives debounced values.
#[async_trait]
pub trait DebounceSink<T>: Send + Sync {
    async fn write(&self, value: T);
}

struct Pending<T> {
    seq: u64,
    value: T,
    timer: CancellationToken,
}

struct Inner<T> {
    window: Duration,
    sink: Arc<dyn DebounceSink<T>>,
    next_seq: AtomicU64,
    pending: Mutex<Option<Pending<T>>>,
    /// Sequence of the newest value handed to the sink. Held across the
    /// sink call to serialise writes.
    last_written: Mutex<u64>,
}

pub struct DebouncedWriter<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for DebouncedWriter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + 'static> DebouncedWriter<T> {
    pub fn new(window: Duration, sink: Arc<dyn DebounceSink<T>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                window,
                sink,
                next_seq: AtomicU64::new(0),
                pending: Mutex::new(None),
                last_written: Mutex::new(0),
            }),
        }
    }

    /// Replace the pending value and restart the timer.
    pub async fn schedule(&self, value: T) {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let timer = CancellationToken::new();

        {
            let mut pending = self.inner.pending.lock().await;
            if let Some(previous) = pending.replace(Pending {
                seq,
                value,
                timer: timer.clone(),
            }) {
                previous.timer.cancel();
                tracing::debug!(superseded = previous.seq, seq, "Debounce re-armed");
            }
        }

        let inner = self.inner.clone();
        let window = self.inner.window;
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(window) => {
                    inner.fire(seq).await;
                }
            }
        });
    }

    /// Write the pending value now, if there is one. Returns only once no
    /// sink call is in flight.
    pub async fn flush(&self) {
        let taken = self.inner.pending.lock().await.take();
        match taken {
            Some(pending) => {
                pending.timer.cancel();
                self.inner.dispatch(pending.seq, pending.value).await;
            }
            // a timer-fired write may still be running
            None => drop(self.inner.last_written.lock().await),
        }
    }

    /// Drop the pending value if it matches `predicate`.
    pub async fn cancel_where(&self, predicate: impl FnOnce(&T) -> bool) -> Option<T> {
        let mut pending = self.inner.pending.lock().await;
        if !pending.as_ref().is_some_and(|p| predicate(&p.value)) {
            return None;
        }
        pending.take().map(|p| {
            p.timer.cancel();
            p.value
        })
    }

    pub async fn has_pending(&self) -> bool {
        self.inner.pending.lock().await.is_some()
    }
}

impl<T: Send + 'static> Inner<T> {
    async fn fire(&self, seq: u64) {
        let value = {
            let mut pending = self.pending.lock().await;
            if pending.as_ref().is_some_and(|p| p.seq == seq) {
                pending.take().map(|p| p.value)
            } else {
                None
            }
        };
        if let Some(value) = value {
            self.dispatch(seq, value).await;
        }
    }

    async fn dispatch(&self, seq: u64, value: T) {
        let mut last = self.last_written.lock().await;
        if seq <= *last {
            tracing::debug!(seq, last_written = *last, "Dropping superseded write");
            return;
        }
        *last = seq;
        self.sink.write(value).await;
    }
}
