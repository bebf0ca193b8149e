//! Publisher that delivers each event on its own tracked background task.
//!
//! Every accepted event bumps an in-flight counter before its task is
//! spawned, and the task's guard lowers it when the task ends, however it
//! ends. `close` stops admission and waits for the counter to reach zero.
//! A semaphore caps concurrent deliveries and `max_pending` caps the number
//! of accepted but unfinished events, so load cannot grow the task set
//! without bound.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Semaphore, watch};

use crate::{Event, EventPublisher, EventSink, Shutdown, SinkError};

/// Tuning for [`BackgroundPublisher`].
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Upper bound on one delivery attempt.
    pub delivery_timeout: Duration,
    /// Deliveries allowed to run at the same time.
    pub max_concurrency: usize,
    /// Accepted events not yet finished; beyond this, events are dropped.
    pub max_pending: usize,
    /// Attempts per event, including the first.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_backoff: Duration,
    /// How long `close` lets in-flight deliveries finish before cancelling them.
    ///
    /// Keep this below any outer bound placed on `close`, or the caller gives
    /// up before the cancellation and the sink's own close ever run.
    pub drain_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(5),
            max_concurrency: 32,
            max_pending: 10_000,
            max_attempts: 1,
            retry_backoff: Duration::from_millis(200),
            drain_timeout: Duration::from_secs(24),
        }
    }
}

struct Inner<K> {
    sink: K,
    config: PublisherConfig,
    permits: Semaphore,
    in_flight: watch::Sender<usize>,
    accepting: AtomicBool,
    shutdown: Shutdown,
}

/// Lowers the in-flight counter when dropped.
struct InFlightGuard<K: EventSink> {
    inner: Arc<Inner<K>>,
}

impl<K: EventSink> Drop for InFlightGuard<K> {
    fn drop(&mut self) {
        self.inner.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Fire-and-forget publisher backed by an [`EventSink`].
pub struct BackgroundPublisher<K: EventSink> {
    inner: Arc<Inner<K>>,
}

impl<K: EventSink> BackgroundPublisher<K> {
    /// Creates a publisher whose deliveries stop when `shutdown` fires.
    pub fn new(sink: K, config: PublisherConfig, shutdown: Shutdown) -> Self {
        let permits = Semaphore::new(config.max_concurrency.max(1));
        let (in_flight, _rx) = watch::channel(0);

        Self {
            inner: Arc::new(Inner {
                sink,
                config,
                permits,
                in_flight,
                accepting: AtomicBool::new(true),
                shutdown,
            }),
        }
    }

    /// Accepted events whose delivery attempt has not finished yet.
    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    pub fn is_closed(&self) -> bool {
        !self.inner.accepting.load(Ordering::SeqCst)
    }

    pub fn sink(&self) -> &K {
        &self.inner.sink
    }

    fn admit(&self) -> Option<InFlightGuard<K>> {
        let max_pending = self.inner.config.max_pending;
        let admitted = self.inner.in_flight.send_if_modified(|n| {
            if *n < max_pending {
                *n += 1;
                true
            } else {
                false
            }
        });

        admitted.then(|| InFlightGuard {
            inner: Arc::clone(&self.inner),
        })
    }
}

impl<K: EventSink> Inner<K> {
    async fn deliver(&self, event: Event) {
        let _permit = tokio::select! {
            permit = self.permits.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
            () = self.shutdown.triggered() => {
                self.record_failure(&event, &SinkError::Cancelled, 0);
                return;
            }
        };

        let started = Instant::now();
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let limit = self.config.delivery_timeout;
            let outcome = tokio::select! {
                result = tokio::time::timeout(limit, self.sink.deliver(&event)) => {
                    result.unwrap_or(Err(SinkError::Timeout(limit)))
                }
                () = self.shutdown.triggered() => Err(SinkError::Cancelled),
            };

            match outcome {
                Ok(()) => {
                    metrics::counter!("company_events_delivered_total").increment(1);
                    metrics::histogram!("company_event_delivery_seconds")
                        .record(started.elapsed().as_secs_f64());
                    tracing::debug!(
                        event_id = %event.event_id,
                        operation = %event.operation,
                        attempt,
                        "event delivered"
                    );
                    return;
                }
                Err(err @ SinkError::Cancelled) => {
                    self.record_failure(&event, &err, attempt);
                    return;
                }
                Err(err) if attempt < max_attempts => {
                    tracing::warn!(
                        event_id = %event.event_id,
                        attempt,
                        error = %err,
                        "event delivery failed, retrying"
                    );
                    tokio::select! {
                        () = tokio::time::sleep(self.config.retry_backoff) => {}
                        () = self.shutdown.triggered() => {
                            self.record_failure(&event, &SinkError::Cancelled, attempt);
                            return;
                        }
                    }
                }
                Err(err) => {
                    self.record_failure(&event, &err, attempt);
                    return;
                }
            }
        }
    }

    fn record_failure(&self, event: &Event, err: &SinkError, attempts: u32) {
        metrics::counter!("company_events_failed_total").increment(1);
        tracing::error!(
            event_id = %event.event_id,
            operation = %event.operation,
            company_id = %event.company_id(),
            attempts,
            error = %err,
            "event delivery failed"
        );
    }

    async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

#[async_trait]
impl<K: EventSink> EventPublisher for BackgroundPublisher<K> {
    fn publish(&self, event: Event) {
        // Counted before the admission check so a racing close() waits for it.
        let Some(guard) = self.admit() else {
            metrics::counter!("company_events_dropped_total", "reason" => "backlog").increment(1);
            tracing::warn!(
                event_id = %event.event_id,
                max_pending = self.inner.config.max_pending,
                "event backlog full, dropping event"
            );
            return;
        };

        if !self.inner.accepting.load(Ordering::SeqCst) {
            drop(guard);
            metrics::counter!("company_events_dropped_total", "reason" => "closed").increment(1);
            tracing::warn!(event_id = %event.event_id, "publisher closed, dropping event");
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            drop(guard);
            metrics::counter!("company_events_dropped_total", "reason" => "no_runtime")
                .increment(1);
            tracing::error!(event_id = %event.event_id, "no async runtime, dropping event");
            return;
        };

        metrics::counter!("company_events_published_total").increment(1);
        runtime.spawn(async move {
            let guard = guard;
            guard.inner.deliver(event).await;
        });
    }

    async fn close(&self) {
        let first_close = self.inner.accepting.swap(false, Ordering::SeqCst);

        let pending = self.in_flight();
        tracing::info!(pending, "draining event publisher");

        let drained = tokio::time::timeout(self.inner.config.drain_timeout, self.inner.wait_idle())
            .await
            .is_ok();

        if !drained {
            tracing::warn!(
                remaining = self.in_flight(),
                drain_timeout = ?self.inner.config.drain_timeout,
                "drain timed out, cancelling in-flight deliveries"
            );
            self.inner.shutdown.trigger();
            self.inner.wait_idle().await;
        }

        if first_close {
            if let Err(err) = self.inner.sink.close().await {
                tracing::error!(error = %err, "failed to close event sink");
            }
            tracing::info!("event publisher closed");
        }
    }
}
