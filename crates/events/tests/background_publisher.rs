//! Behaviour of the background publisher against controllable sinks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::CompanyId;
use events::{
    BackgroundPublisher, Event, EventPublisher, EventSink, PublisherConfig, Shutdown, SinkError,
};

/// Sink that sleeps, optionally fails the first few attempts, and counts.
#[derive(Clone, Default)]
struct CountingSink {
    delay: Duration,
    failures_before_success: usize,
    attempts: Arc<AtomicUsize>,
    delivered: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl CountingSink {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSink for CountingSink {
    async fn deliver(&self, _event: &Event) -> Result<(), SinkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if attempt < self.failures_before_success {
            return Err(SinkError::Rejected {
                status: 503,
                body: "try later".to_string(),
            });
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Sink whose deliveries never complete.
struct HangingSink;

#[async_trait]
impl EventSink for HangingSink {
    async fn deliver(&self, _event: &Event) -> Result<(), SinkError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

fn publisher<K: EventSink>(sink: K, config: PublisherConfig) -> BackgroundPublisher<K> {
    BackgroundPublisher::new(sink, config, Shutdown::new())
}

fn event() -> Event {
    Event::deleted(CompanyId::new())
}

#[tokio::test]
async fn publish_returns_before_slow_delivery_finishes() {
    let sink = CountingSink::with_delay(Duration::from_secs(2));
    let publisher = publisher(sink.clone(), PublisherConfig::default());

    let start = Instant::now();
    publisher.publish(event());
    let elapsed = start.elapsed();

    assert!(elapsed < Duration::from_millis(50), "publish took {elapsed:?}");
    assert_eq!(publisher.in_flight(), 1);
    assert_eq!(sink.delivered(), 0);
}

#[tokio::test]
async fn close_waits_for_every_accepted_event() {
    let sink = CountingSink::with_delay(Duration::from_millis(20));
    let publisher = publisher(
        sink.clone(),
        PublisherConfig {
            max_concurrency: 8,
            ..Default::default()
        },
    );

    for _ in 0..50 {
        publisher.publish(event());
    }
    publisher.close().await;

    assert_eq!(sink.delivered(), 50);
    assert_eq!(publisher.in_flight(), 0);
    assert_eq!(sink.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn publish_after_close_is_discarded() {
    let sink = CountingSink::default();
    let publisher = publisher(sink.clone(), PublisherConfig::default());
    publisher.close().await;

    publisher.publish(event());
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(publisher.is_closed());
    assert_eq!(sink.attempts(), 0);
    assert_eq!(publisher.in_flight(), 0);
}

#[tokio::test]
async fn second_close_is_harmless() {
    let sink = CountingSink::default();
    let publisher = publisher(sink.clone(), PublisherConfig::default());

    publisher.publish(event());
    publisher.close().await;
    publisher.close().await;

    assert_eq!(sink.delivered(), 1);
    assert_eq!(sink.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hanging_sink_is_bounded_by_delivery_timeout() {
    let publisher = publisher(
        HangingSink,
        PublisherConfig {
            delivery_timeout: Duration::from_millis(50),
            ..Default::default()
        },
    );

    publisher.publish(event());
    publisher.publish(event());

    tokio::time::timeout(Duration::from_secs(2), publisher.close())
        .await
        .expect("close must not hang on an unreachable sink");
    assert_eq!(publisher.in_flight(), 0);
}

#[tokio::test]
async fn drain_timeout_cancels_remaining_deliveries() {
    let shutdown = Shutdown::new();
    let publisher = BackgroundPublisher::new(
        HangingSink,
        PublisherConfig {
            delivery_timeout: Duration::from_secs(60),
            drain_timeout: Duration::from_millis(50),
            ..Default::default()
        },
        shutdown.clone(),
    );

    publisher.publish(event());

    tokio::time::timeout(Duration::from_secs(2), publisher.close())
        .await
        .expect("close must give up after the drain timeout");
    assert!(shutdown.is_triggered());
    assert_eq!(publisher.in_flight(), 0);
}

#[tokio::test]
async fn external_shutdown_tears_down_in_flight_deliveries() {
    let shutdown = Shutdown::new();
    let publisher = BackgroundPublisher::new(
        HangingSink,
        PublisherConfig {
            delivery_timeout: Duration::from_secs(60),
            ..Default::default()
        },
        shutdown.clone(),
    );

    publisher.publish(event());
    publisher.publish(event());
    shutdown.trigger();

    tokio::time::timeout(Duration::from_secs(1), async {
        while publisher.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("deliveries should stop once shutdown fires");
}

#[tokio::test]
async fn backlog_beyond_max_pending_is_dropped() {
    let publisher = publisher(
        HangingSink,
        PublisherConfig {
            max_pending: 2,
            delivery_timeout: Duration::from_millis(100),
            ..Default::default()
        },
    );

    for _ in 0..5 {
        publisher.publish(event());
    }

    assert_eq!(publisher.in_flight(), 2);
    publisher.close().await;
}

#[tokio::test]
async fn concurrency_is_capped_by_max_concurrency() {
    let sink = CountingSink::with_delay(Duration::from_millis(100));
    let publisher = publisher(
        sink.clone(),
        PublisherConfig {
            max_concurrency: 2,
            ..Default::default()
        },
    );

    for _ in 0..6 {
        publisher.publish(event());
    }
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(sink.attempts(), 2);
    publisher.close().await;
    assert_eq!(sink.delivered(), 6);
}

#[tokio::test]
async fn failed_attempts_are_retried_up_to_max_attempts() {
    let sink = CountingSink {
        failures_before_success: 1,
        ..Default::default()
    };
    let publisher = publisher(
        sink.clone(),
        PublisherConfig {
            max_attempts: 2,
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        },
    );

    publisher.publish(event());
    publisher.close().await;

    assert_eq!(sink.attempts(), 2);
    assert_eq!(sink.delivered(), 1);
}

#[tokio::test]
async fn single_attempt_failure_is_terminal() {
    let sink = CountingSink {
        failures_before_success: 1,
        ..Default::default()
    };
    let publisher = publisher(sink.clone(), PublisherConfig::default());

    publisher.publish(event());
    publisher.close().await;

    assert_eq!(sink.attempts(), 1);
    assert_eq!(sink.delivered(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_racing_with_publishers_never_leaves_work_behind() {
    let sink = CountingSink::with_delay(Duration::from_millis(1));
    let publisher = Arc::new(publisher(sink.clone(), PublisherConfig::default()));

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let publisher = Arc::clone(&publisher);
        tasks.push(tokio::spawn(async move {
            for _ in 0..100 {
                publisher.publish(event());
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::time::sleep(Duration::from_millis(5)).await;
    publisher.close().await;
    let delivered_at_close = sink.delivered();

    for task in tasks {
        task.await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(publisher.in_flight(), 0);
    assert_eq!(sink.delivered(), delivered_at_close);
    assert_eq!(sink.attempts(), delivered_at_close);
}
