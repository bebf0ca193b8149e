use async_trait::async_trait;

use crate::Event;

/// Best-effort, asynchronous delivery of company events.
///
/// Implementations must be interchangeable: the company service never learns
/// whether, when, or how an event was delivered.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Accepts an event for delivery and returns immediately.
    ///
    /// Never blocks on I/O and never reports delivery failure. Events
    /// published after [`close`](Self::close) are discarded.
    fn publish(&self, event: Event);

    /// Stops accepting events and waits until every accepted event has
    /// finished its delivery attempt, then releases the sink.
    ///
    /// Calling it again is harmless.
    async fn close(&self);
}

/// Publisher that discards every event, for runs without a live sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    fn publish(&self, event: Event) {
        tracing::debug!(
            event_id = %event.event_id,
            operation = %event.operation,
            company_id = %event.company_id(),
            "discarding event, no sink configured"
        );
    }

    async fn close(&self) {}
}
