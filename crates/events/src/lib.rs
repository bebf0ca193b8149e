//! Company change events and the publishers that ship them downstream.
//!
//! Publishing is fire-and-forget: [`EventPublisher::publish`] hands the event
//! off and returns, and [`EventPublisher::close`] drains whatever was
//! accepted before it was called.

pub mod background;
pub mod error;
pub mod event;
pub mod publisher;
pub mod shutdown;
pub mod sink;

pub use background::{BackgroundPublisher, PublisherConfig};
pub use error::SinkError;
pub use event::{COMPANY_ENTITY, Event, EventData, EventId, Operation};
pub use publisher::{EventPublisher, NoopPublisher};
pub use shutdown::Shutdown;
pub use sink::{EventSink, HttpEventSink, HttpSinkConfig};
