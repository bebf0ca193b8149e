use chrono::{DateTime, Utc};
use common::{Company, CompanyId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity name carried by every event this service emits.
pub const COMPANY_ENTITY: &str = "company";

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of mutation an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload: the company after the mutation, or only its identity for deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventData {
    Company(Company),
    Id(CompanyId),
}

/// An immutable record of one successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub event_id: EventId,

    pub operation: Operation,

    /// Always [`COMPANY_ENTITY`].
    pub entity: String,

    /// When the mutation was confirmed by storage.
    pub occurred_at: DateTime<Utc>,

    pub data: EventData,
}

impl Event {
    fn new(operation: Operation, data: EventData) -> Self {
        Self {
            event_id: EventId::new(),
            operation,
            entity: COMPANY_ENTITY.to_string(),
            occurred_at: Utc::now(),
            data,
        }
    }

    /// Event for a newly stored company.
    pub fn created(company: Company) -> Self {
        Self::new(Operation::Create, EventData::Company(company))
    }

    /// Event carrying the merged company after an update.
    pub fn updated(company: Company) -> Self {
        Self::new(Operation::Update, EventData::Company(company))
    }

    /// Event carrying only the identity of a deleted company.
    pub fn deleted(id: CompanyId) -> Self {
        Self::new(Operation::Delete, EventData::Id(id))
    }

    /// Identity of the company the event is about.
    pub fn company_id(&self) -> CompanyId {
        match &self.data {
            EventData::Company(company) => company.id,
            EventData::Id(id) => *id,
        }
    }
}
