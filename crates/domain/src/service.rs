//! Company service: validation, persistence and event publication.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use common::{Company, CompanyError, CompanyId, Result};
use company_store::CompanyStore;
use events::{Event, EventPublisher};

use crate::request::{CreateCompanyRequest, UpdateCompanyRequest};

/// Time limits applied by [`CompanyService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upper bound on a single storage call. `None` waits indefinitely.
    pub storage_timeout: Option<Duration>,
    /// Upper bound on [`CompanyService::shutdown`].
    pub shutdown_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_timeout: Some(Duration::from_secs(10)),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Orchestrates company operations.
///
/// Each mutation is validated, handed to the store, and only after the store
/// confirms it is an event handed to the publisher. Publishing never delays
/// the caller and never changes the outcome of the operation.
pub struct CompanyService<S: CompanyStore> {
    store: S,
    publisher: Arc<dyn EventPublisher>,
    config: ServiceConfig,
    shut_down: AtomicBool,
}

impl<S: CompanyStore> CompanyService<S> {
    /// Creates a service with the default time limits.
    pub fn new(store: S, publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_config(store, publisher, ServiceConfig::default())
    }

    pub fn with_config(
        store: S,
        publisher: Arc<dyn EventPublisher>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates and stores a new company, then publishes a `create` event.
    #[tracing::instrument(skip(self, request), fields(name = ?request.name))]
    pub async fn create(&self, request: CreateCompanyRequest) -> Result<Company> {
        let result = async {
            let new_company = request.validate()?;
            let company = self.storage(self.store.create(new_company)).await?;
            self.publisher.publish(Event::created(company.clone()));
            Ok(company)
        }
        .await;

        record("create", &result);
        result
    }

    /// Applies a partial update, then publishes an `update` event with the merged company.
    #[tracing::instrument(skip(self, request), fields(company_id = %id))]
    pub async fn update(&self, id: CompanyId, request: UpdateCompanyRequest) -> Result<Company> {
        let result = async {
            require_identity(id)?;
            let changes = request.validate(id)?;
            let company = self.storage(self.store.update(id, changes)).await?;
            self.publisher.publish(Event::updated(company.clone()));
            Ok(company)
        }
        .await;

        record("update", &result);
        result
    }

    /// Deletes a company, then publishes a `delete` event carrying only its id.
    #[tracing::instrument(skip(self), fields(company_id = %id))]
    pub async fn delete(&self, id: CompanyId) -> Result<()> {
        let result = async {
            require_identity(id)?;
            self.storage(self.store.delete(id)).await?;
            self.publisher.publish(Event::deleted(id));
            Ok(())
        }
        .await;

        record("delete", &result);
        result
    }

    /// Loads a company. Reads publish nothing.
    #[tracing::instrument(skip(self), fields(company_id = %id))]
    pub async fn get(&self, id: CompanyId) -> Result<Company> {
        let result = async {
            require_identity(id)?;
            self.storage(self.store.get(id)).await
        }
        .await;

        record("get", &result);
        result
    }

    /// Drains the event publisher, bounded by the shutdown timeout.
    ///
    /// Only the first call does any work.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let limit = self.config.shutdown_timeout;
        tracing::info!(shutdown_timeout = ?limit, "shutting down company service");
        match tokio::time::timeout(limit, self.publisher.close()).await {
            Ok(()) => tracing::info!("event publisher drained"),
            Err(_) => tracing::warn!(
                shutdown_timeout = ?limit,
                "event publisher did not drain in time, abandoning remaining events"
            ),
        }
    }

    /// Runs a storage call under the configured time limit.
    ///
    /// On expiry the call's future is dropped, which aborts it.
    async fn storage<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let Some(limit) = self.config.storage_timeout else {
            return call.await;
        };

        tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(CompanyError::transaction(format!(
                "storage call timed out after {limit:?}"
            )))
        })
    }
}

fn require_identity(id: CompanyId) -> Result<()> {
    if id.is_nil() {
        return Err(CompanyError::invalid_argument("id is required"));
    }
    Ok(())
}

fn record<T>(operation: &'static str, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => err.kind().as_str(),
    };
    metrics::counter!("company_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);

    match result {
        Ok(_) => tracing::debug!(operation, "operation succeeded"),
        Err(err) if err.status_code() >= 500 => {
            tracing::error!(operation, error = %err, "operation failed")
        }
        Err(err) => tracing::info!(operation, error = %err, "operation rejected"),
    }
}
