use std::sync::Arc;

use async_trait::async_trait;

use crate::{Company, CompanyChanges, CompanyId, NewCompany, Result};

/// Persistence contract for companies.
///
/// Implementations translate their own failures into [`common::CompanyError`]
/// before returning and must not publish events or hold locks beyond a
/// single call. Dropping a returned future aborts the call.
#[async_trait]
pub trait CompanyStore: Send + Sync {
    /// Stores a new company, assigning its identity and timestamps.
    ///
    /// Fails with `AlreadyExists` when the name is taken.
    async fn create(&self, company: NewCompany) -> Result<Company>;

    /// Merges `changes` into the company stored under `id`.
    ///
    /// Fails with `NotFound` when `id` is absent and with `IdentityMismatch`
    /// when the payload names a different, non-nil identity. The stored
    /// company is left untouched on failure.
    async fn update(&self, id: CompanyId, changes: CompanyChanges) -> Result<Company>;

    /// Removes the company stored under `id`.
    async fn delete(&self, id: CompanyId) -> Result<()>;

    /// Loads the company stored under `id`.
    async fn get(&self, id: CompanyId) -> Result<Company>;
}

#[async_trait]
impl<T: CompanyStore + ?Sized> CompanyStore for Arc<T> {
    async fn create(&self, company: NewCompany) -> Result<Company> {
        (**self).create(company).await
    }

    async fn update(&self, id: CompanyId, changes: CompanyChanges) -> Result<Company> {
        (**self).update(id, changes).await
    }

    async fn delete(&self, id: CompanyId) -> Result<()> {
        (**self).delete(id).await
    }

    async fn get(&self, id: CompanyId) -> Result<Company> {
        (**self).get(id).await
    }
}
