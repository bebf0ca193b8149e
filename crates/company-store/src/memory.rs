use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Company, CompanyChanges, CompanyError, CompanyId, NewCompany, Result, store::CompanyStore,
};

/// In-memory company store for tests and database-less runs.
///
/// Enforces the same name uniqueness and identity rules as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryCompanyStore {
    companies: Arc<RwLock<HashMap<CompanyId, Company>>>,
}

impl InMemoryCompanyStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored companies.
    pub async fn len(&self) -> usize {
        self.companies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.companies.read().await.is_empty()
    }

    /// Removes every stored company.
    pub async fn clear(&self) {
        self.companies.write().await.clear();
    }
}

fn name_taken(
    companies: &HashMap<CompanyId, Company>,
    name: &str,
    except: Option<CompanyId>,
) -> bool {
    companies
        .values()
        .any(|c| c.name == name && Some(c.id) != except)
}

#[async_trait]
impl CompanyStore for InMemoryCompanyStore {
    async fn create(&self, company: NewCompany) -> Result<Company> {
        let mut companies = self.companies.write().await;

        if name_taken(&companies, &company.name, None) {
            return Err(CompanyError::AlreadyExists(company.name));
        }

        let stored = company.into_company(CompanyId::new(), Utc::now());
        companies.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: CompanyId, changes: CompanyChanges) -> Result<Company> {
        let mut companies = self.companies.write().await;

        let existing = companies.get(&id).ok_or(CompanyError::NotFound(id))?;

        if changes.conflicts_with(id) {
            return Err(CompanyError::IdentityMismatch(id));
        }

        if let Some(name) = &changes.name
            && name_taken(&companies, name, Some(id))
        {
            return Err(CompanyError::AlreadyExists(name.clone()));
        }

        let mut merged = existing.clone();
        changes.apply_to(&mut merged, Utc::now());
        companies.insert(id, merged.clone());
        Ok(merged)
    }

    async fn delete(&self, id: CompanyId) -> Result<()> {
        self.companies
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(CompanyError::NotFound(id))
    }

    async fn get(&self, id: CompanyId) -> Result<Company> {
        self.companies
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CompanyError::NotFound(id))
    }
}
