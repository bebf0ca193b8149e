//! The company entity and the validated inputs accepted by storage.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CompanyError, CompanyId};

/// Legal form of a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanyType {
    Corporation,
    NonProfit,
    Cooperative,
    #[serde(rename = "Sole Proprietorship", alias = "SoleProprietorship")]
    SoleProprietorship,
}

impl CompanyType {
    pub const ALL: [CompanyType; 4] = [
        CompanyType::Corporation,
        CompanyType::NonProfit,
        CompanyType::Cooperative,
        CompanyType::SoleProprietorship,
    ];

    /// Wire and storage name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyType::Corporation => "Corporation",
            CompanyType::NonProfit => "NonProfit",
            CompanyType::Cooperative => "Cooperative",
            CompanyType::SoleProprietorship => "Sole Proprietorship",
        }
    }
}

impl std::fmt::Display for CompanyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompanyType {
    type Err = CompanyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Corporation" => Ok(CompanyType::Corporation),
            "NonProfit" => Ok(CompanyType::NonProfit),
            "Cooperative" => Ok(CompanyType::Cooperative),
            "Sole Proprietorship" | "SoleProprietorship" => Ok(CompanyType::SoleProprietorship),
            other => Err(CompanyError::InvalidType(other.to_string())),
        }
    }
}

/// A stored company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub amount_of_employees: u32,
    pub registered: bool,
    #[serde(rename = "type")]
    pub company_type: CompanyType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated company waiting to be stored.
///
/// Carries no identity or timestamps; the store assigns those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompany {
    pub name: String,
    pub description: Option<String>,
    pub amount_of_employees: u32,
    pub registered: bool,
    pub company_type: CompanyType,
}

impl NewCompany {
    /// Materializes the stored form with the given identity and timestamp.
    pub fn into_company(self, id: CompanyId, now: DateTime<Utc>) -> Company {
        Company {
            id,
            name: self.name,
            description: self.description,
            amount_of_employees: self.amount_of_employees,
            registered: self.registered,
            company_type: self.company_type,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A validated partial update.
///
/// `Some` fields overwrite the stored value, `None` fields keep it. `id` is
/// the identity the client sent in the payload, if any; the store rejects
/// the update when it is present and differs from the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyChanges {
    pub id: Option<CompanyId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub amount_of_employees: Option<u32>,
    pub registered: Option<bool>,
    pub company_type: Option<CompanyType>,
}

impl CompanyChanges {
    /// Returns true when no attribute would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.amount_of_employees.is_none()
            && self.registered.is_none()
            && self.company_type.is_none()
    }

    /// Returns true if the payload names an identity other than `target`.
    pub fn conflicts_with(&self, target: CompanyId) -> bool {
        matches!(self.id, Some(id) if !id.is_nil() && id != target)
    }

    /// Merges the present fields into `company` and bumps `updated_at`.
    pub fn apply_to(&self, company: &mut Company, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            company.name = name.clone();
        }
        if let Some(description) = &self.description {
            company.description = Some(description.clone());
        }
        if let Some(amount) = self.amount_of_employees {
            company.amount_of_employees = amount;
        }
        if let Some(registered) = self.registered {
            company.registered = registered;
        }
        if let Some(company_type) = self.company_type {
            company.company_type = company_type;
        }
        company.updated_at = now;
    }
}
