//! Shared types for the company registry.
//!
//! Holds the company entity, its identity, the validated inputs the storage
//! layer accepts, and the closed error taxonomy every layer reports in.

pub mod company;
pub mod error;
pub mod types;

pub use company::{Company, CompanyChanges, CompanyType, NewCompany};
pub use error::{CompanyError, ErrorKind, Result};
pub use types::CompanyId;
