//! Company service layer.
//!
//! This crate provides:
//! - Validation of create and update payloads
//! - [`CompanyService`], which stores companies and publishes an event for
//!   every confirmed mutation

pub mod request;
pub mod service;

pub use request::{CreateCompanyRequest, UpdateCompanyRequest};
pub use service::{CompanyService, ServiceConfig};
