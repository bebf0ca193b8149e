pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{Company, CompanyChanges, CompanyError, CompanyId, NewCompany, Result};
pub use memory::InMemoryCompanyStore;
pub use postgres::PostgresCompanyStore;
pub use store::CompanyStore;
