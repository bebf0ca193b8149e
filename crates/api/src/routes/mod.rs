pub mod companies;
pub mod health;
pub mod metrics;
