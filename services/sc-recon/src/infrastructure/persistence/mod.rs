//! PostgreSQL 持久化

mod postgres_unit_of_work;
mod rows;
pub mod schema;
mod tx_repositories;

pub use postgres_unit_of_work::{PostgresUnitOfWork, PostgresUnitOfWorkFactory};
