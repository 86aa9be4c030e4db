mod database;
mod dialect;
mod memory;
mod mysql;
mod postgres;
mod repository;

pub use database::{Database, MIGRATION_TIMEOUT};
pub use dialect::Dialect;
pub use memory::InMemoryPortfolioRepository;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use repository::SqlPortfolioRepository;
