use async_trait::async_trait;
use thiserror::Error;

use super::portfolio::Portfolio;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("portfolio not found: {id}")]
    PortfolioNotFound { id: String },

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("transaction failed: {0}")]
    Transaction(String),
}

/// Durable storage for portfolio aggregates.
#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    /// Atomically upserts the portfolio row, its instruments (insert-if-absent
    /// by ISIN) and its positions. All-or-nothing.
    async fn save(&self, portfolio: &Portfolio) -> Result<(), RepositoryError>;

    /// Loads a portfolio with positions and instruments eagerly populated.
    async fn find_by_id(&self, id: &str) -> Result<Portfolio, RepositoryError>;

    /// Loads every portfolio, newest first by creation time. An empty store
    /// yields an empty vec, not an error.
    async fn find_all(&self) -> Result<Vec<Portfolio>, RepositoryError>;

    /// Deletes a portfolio and its positions. Unknown ids are not an error.
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}
