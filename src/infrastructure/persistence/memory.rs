use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::portfolio::Portfolio;
use crate::domain::repository::{PortfolioRepository, RepositoryError};

/// In-memory repository used by the integration tests and local
/// experimentation. Stores deep clones, so callers never observe shared
/// mutation.
#[derive(Default)]
pub struct InMemoryPortfolioRepository {
    portfolios: RwLock<HashMap<String, Portfolio>>,
}

impl InMemoryPortfolioRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortfolioRepository for InMemoryPortfolioRepository {
    async fn save(&self, portfolio: &Portfolio) -> Result<(), RepositoryError> {
        self.portfolios
            .write()
            .await
            .insert(portfolio.id.clone(), portfolio.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Portfolio, RepositoryError> {
        self.portfolios
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::PortfolioNotFound { id: id.to_string() })
    }

    async fn find_all(&self) -> Result<Vec<Portfolio>, RepositoryError> {
        let mut portfolios: Vec<Portfolio> =
            self.portfolios.read().await.values().cloned().collect();
        portfolios.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(portfolios)
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.portfolios.write().await.remove(id);
        Ok(())
    }
}
