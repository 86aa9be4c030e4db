use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::decimal::Decimal;
use crate::domain::portfolio::Portfolio;
use crate::domain::ports::MarketDataProvider;
use crate::domain::position::Position;
use crate::domain::repository::PortfolioRepository;

pub const DEFAULT_PORTFOLIO_NAME: &str = "default";

/// Use-case layer over the portfolio aggregate.
///
/// The service owns the process-wide default portfolio. The aggregate lives
/// behind a mutex that every mutation holds across its whole
/// read-modify-write *including* the save, so concurrent calls cannot
/// interleave and the one-position-per-ISIN invariant survives.
pub struct PortfolioService {
    pub(crate) repo: Arc<dyn PortfolioRepository>,
    pub(crate) market_data: Arc<dyn MarketDataProvider>,
    pub(crate) portfolio: Mutex<Portfolio>,
}

impl PortfolioService {
    /// Builds the service, adopting an already-persisted default portfolio
    /// when one exists so its identity survives restarts. Only a fresh store
    /// gets a new portfolio row.
    pub async fn new(
        repo: Arc<dyn PortfolioRepository>,
        market_data: Arc<dyn MarketDataProvider>,
    ) -> Result<Self> {
        let existing = repo
            .find_all()
            .await
            .context("failed to load portfolios")?
            .into_iter()
            .find(|p| p.name == DEFAULT_PORTFOLIO_NAME);

        let portfolio = match existing {
            Some(portfolio) => {
                info!(
                    portfolio_id = %portfolio.id,
                    positions = portfolio.positions.len(),
                    "Reusing persisted default portfolio"
                );
                portfolio
            }
            None => {
                let portfolio = Portfolio::new(DEFAULT_PORTFOLIO_NAME);
                repo.save(&portfolio)
                    .await
                    .context("failed to persist default portfolio")?;
                info!(portfolio_id = %portfolio.id, "Created default portfolio");
                portfolio
            }
        };

        Ok(Self {
            repo,
            market_data,
            portfolio: Mutex::new(portfolio),
        })
    }

    /// Resolves the instrument and a fresh quote for `isin`, then adds the
    /// resulting position to the default portfolio (merging if the ISIN is
    /// already held) and persists the aggregate.
    pub async fn add_position(
        &self,
        isin: &str,
        invested_amount: Decimal,
        currency: &str,
    ) -> Result<Position> {
        let instrument = self
            .market_data
            .search_by_isin(isin)
            .await
            .with_context(|| format!("failed to find instrument for ISIN {isin}"))?;

        let quote = self
            .market_data
            .get_quote(&instrument.symbol)
            .await
            .with_context(|| format!("failed to get quote for {}", instrument.symbol))?;

        let mut position = Position::new(instrument, invested_amount, currency);
        position
            .update_price(quote.price)
            .context("failed to apply quote price")?;

        let mut portfolio = self.portfolio.lock().await;
        portfolio
            .add_position(position.clone())
            .context("failed to add position")?;
        self.repo
            .save(&portfolio)
            .await
            .context("failed to save portfolio")?;

        Ok(position)
    }

    pub async fn remove_position(&self, position_id: &str) -> Result<()> {
        let mut portfolio = self.portfolio.lock().await;
        portfolio
            .remove_position(position_id)
            .context("failed to remove position")?;
        self.repo
            .save(&portfolio)
            .await
            .context("failed to save portfolio")?;
        Ok(())
    }

    /// In-memory lookup; does not touch the repository or the provider.
    pub async fn get_position(&self, position_id: &str) -> Result<Position> {
        let portfolio = self.portfolio.lock().await;
        let position = portfolio
            .get_position(position_id)
            .context("failed to get position")?;
        Ok(position.clone())
    }

    pub async fn list_positions(&self) -> Vec<Position> {
        self.portfolio.lock().await.positions.clone()
    }

    /// Snapshot of the whole aggregate; the caller derives totals from it.
    pub async fn portfolio_summary(&self) -> Portfolio {
        self.portfolio.lock().await.clone()
    }

    /// Re-quotes every position and persists once at the end. The first
    /// provider failure aborts the whole refresh.
    pub async fn refresh_prices(&self) -> Result<()> {
        let mut portfolio = self.portfolio.lock().await;

        for position in portfolio.positions.iter_mut() {
            let quote = self
                .market_data
                .get_quote(&position.instrument.symbol)
                .await
                .with_context(|| {
                    format!("failed to get quote for {}", position.instrument.symbol)
                })?;
            position
                .update_price(quote.price)
                .with_context(|| format!("failed to update price for {}", position.id))?;
        }

        self.repo
            .save(&portfolio)
            .await
            .context("failed to save portfolio")?;
        Ok(())
    }
}
