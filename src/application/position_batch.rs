//! Batch position ingestion.
//!
//! The pipeline prefers the provider's native batch endpoints when the
//! capability probe succeeds, and otherwise fans out one lookup future per
//! element, joined inside this future so that dropping the caller drops
//! every in-flight provider call with it. Failures are tracked per ISIN;
//! every input ISIN ends up in exactly one of `successful` / `failed`.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::domain::decimal::Decimal;
use crate::domain::instrument::Instrument;
use crate::domain::ports::{BatchMarketDataProvider, MarketDataError, Quote};
use crate::domain::position::Position;

use super::portfolio_service::PortfolioService;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPositionBatchRequest {
    pub isin: String,
    pub invested_amount: Decimal,
    pub currency: String,
}

/// Result of a single position request inside a batch.
#[derive(Debug, Serialize)]
pub struct PositionOutcome {
    pub isin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PositionOutcome {
    fn success(isin: String, position: Position) -> Self {
        Self {
            isin,
            position: Some(position),
            error: None,
        }
    }

    fn failure(isin: String, error: String) -> Self {
        Self {
            isin,
            position: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct BatchOutcome {
    pub successful: Vec<PositionOutcome>,
    pub failed: Vec<PositionOutcome>,
}

impl PortfolioService {
    /// Adds many positions at once. Individual failures are reported inside
    /// the result; the repository is written at most once, and a failed
    /// commit demotes every successful entry.
    pub async fn add_positions_batch(
        &self,
        requests: Vec<AddPositionBatchRequest>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if requests.is_empty() {
            return outcome;
        }

        // Deduplicate ISINs; for repeated ISINs the last request wins.
        let mut isins: Vec<String> = Vec::with_capacity(requests.len());
        let mut request_map: HashMap<String, AddPositionBatchRequest> = HashMap::new();
        for request in requests {
            if !request_map.contains_key(&request.isin) {
                isins.push(request.isin.clone());
            }
            request_map.insert(request.isin.clone(), request);
        }

        // Search stage.
        let (instruments, search_errors) = match self.market_data.batch() {
            Some(provider) => {
                info!(count = isins.len(), "Using batch provider for instrument search");
                collect_searches(provider, &isins).await
            }
            None => {
                info!(count = isins.len(), "No batch capability, searching concurrently");
                self.search_concurrent(&isins).await
            }
        };

        for (isin, err) in search_errors {
            request_map.remove(&isin);
            outcome.failed.push(PositionOutcome::failure(isin, err.to_string()));
        }

        // Quote stage, keyed back to ISINs through the symbol map.
        let mut symbols: Vec<String> = Vec::with_capacity(instruments.len());
        let mut symbol_to_isin: HashMap<String, String> = HashMap::new();
        for (isin, instrument) in &instruments {
            symbols.push(instrument.symbol.clone());
            symbol_to_isin.insert(instrument.symbol.clone(), isin.clone());
        }

        let (quotes, quote_errors) = match self.market_data.batch() {
            Some(provider) => {
                info!(count = symbols.len(), "Using batch provider for quotes");
                collect_quotes(provider, &symbols).await
            }
            None => {
                info!(count = symbols.len(), "No batch capability, quoting concurrently");
                self.quotes_concurrent(&symbols).await
            }
        };

        for (symbol, err) in quote_errors {
            if let Some(isin) = symbol_to_isin.get(&symbol) {
                request_map.remove(isin);
                outcome.failed.push(PositionOutcome::failure(
                    isin.clone(),
                    format!("failed to get quote: {err}"),
                ));
            }
        }

        // Assembly and commit run under the aggregate lock.
        let mut portfolio = self.portfolio.lock().await;

        for (isin, request) in &request_map {
            let Some(instrument) = instruments.get(isin) else {
                continue;
            };
            let Some(quote) = quotes.get(&instrument.symbol) else {
                continue;
            };

            let mut position = Position::new(
                instrument.clone(),
                request.invested_amount,
                request.currency.clone(),
            );
            if let Err(err) = position.update_price(quote.price) {
                outcome.failed.push(PositionOutcome::failure(
                    isin.clone(),
                    format!("failed to update price: {err}"),
                ));
                continue;
            }

            if let Err(err) = portfolio.add_position(position.clone()) {
                outcome.failed.push(PositionOutcome::failure(
                    isin.clone(),
                    format!("failed to add to portfolio: {err}"),
                ));
                continue;
            }

            outcome.successful.push(PositionOutcome::success(isin.clone(), position));
        }

        if !outcome.successful.is_empty() {
            if let Err(err) = self.repo.save(&portfolio).await {
                error!(error = %err, "Failed to save portfolio after batch add");
                for entry in std::mem::take(&mut outcome.successful) {
                    outcome.failed.push(PositionOutcome::failure(
                        entry.isin,
                        format!("failed to save portfolio: {err}"),
                    ));
                }
            }
        }

        outcome
    }

    /// Fallback search fan-out: one lookup future per ISIN, all polled
    /// concurrently. The futures live inside this one, so cancelling the
    /// caller aborts every in-flight lookup.
    async fn search_concurrent(
        &self,
        isins: &[String],
    ) -> (HashMap<String, Instrument>, Vec<(String, MarketDataError)>) {
        let lookups = isins.iter().map(|isin| {
            let provider = Arc::clone(&self.market_data);
            let isin = isin.clone();
            async move {
                let result = provider.search_by_isin(&isin).await;
                (isin, result)
            }
        });

        let mut instruments = HashMap::new();
        let mut errors = Vec::new();
        for (isin, result) in future::join_all(lookups).await {
            match result {
                Ok(instrument) => {
                    instruments.insert(isin, instrument);
                }
                Err(err) => errors.push((isin, err)),
            }
        }
        (instruments, errors)
    }

    /// Fallback quote fan-out, same shape as the search stage.
    async fn quotes_concurrent(
        &self,
        symbols: &[String],
    ) -> (HashMap<String, Quote>, Vec<(String, MarketDataError)>) {
        let lookups = symbols.iter().map(|symbol| {
            let provider = Arc::clone(&self.market_data);
            let symbol = symbol.clone();
            async move {
                let result = provider.get_quote(&symbol).await;
                (symbol, result)
            }
        });

        let mut quotes = HashMap::new();
        let mut errors = Vec::new();
        for (symbol, result) in future::join_all(lookups).await {
            match result {
                Ok(quote) => {
                    quotes.insert(symbol, quote);
                }
                Err(err) => errors.push((symbol, err)),
            }
        }
        (quotes, errors)
    }
}

async fn collect_searches(
    provider: &dyn BatchMarketDataProvider,
    isins: &[String],
) -> (HashMap<String, Instrument>, Vec<(String, MarketDataError)>) {
    let mut instruments = HashMap::new();
    let mut errors = Vec::new();
    for entry in provider.search_by_isin_batch(isins).await {
        match entry.result {
            Ok(instrument) => {
                instruments.insert(entry.isin, instrument);
            }
            Err(err) => errors.push((entry.isin, err)),
        }
    }
    (instruments, errors)
}

async fn collect_quotes(
    provider: &dyn BatchMarketDataProvider,
    symbols: &[String],
) -> (HashMap<String, Quote>, Vec<(String, MarketDataError)>) {
    let mut quotes = HashMap::new();
    let mut errors = Vec::new();
    for entry in provider.get_quote_batch(symbols).await {
        match entry.result {
            Ok(quote) => {
                quotes.insert(entry.symbol, quote);
            }
            Err(err) => errors.push((entry.symbol, err)),
        }
    }
    (quotes, errors)
}
