//! Scriptable market-data providers for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::decimal::Decimal;
use crate::domain::instrument::Instrument;
use crate::domain::ports::{
    BatchMarketDataProvider, IsinSearch, MarketDataError, MarketDataProvider, Quote, SymbolQuote,
};

/// Single-item mock provider backed by in-memory maps. Unknown ISINs and
/// symbols answer `NotFound`.
#[derive(Default)]
pub struct MockMarketDataProvider {
    instruments: RwLock<HashMap<String, Instrument>>,
    quotes: RwLock<HashMap<String, Quote>>,
    quote_calls: AtomicUsize,
}

impl MockMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_instrument(&self, instrument: Instrument) {
        self.instruments
            .write()
            .await
            .insert(instrument.isin.clone(), instrument);
    }

    pub async fn set_quote(&self, symbol: &str, price: Decimal, currency: &str) {
        self.quotes.write().await.insert(
            symbol.to_string(),
            Quote {
                symbol: symbol.to_string(),
                price,
                currency: currency.to_string(),
                time: Utc::now().to_rfc3339(),
            },
        );
    }

    pub async fn remove_quote(&self, symbol: &str) {
        self.quotes.write().await.remove(symbol);
    }

    /// Number of single-quote lookups served so far.
    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    async fn lookup_instrument(&self, isin: &str) -> Result<Instrument, MarketDataError> {
        self.instruments
            .read()
            .await
            .get(isin)
            .cloned()
            .ok_or_else(|| {
                MarketDataError::NotFound(format!("no instrument found for ISIN {isin}"))
            })
    }

    async fn lookup_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.quotes
            .read()
            .await
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketDataError::NotFound(format!("no quote data for symbol {symbol}")))
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    async fn search_by_isin(&self, isin: &str) -> Result<Instrument, MarketDataError> {
        self.lookup_instrument(isin).await
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        self.lookup_quote(symbol).await
    }
}

/// Batch-capable mock provider; per-item misses become per-item errors.
#[derive(Default)]
pub struct MockBatchMarketDataProvider {
    inner: MockMarketDataProvider,
}

impl MockBatchMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_instrument(&self, instrument: Instrument) {
        self.inner.set_instrument(instrument).await;
    }

    pub async fn set_quote(&self, symbol: &str, price: Decimal, currency: &str) {
        self.inner.set_quote(symbol, price, currency).await;
    }
}

#[async_trait]
impl MarketDataProvider for MockBatchMarketDataProvider {
    async fn search_by_isin(&self, isin: &str) -> Result<Instrument, MarketDataError> {
        self.inner.search_by_isin(isin).await
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        self.inner.get_quote(symbol).await
    }

    fn batch(&self) -> Option<&dyn BatchMarketDataProvider> {
        Some(self)
    }
}

#[async_trait]
impl BatchMarketDataProvider for MockBatchMarketDataProvider {
    async fn search_by_isin_batch(&self, isins: &[String]) -> Vec<IsinSearch> {
        let mut results = Vec::with_capacity(isins.len());
        for isin in isins {
            results.push(IsinSearch {
                isin: isin.clone(),
                result: self.inner.lookup_instrument(isin).await,
            });
        }
        results
    }

    async fn get_quote_batch(&self, symbols: &[String]) -> Vec<SymbolQuote> {
        let mut results = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            results.push(SymbolQuote {
                symbol: symbol.clone(),
                result: self.inner.lookup_quote(symbol).await,
            });
        }
        results
    }
}
