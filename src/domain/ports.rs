//! Outbound ports of the domain: the market-data contract.
//!
//! Every provider implements the base single-item capability. Providers whose
//! vendor API exposes native batch endpoints additionally implement
//! [`BatchMarketDataProvider`] and advertise it through [`MarketDataProvider::batch`],
//! which callers probe at use time.

use async_trait::async_trait;
use thiserror::Error;

use super::decimal::Decimal;
use super::instrument::Instrument;

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("provider returned status {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limit exceeded")]
    RateLimited,
}

/// A timestamped price for a symbol. `time` is whatever the vendor sent
/// (RFC-3339, a bare date, an epoch rendering) and is passed through opaque.
#[derive(Debug, Clone)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub currency: String,
    pub time: String,
}

/// One entry of a batch instrument search; order is not guaranteed.
#[derive(Debug)]
pub struct IsinSearch {
    pub isin: String,
    pub result: Result<Instrument, MarketDataError>,
}

/// One entry of a batch quote lookup; order is not guaranteed.
#[derive(Debug)]
pub struct SymbolQuote {
    pub symbol: String,
    pub result: Result<Quote, MarketDataError>,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn search_by_isin(&self, isin: &str) -> Result<Instrument, MarketDataError>;

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Batch capability probe. The default keeps single-item providers
    /// minimal; batch-capable implementations return themselves.
    fn batch(&self) -> Option<&dyn BatchMarketDataProvider> {
        None
    }
}

#[async_trait]
pub trait BatchMarketDataProvider: MarketDataProvider {
    /// Resolves many ISINs in one vendor call. Returns one entry per input
    /// ISIN, each carrying its own result.
    async fn search_by_isin_batch(&self, isins: &[String]) -> Vec<IsinSearch>;

    /// Fetches quotes for many symbols in one vendor call. Returns one entry
    /// per input symbol, each carrying its own result.
    async fn get_quote_batch(&self, symbols: &[String]) -> Vec<SymbolQuote>;
}
