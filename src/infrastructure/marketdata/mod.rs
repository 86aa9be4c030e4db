//! Market-data vendor adapters.

mod finnhub;
mod twelvedata;
mod yfinance;

pub use finnhub::FinnhubClient;
pub use twelvedata::TwelveDataClient;
pub use yfinance::YFinanceClient;

use std::sync::Arc;

use crate::config::{Config, ProviderKind};
use crate::domain::ports::{MarketDataError, MarketDataProvider};

/// Builds the provider selected by configuration.
pub fn create_provider(config: &Config) -> Arc<dyn MarketDataProvider> {
    match config.market_data_provider {
        ProviderKind::Finnhub => Arc::new(FinnhubClient::new(config.finnhub_api_key.clone())),
        ProviderKind::YFinance => Arc::new(YFinanceClient::new(config.yfinance_base_url.clone())),
        ProviderKind::TwelveData => {
            Arc::new(TwelveDataClient::new(config.twelve_data_api_key.clone()))
        }
    }
}

/// Maps a non-2xx vendor response to the matching error kind.
pub(crate) async fn status_error(response: reqwest::Response) -> MarketDataError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    match status {
        401 | 403 => MarketDataError::Unauthorized(body),
        429 => MarketDataError::RateLimited,
        _ => MarketDataError::Transport { status, body },
    }
}
