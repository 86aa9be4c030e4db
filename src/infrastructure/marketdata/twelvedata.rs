use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::instrument::{Instrument, InstrumentType};
use crate::domain::ports::{MarketDataError, MarketDataProvider, Quote};
use crate::infrastructure::core::HttpClientFactory;

use super::status_error;

const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";
const SYMBOL_SEARCH_PATH: &str = "/symbol_search";
const QUOTE_PATH: &str = "/quote";

/// TwelveData REST adapter. Single-item capability only.
pub struct TwelveDataClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl TwelveDataClient {
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            client: HttpClientFactory::create_client(),
        }
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }
}

#[derive(Debug, Deserialize)]
struct SymbolSearchResponse {
    #[serde(default)]
    data: Vec<SymbolSearchEntry>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct SymbolSearchEntry {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    instrument_name: String,
    #[serde(default)]
    exchange: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    instrument_type: String,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    datetime: String,
    #[serde(default)]
    close: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

fn map_instrument_type(vendor_type: &str) -> InstrumentType {
    match vendor_type {
        "ETF" => InstrumentType::Etf,
        _ => InstrumentType::Stock,
    }
}

#[async_trait]
impl MarketDataProvider for TwelveDataClient {
    async fn search_by_isin(&self, isin: &str) -> Result<Instrument, MarketDataError> {
        let url = format!("{}{}", self.base_url, SYMBOL_SEARCH_PATH);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", isin), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let search: SymbolSearchResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::Decode(e.to_string()))?;

        if search.status != "ok" || search.data.is_empty() {
            return Err(MarketDataError::NotFound(format!(
                "no instrument found for ISIN {isin}"
            )));
        }

        let entry = &search.data[0];
        Ok(Instrument::new(
            isin,
            &entry.symbol,
            &entry.instrument_name,
            map_instrument_type(&entry.instrument_type),
            &entry.currency,
            &entry.exchange,
        ))
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        if symbol.is_empty() {
            return Err(MarketDataError::NotFound("empty symbol".to_string()));
        }

        let url = format!("{}{}", self.base_url, QUOTE_PATH);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let quote: QuoteResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::Decode(e.to_string()))?;

        if quote.status == "error" {
            return Err(MarketDataError::Provider(format!(
                "quote request failed for {symbol}: {}",
                quote.message
            )));
        }

        if quote.close.is_empty() {
            return Err(MarketDataError::NotFound(format!(
                "no price data for symbol {symbol}"
            )));
        }

        let price = quote
            .close
            .parse()
            .map_err(|e| MarketDataError::Decode(format!("failed to parse price: {e}")))?;

        Ok(Quote {
            symbol: quote.symbol,
            price,
            currency: quote.currency,
            time: quote.datetime,
        })
    }
}
