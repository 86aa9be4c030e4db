use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::domain::instrument::{Instrument, InstrumentType};
use crate::domain::ports::{MarketDataError, MarketDataProvider, Quote};
use crate::infrastructure::core::HttpClientFactory;

use super::status_error;

const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";
const SEARCH_PATH: &str = "/search";
const QUOTE_PATH: &str = "/quote";
const PROFILE_PATH: &str = "/stock/profile2";

/// Finnhub REST adapter. The search endpoint carries neither currency nor
/// exchange, so instrument resolution goes through the company profile with
/// a best-effort fallback. No batch capability.
pub struct FinnhubClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl FinnhubClient {
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

    async fn get_profile(&self, symbol: &str) -> Result<ProfileResponse, MarketDataError> {
        let url = format!("{}{}", self.base_url, PROFILE_PATH);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let profile: ProfileResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::Decode(e.to_string()))?;

        // An empty body means the symbol has no profile.
        if profile.currency.is_empty() {
            return Err(MarketDataError::NotFound(format!(
                "no profile data for symbol {symbol}"
            )));
        }

        Ok(profile)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    count: usize,
    #[serde(default)]
    result: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    #[serde(default)]
    description: String,
    #[serde(default)]
    symbol: String,
    #[serde(default, rename = "type")]
    security_type: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    currency: String,
    #[serde(default)]
    exchange: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default, rename = "c")]
    current: f64,
    #[serde(default, rename = "pc")]
    previous_close: f64,
    #[serde(default, rename = "t")]
    timestamp: i64,
}

fn map_instrument_type(vendor_type: &str) -> InstrumentType {
    match vendor_type {
        "ETP" | "ETF" => InstrumentType::Etf,
        _ => InstrumentType::Stock,
    }
}

/// Extracts the exchange suffix from a Finnhub symbol: "RR.L" -> "L",
/// "AAPL" -> "".
fn extract_exchange(symbol: &str) -> &str {
    match symbol.rfind('.') {
        Some(index) => &symbol[index + 1..],
        None => "",
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubClient {
    async fn search_by_isin(&self, isin: &str) -> Result<Instrument, MarketDataError> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        let response = self
            .client
            .get(&url)
            .query(&[("q", isin), ("token", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::Decode(e.to_string()))?;

        if search.count == 0 || search.result.is_empty() {
            return Err(MarketDataError::NotFound(format!(
                "no instrument found for ISIN {isin}"
            )));
        }

        let entry = &search.result[0];
        let instrument_type = map_instrument_type(&entry.security_type);

        let (name, currency, exchange) = match self.get_profile(&entry.symbol).await {
            Ok(profile) => {
                let name = if profile.name.is_empty() {
                    entry.description.clone()
                } else {
                    profile.name
                };
                (name, profile.currency, profile.exchange)
            }
            Err(err) => {
                warn!(
                    symbol = %entry.symbol,
                    error = %err,
                    "Failed to get company profile, using fallback values"
                );
                (
                    entry.description.clone(),
                    "USD".to_string(),
                    extract_exchange(&entry.symbol).to_string(),
                )
            }
        };

        Ok(Instrument::new(
            isin,
            &entry.symbol,
            name,
            instrument_type,
            currency,
            exchange,
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
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let quote: QuoteResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::Decode(e.to_string()))?;

        // Finnhub answers all-zero fields for unknown symbols.
        if quote.current == 0.0 && quote.previous_close == 0.0 && quote.timestamp == 0 {
            return Err(MarketDataError::NotFound(format!(
                "no quote data for symbol {symbol}"
            )));
        }

        let price = format!("{:.4}", quote.current)
            .parse()
            .map_err(|e| MarketDataError::Decode(format!("failed to parse price: {e}")))?;

        let time = DateTime::<Utc>::from_timestamp(quote.timestamp, 0)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            // The quote endpoint does not carry a currency.
            currency: String::new(),
            time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_type_mapping() {
        assert_eq!(map_instrument_type("ETP"), InstrumentType::Etf);
        assert_eq!(map_instrument_type("ETF"), InstrumentType::Etf);
        assert_eq!(map_instrument_type("Common Stock"), InstrumentType::Stock);
        assert_eq!(map_instrument_type("Equity"), InstrumentType::Stock);
        assert_eq!(map_instrument_type("anything"), InstrumentType::Stock);
    }

    #[test]
    fn test_extract_exchange() {
        assert_eq!(extract_exchange("RR.L"), "L");
        assert_eq!(extract_exchange("SAP.DE"), "DE");
        assert_eq!(extract_exchange("AAPL"), "");
    }

    #[test]
    fn test_quote_response_decoding() {
        let body = r#"{"c": 261.74, "d": 1.5, "dp": 0.58, "h": 263.31, "l": 260.68, "o": 261.07, "pc": 260.24, "t": 1582641000}"#;
        let decoded: QuoteResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.current, 261.74);
        assert_eq!(decoded.timestamp, 1582641000);
    }

    #[test]
    fn test_empty_quote_means_unknown_symbol() {
        let body = r#"{"c": 0, "d": null, "dp": null, "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0}"#;
        let decoded: QuoteResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.current, 0.0);
        assert_eq!(decoded.previous_close, 0.0);
        assert_eq!(decoded.timestamp, 0);
    }
}
