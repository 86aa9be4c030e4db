use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::instrument::{Instrument, InstrumentType};
use crate::domain::ports::{
    BatchMarketDataProvider, IsinSearch, MarketDataError, MarketDataProvider, Quote, SymbolQuote,
};
use crate::infrastructure::core::HttpClientFactory;

const SEARCH_PATH: &str = "/api/v1/search";
const QUOTE_PATH: &str = "/api/v1/quote";
const SEARCH_BATCH_PATH: &str = "/api/v1/search/batch";
const QUOTE_BATCH_PATH: &str = "/api/v1/quote/batch";

/// Client for the self-hosted yfinance market-data microservice. The only
/// provider with native batch endpoints.
pub struct YFinanceClient {
    base_url: String,
    client: Client,
}

impl YFinanceClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: HttpClientFactory::create_client(),
        }
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    isin: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    instrument_type: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    exchange: String,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    time: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: String,
}

#[derive(Debug, Serialize)]
struct SearchBatchRequest<'a> {
    isins: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SearchBatchResponse {
    #[serde(default)]
    results: Vec<SearchResponse>,
    #[serde(default)]
    errors: Vec<SearchBatchError>,
}

#[derive(Debug, Deserialize)]
struct SearchBatchError {
    isin: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct QuoteBatchRequest<'a> {
    symbols: &'a [String],
}

#[derive(Debug, Deserialize)]
struct QuoteBatchResponse {
    #[serde(default)]
    results: Vec<QuoteResponse>,
    #[serde(default)]
    errors: Vec<QuoteBatchError>,
}

#[derive(Debug, Deserialize)]
struct QuoteBatchError {
    symbol: String,
    error: String,
}

fn map_instrument_type(api_type: &str) -> InstrumentType {
    match api_type {
        "etf" | "ETF" => InstrumentType::Etf,
        _ => InstrumentType::Stock,
    }
}

fn instrument_from_response(response: SearchResponse) -> Instrument {
    let instrument_type = map_instrument_type(&response.instrument_type);
    Instrument::new(
        response.isin,
        response.symbol,
        response.name,
        instrument_type,
        response.currency,
        response.exchange,
    )
}

/// Surfaces the microservice's `{"detail": ...}` body when present.
async fn api_error(response: reqwest::Response) -> MarketDataError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(&body) {
        if !parsed.detail.is_empty() {
            return MarketDataError::Provider(parsed.detail);
        }
    }
    match status {
        401 | 403 => MarketDataError::Unauthorized(body),
        429 => MarketDataError::RateLimited,
        _ => MarketDataError::Transport { status, body },
    }
}

#[async_trait]
impl MarketDataProvider for YFinanceClient {
    async fn search_by_isin(&self, isin: &str) -> Result<Instrument, MarketDataError> {
        let url = format!("{}{}/{}", self.base_url, SEARCH_PATH, isin);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketDataError::NotFound(format!(
                "no instrument found for ISIN {isin}"
            )));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::Decode(e.to_string()))?;

        Ok(instrument_from_response(search))
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        if symbol.is_empty() {
            return Err(MarketDataError::NotFound("empty symbol".to_string()));
        }

        let url = format!("{}{}/{}", self.base_url, QUOTE_PATH, symbol);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketDataError::NotFound(format!(
                "no quote found for symbol {symbol}"
            )));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let quote: QuoteResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::Decode(e.to_string()))?;

        if quote.price.is_empty() {
            return Err(MarketDataError::NotFound(format!(
                "no price data for symbol {symbol}"
            )));
        }

        let price = quote
            .price
            .parse()
            .map_err(|e| MarketDataError::Decode(format!("failed to parse price: {e}")))?;

        Ok(Quote {
            symbol: quote.symbol,
            price,
            currency: quote.currency,
            time: quote.time,
        })
    }

    fn batch(&self) -> Option<&dyn BatchMarketDataProvider> {
        Some(self)
    }
}

#[async_trait]
impl BatchMarketDataProvider for YFinanceClient {
    async fn search_by_isin_batch(&self, isins: &[String]) -> Vec<IsinSearch> {
        if isins.is_empty() {
            return Vec::new();
        }

        let url = format!("{}{}", self.base_url, SEARCH_BATCH_PATH);
        let response = match self
            .client
            .post(&url)
            .json(&SearchBatchRequest { isins })
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let message = format!("failed to execute batch search: {err}");
                return isins
                    .iter()
                    .map(|isin| IsinSearch {
                        isin: isin.clone(),
                        result: Err(MarketDataError::Provider(message.clone())),
                    })
                    .collect();
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return isins
                .iter()
                .map(|isin| IsinSearch {
                    isin: isin.clone(),
                    result: Err(MarketDataError::Transport {
                        status,
                        body: body.clone(),
                    }),
                })
                .collect();
        }

        let batch: SearchBatchResponse = match response.json().await {
            Ok(batch) => batch,
            Err(err) => {
                let message = err.to_string();
                return isins
                    .iter()
                    .map(|isin| IsinSearch {
                        isin: isin.clone(),
                        result: Err(MarketDataError::Decode(message.clone())),
                    })
                    .collect();
            }
        };

        let mut results = Vec::with_capacity(isins.len());
        for entry in batch.results {
            results.push(IsinSearch {
                isin: entry.isin.clone(),
                result: Ok(instrument_from_response(entry)),
            });
        }
        for entry in batch.errors {
            results.push(IsinSearch {
                isin: entry.isin,
                result: Err(MarketDataError::Provider(entry.error)),
            });
        }
        results
    }

    async fn get_quote_batch(&self, symbols: &[String]) -> Vec<SymbolQuote> {
        if symbols.is_empty() {
            return Vec::new();
        }

        let url = format!("{}{}", self.base_url, QUOTE_BATCH_PATH);
        let response = match self
            .client
            .post(&url)
            .json(&QuoteBatchRequest { symbols })
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let message = format!("failed to execute batch quote: {err}");
                return symbols
                    .iter()
                    .map(|symbol| SymbolQuote {
                        symbol: symbol.clone(),
                        result: Err(MarketDataError::Provider(message.clone())),
                    })
                    .collect();
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return symbols
                .iter()
                .map(|symbol| SymbolQuote {
                    symbol: symbol.clone(),
                    result: Err(MarketDataError::Transport {
                        status,
                        body: body.clone(),
                    }),
                })
                .collect();
        }

        let batch: QuoteBatchResponse = match response.json().await {
            Ok(batch) => batch,
            Err(err) => {
                let message = err.to_string();
                return symbols
                    .iter()
                    .map(|symbol| SymbolQuote {
                        symbol: symbol.clone(),
                        result: Err(MarketDataError::Decode(message.clone())),
                    })
                    .collect();
            }
        };

        let mut results = Vec::with_capacity(symbols.len());
        for entry in batch.results {
            match entry.price.parse() {
                Ok(price) => results.push(SymbolQuote {
                    symbol: entry.symbol.clone(),
                    result: Ok(Quote {
                        symbol: entry.symbol,
                        price,
                        currency: entry.currency,
                        time: entry.time,
                    }),
                }),
                Err(err) => results.push(SymbolQuote {
                    symbol: entry.symbol,
                    result: Err(MarketDataError::Decode(format!(
                        "failed to parse price: {err}"
                    ))),
                }),
            }
        }
        for entry in batch.errors {
            results.push(SymbolQuote {
                symbol: entry.symbol,
                result: Err(MarketDataError::Provider(entry.error)),
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_type_mapping() {
        assert_eq!(map_instrument_type("etf"), InstrumentType::Etf);
        assert_eq!(map_instrument_type("ETF"), InstrumentType::Etf);
        assert_eq!(map_instrument_type("equity"), InstrumentType::Stock);
    }

    #[test]
    fn test_batch_response_decoding() {
        let body = r#"{
            "results": [{"isin": "US0378331005", "symbol": "AAPL", "name": "Apple Inc",
                         "type": "equity", "currency": "USD", "exchange": "NMS"}],
            "errors": [{"isin": "INVALID", "error": "instrument not found"}]
        }"#;
        let decoded: SearchBatchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.results.len(), 1);
        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoded.errors[0].error, "instrument not found");
    }

    #[test]
    fn test_error_response_decoding() {
        let decoded: ErrorResponse =
            serde_json::from_str(r#"{"detail": "rate limited"}"#).unwrap();
        assert_eq!(decoded.detail, "rate limited");
    }
}
