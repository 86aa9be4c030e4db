use serde::{Deserialize, Serialize};

/// Security class of an instrument. Provider-native type strings outside
/// this set collapse to `Stock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    Stock,
    Etf,
}

impl InstrumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentType::Stock => "stock",
            InstrumentType::Etf => "etf",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "etf" => InstrumentType::Etf,
            _ => InstrumentType::Stock,
        }
    }
}

/// A tradable security, identified by its ISIN. Instruments are immutable
/// once persisted; later observations of the same ISIN do not overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub isin: String,
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub instrument_type: InstrumentType,
    pub currency: String,
    pub exchange: String,
}

impl Instrument {
    pub fn new(
        isin: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
        instrument_type: InstrumentType,
        currency: impl Into<String>,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            isin: isin.into(),
            symbol: symbol.into(),
            name: name.into(),
            instrument_type,
            currency: currency.into(),
            exchange: exchange.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.isin.is_empty() && !self.symbol.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_requires_isin_and_symbol() {
        let instrument = Instrument::new(
            "US0378331005",
            "AAPL",
            "Apple Inc",
            InstrumentType::Stock,
            "USD",
            "NASDAQ",
        );
        assert!(instrument.is_valid());

        let mut missing_symbol = instrument.clone();
        missing_symbol.symbol.clear();
        assert!(!missing_symbol.is_valid());

        let mut missing_isin = instrument;
        missing_isin.isin.clear();
        assert!(!missing_isin.is_valid());
    }

    #[test]
    fn test_type_round_trips_through_db_string() {
        assert_eq!(InstrumentType::from_db(InstrumentType::Etf.as_str()), InstrumentType::Etf);
        assert_eq!(InstrumentType::from_db("common stock"), InstrumentType::Stock);
    }

    #[test]
    fn test_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&InstrumentType::Etf).unwrap(), "\"etf\"");
    }
}
