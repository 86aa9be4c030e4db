//! Environment-driven configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const DEFAULT_YFINANCE_BASE_URL: &str = "http://localhost:8000";

/// Market-data adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    TwelveData,
    Finnhub,
    YFinance,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twelvedata" => Ok(ProviderKind::TwelveData),
            "finnhub" => Ok(ProviderKind::Finnhub),
            "yfinance" => Ok(ProviderKind::YFinance),
            _ => bail!(
                "Invalid MARKET_DATA_PROVIDER: {}. Must be 'twelvedata', 'finnhub', or 'yfinance'",
                s
            ),
        }
    }
}

/// Database driver / dialect selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDriver {
    Postgres,
    MySql,
}

impl FromStr for DbDriver {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(DbDriver::Postgres),
            "mysql" => Ok(DbDriver::MySql),
            _ => bail!("Invalid DB_DRIVER: {}. Must be 'postgres' or 'mysql'", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub market_data_provider: ProviderKind,
    pub twelve_data_api_key: String,
    pub finnhub_api_key: String,
    pub yfinance_base_url: String,
    pub db_driver: DbDriver,
    pub db_dsn: String,
    pub server_host: String,
    pub server_port: u16,
    pub price_refresh_interval: Duration,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let market_data_provider: ProviderKind =
            env_or_default("MARKET_DATA_PROVIDER", "twelvedata").parse()?;

        let twelve_data_api_key = env::var("TWELVE_DATA_API_KEY").unwrap_or_default();
        let finnhub_api_key = env::var("FINNHUB_API_KEY").unwrap_or_default();
        let yfinance_base_url = env_or_default("YFINANCE_BASE_URL", DEFAULT_YFINANCE_BASE_URL);

        // The selected provider's credential is mandatory; yfinance is a
        // self-hosted service and needs none.
        match market_data_provider {
            ProviderKind::TwelveData if twelve_data_api_key.is_empty() => {
                bail!("TWELVE_DATA_API_KEY is required when using the twelvedata provider")
            }
            ProviderKind::Finnhub if finnhub_api_key.is_empty() => {
                bail!("FINNHUB_API_KEY is required when using the finnhub provider")
            }
            _ => {}
        }

        let db_driver: DbDriver = env_or_default("DB_DRIVER", "postgres").parse()?;
        let db_dsn = env::var("DB_DSN").ok().filter(|v| !v.is_empty());
        let Some(db_dsn) = db_dsn else {
            bail!("DB_DSN environment variable is required");
        };

        let server_host = env_or_default("SERVER_HOST", "localhost");
        let server_port = env_or_default("SERVER_PORT", "8080")
            .parse()
            .context("invalid SERVER_PORT")?;

        let price_refresh_interval = parse_duration(&env_or_default("PRICE_REFRESH_INTERVAL", "60s"))
            .context("invalid PRICE_REFRESH_INTERVAL")?;

        let log_level = env_or_default("LOG_LEVEL", "info");

        Ok(Self {
            market_data_provider,
            twelve_data_api_key,
            finnhub_api_key,
            yfinance_base_url,
            db_driver,
            db_dsn,
            server_host,
            server_port,
            price_refresh_interval,
            log_level,
        })
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parses Go-style duration strings: an integer followed by one of
/// `ms`/`s`/`m`/`h`, with concatenation ("1h30m", "90s", "250ms").
pub fn parse_duration(input: &str) -> Result<Duration> {
    if input.is_empty() {
        bail!("empty duration");
    }

    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .with_context(|| format!("missing unit in duration {input:?}"))?;
        if digits_end == 0 {
            bail!("invalid duration {:?}", input);
        }

        let value: u64 = rest[..digits_end]
            .parse()
            .with_context(|| format!("invalid duration {input:?}"))?;
        rest = &rest[digits_end..];

        let (unit_duration, unit_len) = if rest.starts_with("ms") {
            (Duration::from_millis(value), 2)
        } else if rest.starts_with('s') {
            (Duration::from_secs(value), 1)
        } else if rest.starts_with('m') {
            (Duration::from_secs(value * 60), 1)
        } else if rest.starts_with('h') {
            (Duration::from_secs(value * 3600), 1)
        } else {
            bail!("unknown unit in duration {:?}", input);
        };

        rest = &rest[unit_len..];
        total += unit_duration;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("60s").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_parse_duration_rejects_malformed_input() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("60").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("60x").is_err());
        assert!(parse_duration("sixty seconds").is_err());
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("twelvedata".parse::<ProviderKind>().unwrap(), ProviderKind::TwelveData);
        assert_eq!("FINNHUB".parse::<ProviderKind>().unwrap(), ProviderKind::Finnhub);
        assert_eq!("yfinance".parse::<ProviderKind>().unwrap(), ProviderKind::YFinance);
        assert!("bloomberg".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_db_driver_from_str() {
        assert_eq!("postgres".parse::<DbDriver>().unwrap(), DbDriver::Postgres);
        assert_eq!("MySQL".parse::<DbDriver>().unwrap(), DbDriver::MySql);
        assert!("oracle".parse::<DbDriver>().is_err());
    }
}
