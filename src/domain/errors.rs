use thiserror::Error;

use super::decimal::DecimalError;

/// Errors raised by the portfolio aggregate.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("invalid position")]
    InvalidPosition,

    #[error("position not found: {id}")]
    PositionNotFound { id: String },

    #[error("decimal arithmetic failed: {0}")]
    Decimal(#[from] DecimalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting() {
        let err = PortfolioError::PositionNotFound {
            id: "abc-123".to_string(),
        };
        assert!(err.to_string().contains("abc-123"));
    }
}
