use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::decimal::{Decimal, DecimalError};
use super::instrument::Instrument;

/// A holding of one instrument inside a portfolio. Invariant: whenever both
/// the current price and the invested amount are non-zero,
/// `quantity = invested_amount / current_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    #[serde(skip)]
    pub portfolio_id: String,
    #[serde(skip)]
    pub instrument_isin: String,
    pub instrument: Instrument,
    pub invested_amount: Decimal,
    pub invested_currency: String,
    pub quantity: Decimal,
    pub current_price: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl Position {
    pub fn new(
        instrument: Instrument,
        invested_amount: Decimal,
        invested_currency: impl Into<String>,
    ) -> Self {
        let instrument_isin = instrument.isin.clone();
        Self {
            id: Uuid::new_v4().to_string(),
            portfolio_id: String::new(),
            instrument_isin,
            instrument,
            invested_amount,
            invested_currency: invested_currency.into(),
            quantity: Decimal::ZERO,
            current_price: Decimal::ZERO,
            last_updated: Utc::now(),
        }
    }

    /// Overwrites the current price and recomputes the quantity. The division
    /// is suppressed when either input is zero, leaving quantity unchanged.
    pub fn update_price(&mut self, price: Decimal) -> Result<(), DecimalError> {
        self.current_price = price;
        self.last_updated = Utc::now();

        if !price.is_zero() && !self.invested_amount.is_zero() {
            self.quantity = self.invested_amount.div(price)?;
        }
        Ok(())
    }

    pub fn current_value(&self) -> Result<Decimal, DecimalError> {
        if self.current_price.is_zero() {
            return Ok(Decimal::ZERO);
        }
        self.quantity.mul(self.current_price)
    }

    pub fn profit_loss(&self) -> Result<Decimal, DecimalError> {
        self.current_value()?.sub(self.invested_amount)
    }

    pub fn profit_loss_percent(&self) -> Result<Decimal, DecimalError> {
        if self.invested_amount.is_zero() {
            return Ok(Decimal::ZERO);
        }
        self.profit_loss()?
            .div(self.invested_amount)?
            .mul(Decimal::hundred())
    }

    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
            && self.instrument.is_valid()
            && !self.invested_amount.is_zero()
            && !self.invested_currency.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::InstrumentType;
    use rust_decimal_macros::dec;

    fn test_instrument() -> Instrument {
        Instrument::new(
            "US0378331005",
            "AAPL",
            "Apple Inc",
            InstrumentType::Stock,
            "USD",
            "NASDAQ",
        )
    }

    #[test]
    fn test_update_price_recomputes_quantity() {
        let mut position = Position::new(test_instrument(), Decimal::from(dec!(1000)), "USD");
        position.update_price(Decimal::from(dec!(100))).unwrap();
        assert_eq!(position.quantity, Decimal::from(dec!(10)));
        assert_eq!(position.current_price, Decimal::from(dec!(100)));
    }

    #[test]
    fn test_update_price_with_zero_price_keeps_quantity() {
        let mut position = Position::new(test_instrument(), Decimal::from(dec!(1000)), "USD");
        position.update_price(Decimal::from(dec!(100))).unwrap();
        position.update_price(Decimal::ZERO).unwrap();
        assert_eq!(position.quantity, Decimal::from(dec!(10)));
        assert!(position.current_price.is_zero());
    }

    #[test]
    fn test_quantity_times_price_recovers_invested_amount() {
        let mut position = Position::new(test_instrument(), Decimal::from(dec!(1000)), "USD");
        position.update_price(Decimal::from(dec!(150))).unwrap();

        let product = position.quantity.mul(position.current_price).unwrap();
        assert_eq!(product.round(10), Decimal::from(dec!(1000)));
    }

    #[test]
    fn test_profit_loss() {
        let mut position = Position::new(test_instrument(), Decimal::from(dec!(10000)), "USD");
        position.update_price(Decimal::from(dec!(100))).unwrap();
        assert_eq!(position.quantity, Decimal::from(dec!(100)));

        position.current_price = Decimal::from(dec!(120));
        assert_eq!(position.profit_loss().unwrap(), Decimal::from(dec!(2000)));
        assert_eq!(
            position.profit_loss_percent().unwrap(),
            Decimal::from(dec!(20))
        );
    }

    #[test]
    fn test_profit_loss_percent_with_zero_invested() {
        let mut position = Position::new(test_instrument(), Decimal::ZERO, "USD");
        position.current_price = Decimal::from(dec!(50));
        position.quantity = Decimal::from(dec!(2));
        assert!(position.profit_loss_percent().unwrap().is_zero());
    }

    #[test]
    fn test_validity() {
        let position = Position::new(test_instrument(), Decimal::from(dec!(1000)), "USD");
        assert!(position.is_valid());

        let zero_amount = Position::new(test_instrument(), Decimal::ZERO, "USD");
        assert!(!zero_amount.is_valid());

        let no_currency = Position::new(test_instrument(), Decimal::from(dec!(1000)), "");
        assert!(!no_currency.is_valid());
    }
}
