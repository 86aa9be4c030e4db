use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::decimal::{Decimal, DecimalError};
use super::errors::PortfolioError;
use super::position::Position;

/// A named collection of positions. Invariant: at most one position per ISIN;
/// adding a position for an ISIN already held merges into the existing slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub positions: Vec<Position>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Portfolio {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            positions: Vec::new(),
            last_updated: now,
            created_at: now,
        }
    }

    /// Adds a position, merging by id or ISIN: invested amount and quantity
    /// are summed and the incoming price wins. Merges keep the existing slot;
    /// genuinely new positions append at the end.
    pub fn add_position(&mut self, mut position: Position) -> Result<(), PortfolioError> {
        if !position.is_valid() {
            return Err(PortfolioError::InvalidPosition);
        }

        for existing in self.positions.iter_mut() {
            let same_isin = !existing.instrument.isin.is_empty()
                && existing.instrument.isin == position.instrument.isin;
            if existing.id == position.id || same_isin {
                existing.invested_amount = existing.invested_amount.add(position.invested_amount)?;
                existing.quantity = existing.quantity.add(position.quantity)?;
                existing.current_price = position.current_price;
                existing.last_updated = Utc::now();
                self.last_updated = existing.last_updated;
                return Ok(());
            }
        }

        position.portfolio_id = self.id.clone();
        self.positions.push(position);
        self.last_updated = Utc::now();
        Ok(())
    }

    /// Removes a position by id. The relative order of the remaining
    /// positions is preserved.
    pub fn remove_position(&mut self, id: &str) -> Result<(), PortfolioError> {
        let index = self
            .positions
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PortfolioError::PositionNotFound { id: id.to_string() })?;
        self.positions.remove(index);
        self.last_updated = Utc::now();
        Ok(())
    }

    pub fn get_position(&self, id: &str) -> Result<&Position, PortfolioError> {
        self.positions
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| PortfolioError::PositionNotFound { id: id.to_string() })
    }

    pub fn update_position_price(&mut self, id: &str, price: Decimal) -> Result<(), PortfolioError> {
        let position = self
            .positions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PortfolioError::PositionNotFound { id: id.to_string() })?;
        position.update_price(price)?;
        self.last_updated = Utc::now();
        Ok(())
    }

    pub fn total_value(&self) -> Result<Decimal, DecimalError> {
        let mut total = Decimal::ZERO;
        for position in &self.positions {
            total = total.add(position.current_value()?)?;
        }
        Ok(total)
    }

    pub fn total_invested(&self) -> Result<Decimal, DecimalError> {
        let mut total = Decimal::ZERO;
        for position in &self.positions {
            total = total.add(position.invested_amount)?;
        }
        Ok(total)
    }

    pub fn total_profit_loss(&self) -> Result<Decimal, DecimalError> {
        self.total_value()?.sub(self.total_invested()?)
    }

    pub fn total_profit_loss_percent(&self) -> Result<Decimal, DecimalError> {
        let invested = self.total_invested()?;
        if invested.is_zero() {
            return Ok(Decimal::ZERO);
        }
        self.total_profit_loss()?
            .div(invested)?
            .mul(Decimal::hundred())
    }
}
