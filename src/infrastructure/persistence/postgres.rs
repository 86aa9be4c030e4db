use async_trait::async_trait;
use sqlx::{Any, AnyPool, Transaction};

use crate::domain::instrument::Instrument;
use crate::domain::portfolio::Portfolio;
use crate::domain::position::Position;
use crate::domain::repository::RepositoryError;

use super::dialect::Dialect;

/// Dialect for engines with native `INSERT ... ON CONFLICT` upserts and `$N`
/// placeholders. Decimals are stored as canonical strings, timestamps as
/// epoch milliseconds.
pub struct PostgresDialect;

const MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS portfolios (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    last_updated BIGINT NOT NULL,
    created_at BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS instruments (
    isin TEXT PRIMARY KEY,
    symbol TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    currency TEXT NOT NULL,
    exchange TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS positions (
    id TEXT PRIMARY KEY,
    portfolio_id TEXT NOT NULL REFERENCES portfolios(id) ON DELETE CASCADE,
    instrument_isin TEXT NOT NULL REFERENCES instruments(isin) ON DELETE RESTRICT,
    invested_amount TEXT NOT NULL,
    invested_currency TEXT NOT NULL,
    quantity TEXT NOT NULL,
    current_price TEXT NOT NULL,
    last_updated BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_positions_portfolio ON positions (portfolio_id)
"#;

#[async_trait]
impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn migrate(&self, pool: &AnyPool) -> Result<(), RepositoryError> {
        for statement in MIGRATION.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement)
                .execute(pool)
                .await
                .map_err(|e| RepositoryError::Migration(e.to_string()))?;
        }
        Ok(())
    }

    async fn upsert_portfolio(
        &self,
        tx: &mut Transaction<'_, Any>,
        portfolio: &Portfolio,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO portfolios (id, name, last_updated, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&portfolio.id)
        .bind(&portfolio.name)
        .bind(portfolio.last_updated.timestamp_millis())
        .bind(portfolio.created_at.timestamp_millis())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn upsert_instrument(
        &self,
        tx: &mut Transaction<'_, Any>,
        instrument: &Instrument,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO instruments (isin, symbol, name, type, currency, exchange)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (isin) DO NOTHING
            "#,
        )
        .bind(&instrument.isin)
        .bind(&instrument.symbol)
        .bind(&instrument.name)
        .bind(instrument.instrument_type.as_str())
        .bind(&instrument.currency)
        .bind(&instrument.exchange)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn upsert_position(
        &self,
        tx: &mut Transaction<'_, Any>,
        portfolio_id: &str,
        position: &Position,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO positions
                (id, portfolio_id, instrument_isin, invested_amount, invested_currency,
                 quantity, current_price, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                invested_amount = EXCLUDED.invested_amount,
                quantity = EXCLUDED.quantity,
                current_price = EXCLUDED.current_price,
                last_updated = EXCLUDED.last_updated,
                portfolio_id = EXCLUDED.portfolio_id
            "#,
        )
        .bind(&position.id)
        .bind(portfolio_id)
        .bind(&position.instrument.isin)
        .bind(position.invested_amount.to_string())
        .bind(&position.invested_currency)
        .bind(position.quantity.to_string())
        .bind(position.current_price.to_string())
        .bind(position.last_updated.timestamp_millis())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
