use async_trait::async_trait;
use sqlx::{Any, AnyPool, Transaction};

use crate::domain::instrument::Instrument;
use crate::domain::portfolio::Portfolio;
use crate::domain::position::Position;
use crate::domain::repository::RepositoryError;

use super::dialect::Dialect;

/// Dialect for MySQL, which lacks `INSERT ... ON CONFLICT`: upserts are a
/// check-then-insert-or-update inside the surrounding transaction, and `$N`
/// placeholders are rewritten to `?`.
pub struct MySqlDialect;

const MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS portfolios (
    id VARCHAR(36) PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    last_updated BIGINT NOT NULL,
    created_at BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS instruments (
    isin VARCHAR(12) PRIMARY KEY,
    symbol VARCHAR(64) NOT NULL,
    name VARCHAR(255) NOT NULL,
    type VARCHAR(16) NOT NULL,
    currency VARCHAR(8) NOT NULL,
    exchange VARCHAR(64) NOT NULL
);

CREATE TABLE IF NOT EXISTS positions (
    id VARCHAR(36) PRIMARY KEY,
    portfolio_id VARCHAR(36) NOT NULL,
    instrument_isin VARCHAR(12) NOT NULL,
    invested_amount VARCHAR(64) NOT NULL,
    invested_currency VARCHAR(8) NOT NULL,
    quantity VARCHAR(64) NOT NULL,
    current_price VARCHAR(64) NOT NULL,
    last_updated BIGINT NOT NULL,
    CONSTRAINT fk_positions_portfolio FOREIGN KEY (portfolio_id)
        REFERENCES portfolios(id) ON DELETE CASCADE,
    CONSTRAINT fk_positions_instrument FOREIGN KEY (instrument_isin)
        REFERENCES instruments(isin) ON DELETE RESTRICT
);

CREATE INDEX idx_positions_portfolio ON positions (portfolio_id)
"#;

/// MySQL has no `CREATE INDEX IF NOT EXISTS`; duplicate-object errors from
/// re-running the migration are swallowed.
fn is_duplicate_object_error(err: &sqlx::Error) -> bool {
    let message = err.to_string();
    message.contains("Duplicate key name") || message.contains("already exists")
}

#[async_trait]
impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn rebind(&self, query: &str) -> String {
        let mut rebound = query.to_string();
        // Descending so that $10 is not clobbered by the $1 pass.
        for i in (1..=16).rev() {
            rebound = rebound.replace(&format!("${i}"), "?");
        }
        rebound
    }

    async fn migrate(&self, pool: &AnyPool) -> Result<(), RepositoryError> {
        for statement in MIGRATION.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            if let Err(err) = sqlx::query(statement).execute(pool).await {
                if !is_duplicate_object_error(&err) {
                    return Err(RepositoryError::Migration(err.to_string()));
                }
            }
        }
        Ok(())
    }

    async fn upsert_portfolio(
        &self,
        tx: &mut Transaction<'_, Any>,
        portfolio: &Portfolio,
    ) -> Result<(), RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM portfolios WHERE id = ?")
            .bind(&portfolio.id)
            .fetch_one(&mut **tx)
            .await?;

        if count > 0 {
            sqlx::query("UPDATE portfolios SET name = ?, last_updated = ? WHERE id = ?")
                .bind(&portfolio.name)
                .bind(portfolio.last_updated.timestamp_millis())
                .bind(&portfolio.id)
                .execute(&mut **tx)
                .await?;
        } else {
            sqlx::query(
                "INSERT INTO portfolios (id, name, last_updated, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&portfolio.id)
            .bind(&portfolio.name)
            .bind(portfolio.last_updated.timestamp_millis())
            .bind(portfolio.created_at.timestamp_millis())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn upsert_instrument(
        &self,
        tx: &mut Transaction<'_, Any>,
        instrument: &Instrument,
    ) -> Result<(), RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM instruments WHERE isin = ?")
            .bind(&instrument.isin)
            .fetch_one(&mut **tx)
            .await?;

        // Instruments are immutable by ISIN: insert only when absent.
        if count == 0 {
            sqlx::query(
                "INSERT INTO instruments (isin, symbol, name, type, currency, exchange) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&instrument.isin)
            .bind(&instrument.symbol)
            .bind(&instrument.name)
            .bind(instrument.instrument_type.as_str())
            .bind(&instrument.currency)
            .bind(&instrument.exchange)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn upsert_position(
        &self,
        tx: &mut Transaction<'_, Any>,
        portfolio_id: &str,
        position: &Position,
    ) -> Result<(), RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM positions WHERE id = ?")
            .bind(&position.id)
            .fetch_one(&mut **tx)
            .await?;

        if count > 0 {
            sqlx::query(
                "UPDATE positions SET \
                     invested_amount = ?, quantity = ?, current_price = ?, \
                     last_updated = ?, portfolio_id = ? \
                 WHERE id = ?",
            )
            .bind(position.invested_amount.to_string())
            .bind(position.quantity.to_string())
            .bind(position.current_price.to_string())
            .bind(position.last_updated.timestamp_millis())
            .bind(portfolio_id)
            .bind(&position.id)
            .execute(&mut **tx)
            .await?;
        } else {
            sqlx::query(
                "INSERT INTO positions \
                     (id, portfolio_id, instrument_isin, invested_amount, invested_currency, \
                      quantity, current_price, last_updated) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
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
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebind_rewrites_placeholders() {
        let dialect = MySqlDialect;
        assert_eq!(
            dialect.rebind("SELECT * FROM positions WHERE id = $1 AND portfolio_id = $2"),
            "SELECT * FROM positions WHERE id = ? AND portfolio_id = ?"
        );
    }

    #[test]
    fn test_rebind_handles_two_digit_placeholders() {
        let dialect = MySqlDialect;
        assert_eq!(dialect.rebind("VALUES ($1, $10, $11)"), "VALUES (?, ?, ?)");
    }

    #[test]
    fn test_rebind_leaves_plain_sql_alone() {
        let dialect = MySqlDialect;
        let query = "SELECT COUNT(*) FROM portfolios";
        assert_eq!(dialect.rebind(query), query);
    }
}
