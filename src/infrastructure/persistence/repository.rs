use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::error;

use crate::domain::decimal::Decimal;
use crate::domain::instrument::{Instrument, InstrumentType};
use crate::domain::portfolio::Portfolio;
use crate::domain::position::Position;
use crate::domain::repository::{PortfolioRepository, RepositoryError};

use super::database::Database;

/// SQL-backed portfolio repository. All SQL is written with `$N`
/// placeholders and passed through the dialect's `rebind` before execution.
pub struct SqlPortfolioRepository {
    database: Database,
}

const SELECT_PORTFOLIOS: &str = "\
SELECT \
    p.id, p.name, p.last_updated, p.created_at, \
    pos.id, pos.portfolio_id, pos.instrument_isin, pos.invested_amount, \
    pos.invested_currency, pos.quantity, pos.current_price, pos.last_updated, \
    i.isin, i.symbol, i.name, i.type, i.currency, i.exchange \
FROM portfolios p \
LEFT JOIN positions pos ON p.id = pos.portfolio_id \
LEFT JOIN instruments i ON pos.instrument_isin = i.isin";

impl SqlPortfolioRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl PortfolioRepository for SqlPortfolioRepository {
    async fn save(&self, portfolio: &Portfolio) -> Result<(), RepositoryError> {
        let dialect = &self.database.dialect;

        let mut tx = self
            .database
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Transaction(format!("begin: {e}")))?;

        if let Err(err) = dialect.upsert_portfolio(&mut tx, portfolio).await {
            error!(portfolio_id = %portfolio.id, error = %err, "Failed to save portfolio");
            return Err(err);
        }

        for position in &portfolio.positions {
            if let Err(err) = dialect.upsert_instrument(&mut tx, &position.instrument).await {
                error!(isin = %position.instrument.isin, error = %err, "Failed to save instrument");
                return Err(err);
            }
            if let Err(err) = dialect.upsert_position(&mut tx, &portfolio.id, position).await {
                error!(position_id = %position.id, error = %err, "Failed to save position");
                return Err(err);
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Transaction(format!("commit: {e}")))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Portfolio, RepositoryError> {
        let query = self
            .database
            .dialect
            .rebind(&format!("{SELECT_PORTFOLIOS} WHERE p.id = $1"));

        let rows = sqlx::query(&query)
            .bind(id)
            .fetch_all(&self.database.pool)
            .await?;

        let mut portfolio: Option<Portfolio> = None;
        for row in &rows {
            let entry = portfolio.get_or_insert(decode_portfolio(row)?);
            if let Some(position) = decode_position(row)? {
                entry.positions.push(position);
            }
        }

        portfolio.ok_or_else(|| RepositoryError::PortfolioNotFound { id: id.to_string() })
    }

    async fn find_all(&self) -> Result<Vec<Portfolio>, RepositoryError> {
        let query = self
            .database
            .dialect
            .rebind(&format!("{SELECT_PORTFOLIOS} ORDER BY p.created_at DESC"));

        let rows = sqlx::query(&query).fetch_all(&self.database.pool).await?;

        // Group join rows by portfolio, keeping the SELECT's ordering.
        let mut portfolios: Vec<Portfolio> = Vec::new();
        for row in &rows {
            let id: String = row.try_get(0)?;
            if !portfolios.iter().any(|p| p.id == id) {
                portfolios.push(decode_portfolio(row)?);
            }
            if let Some(position) = decode_position(row)? {
                if let Some(entry) = portfolios.iter_mut().find(|p| p.id == id) {
                    entry.positions.push(position);
                }
            }
        }

        Ok(portfolios)
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let dialect = &self.database.dialect;

        let mut tx = self
            .database
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Transaction(format!("begin: {e}")))?;

        sqlx::query(&dialect.rebind("DELETE FROM positions WHERE portfolio_id = $1"))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(&dialect.rebind("DELETE FROM portfolios WHERE id = $1"))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Transaction(format!("commit: {e}")))?;
        Ok(())
    }
}

fn decode_portfolio(row: &AnyRow) -> Result<Portfolio, RepositoryError> {
    Ok(Portfolio {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        last_updated: timestamp_from_millis(row.try_get(2)?),
        created_at: timestamp_from_millis(row.try_get(3)?),
        positions: Vec::new(),
    })
}

/// Decodes the position half of a join row; None for portfolios without
/// positions (LEFT JOIN padding).
fn decode_position(row: &AnyRow) -> Result<Option<Position>, RepositoryError> {
    let Some(id) = row.try_get::<Option<String>, _>(4)? else {
        return Ok(None);
    };

    let instrument = Instrument {
        isin: row.try_get::<Option<String>, _>(12)?.unwrap_or_default(),
        symbol: row.try_get::<Option<String>, _>(13)?.unwrap_or_default(),
        name: row.try_get::<Option<String>, _>(14)?.unwrap_or_default(),
        instrument_type: InstrumentType::from_db(
            &row.try_get::<Option<String>, _>(15)?.unwrap_or_default(),
        ),
        currency: row.try_get::<Option<String>, _>(16)?.unwrap_or_default(),
        exchange: row.try_get::<Option<String>, _>(17)?.unwrap_or_default(),
    };

    Ok(Some(Position {
        id,
        portfolio_id: row.try_get::<Option<String>, _>(5)?.unwrap_or_default(),
        instrument_isin: row.try_get::<Option<String>, _>(6)?.unwrap_or_default(),
        instrument,
        invested_amount: scan_decimal(row, 7)?,
        invested_currency: row.try_get::<Option<String>, _>(8)?.unwrap_or_default(),
        quantity: scan_decimal(row, 9)?,
        current_price: scan_decimal(row, 10)?,
        last_updated: timestamp_from_millis(row.try_get::<Option<i64>, _>(11)?.unwrap_or_default()),
    }))
}

/// Scans a decimal column leniently: canonical text is the storage format,
/// but integer, double and blob sources are accepted too, and SQL NULL
/// becomes zero.
fn scan_decimal(row: &AnyRow, index: usize) -> Result<Decimal, RepositoryError> {
    if let Ok(text) = row.try_get::<Option<String>, _>(index) {
        return match text {
            None => Ok(Decimal::ZERO),
            Some(text) => text.parse().map_err(|e| decode_error(index, e)),
        };
    }
    if let Ok(value) = row.try_get::<i64, _>(index) {
        return Ok(Decimal::from_i64(value));
    }
    if let Ok(value) = row.try_get::<f64, _>(index) {
        return Decimal::from_f64(value)
            .ok_or_else(|| decode_error(index, format!("non-finite double {value}")));
    }
    if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
        let text = String::from_utf8(bytes).map_err(|e| decode_error(index, e))?;
        return text.parse().map_err(|e| decode_error(index, e));
    }

    Err(decode_error(index, "unsupported decimal column type"))
}

fn decode_error(index: usize, source: impl ToString) -> RepositoryError {
    RepositoryError::Persistence(sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: source.to_string().into(),
    })
}

fn timestamp_from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}
