use async_trait::async_trait;
use sqlx::{Any, AnyPool, Transaction};

use crate::domain::instrument::Instrument;
use crate::domain::portfolio::Portfolio;
use crate::domain::position::Position;
use crate::domain::repository::RepositoryError;

/// Engine-specific SQL strategy. The repository writes its queries with `$N`
/// placeholders; rewriting them into the engine's native syntax is the
/// dialect's responsibility, as is the upsert idiom.
#[async_trait]
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rewrites `$N` placeholders. The default passes the query through for
    /// engines that understand `$N` natively.
    fn rebind(&self, query: &str) -> String {
        query.to_string()
    }

    async fn migrate(&self, pool: &AnyPool) -> Result<(), RepositoryError>;

    async fn upsert_portfolio(
        &self,
        tx: &mut Transaction<'_, Any>,
        portfolio: &Portfolio,
    ) -> Result<(), RepositoryError>;

    /// Insert-if-absent by ISIN; instruments are immutable once persisted.
    async fn upsert_instrument(
        &self,
        tx: &mut Transaction<'_, Any>,
        instrument: &Instrument,
    ) -> Result<(), RepositoryError>;

    /// Upsert by position id, stamping the owning portfolio id.
    async fn upsert_position(
        &self,
        tx: &mut Transaction<'_, Any>,
        portfolio_id: &str,
        position: &Position,
    ) -> Result<(), RepositoryError>;
}
