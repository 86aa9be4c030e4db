use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use rustfolio::application::{AddPositionBatchRequest, PortfolioService};
use rustfolio::domain::decimal::Decimal;
use rustfolio::domain::instrument::{Instrument, InstrumentType};
use rustfolio::domain::portfolio::Portfolio;
use rustfolio::domain::repository::{PortfolioRepository, RepositoryError};
use rustfolio::infrastructure::mock::{MockBatchMarketDataProvider, MockMarketDataProvider};
use rustfolio::infrastructure::persistence::InMemoryPortfolioRepository;

fn request(isin: &str, invested: rust_decimal::Decimal) -> AddPositionBatchRequest {
    AddPositionBatchRequest {
        isin: isin.to_string(),
        invested_amount: Decimal::from(invested),
        currency: "USD".to_string(),
    }
}

fn instrument(isin: &str, symbol: &str) -> Instrument {
    Instrument::new(isin, symbol, "Test Corp", InstrumentType::Stock, "USD", "NASDAQ")
}

/// Repository that can be switched into a failing mode after the service has
/// bootstrapped its default portfolio.
struct FlakySaveRepository {
    inner: InMemoryPortfolioRepository,
    fail_saves: AtomicBool,
}

impl FlakySaveRepository {
    fn new() -> Self {
        Self {
            inner: InMemoryPortfolioRepository::new(),
            fail_saves: AtomicBool::new(false),
        }
    }

    fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PortfolioRepository for FlakySaveRepository {
    async fn save(&self, portfolio: &Portfolio) -> Result<(), RepositoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Transaction("injected save failure".to_string()));
        }
        self.inner.save(portfolio).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Portfolio, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<Portfolio>, RepositoryError> {
        self.inner.find_all().await
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    let provider = Arc::new(MockBatchMarketDataProvider::new());
    let repo = Arc::new(InMemoryPortfolioRepository::new());
    let service = PortfolioService::new(repo, provider).await.unwrap();

    let outcome = service.add_positions_batch(Vec::new()).await;
    assert!(outcome.successful.is_empty());
    assert!(outcome.failed.is_empty());
    assert!(service.list_positions().await.is_empty());
}

#[tokio::test]
async fn test_batch_partial_failure() {
    let provider = MockBatchMarketDataProvider::new();
    provider
        .set_instrument(instrument("US0378331005", "AAPL"))
        .await;
    provider
        .set_quote("AAPL", Decimal::from(dec!(150)), "USD")
        .await;
    let repo = Arc::new(InMemoryPortfolioRepository::new());
    let service = PortfolioService::new(repo, Arc::new(provider)).await.unwrap();

    let outcome = service
        .add_positions_batch(vec![
            request("US0378331005", dec!(1000)),
            request("INVALID", dec!(2000)),
        ])
        .await;

    assert_eq!(outcome.successful.len(), 1);
    assert_eq!(outcome.successful[0].isin, "US0378331005");
    assert!(outcome.successful[0].position.is_some());

    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].isin, "INVALID");
    assert!(outcome.failed[0]
        .error
        .as_deref()
        .unwrap()
        .contains("no instrument found"));

    let positions = service.list_positions().await;
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].instrument.isin, "US0378331005");
}

#[tokio::test]
async fn test_batch_commit_failure_demotes_every_success() {
    let provider = MockBatchMarketDataProvider::new();
    provider
        .set_instrument(instrument("US0378331005", "AAPL"))
        .await;
    provider
        .set_quote("AAPL", Decimal::from(dec!(150)), "USD")
        .await;

    let repo = Arc::new(FlakySaveRepository::new());
    let service = PortfolioService::new(
        Arc::clone(&repo) as Arc<dyn PortfolioRepository>,
        Arc::new(provider),
    )
    .await
    .unwrap();
    repo.fail_saves();

    let outcome = service
        .add_positions_batch(vec![request("US0378331005", dec!(1000))])
        .await;

    assert!(outcome.successful.is_empty());
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].isin, "US0378331005");
    assert!(outcome.failed[0]
        .error
        .as_deref()
        .unwrap()
        .contains("injected save failure"));
}

#[tokio::test]
async fn test_batch_falls_back_to_concurrent_lookups() {
    // Plain provider without the batch capability.
    let provider = MockMarketDataProvider::new();
    provider.set_instrument(instrument("US1", "AAA")).await;
    provider.set_instrument(instrument("US2", "BBB")).await;
    provider.set_instrument(instrument("US3", "CCC")).await;
    provider.set_quote("AAA", Decimal::from(dec!(10)), "USD").await;
    provider.set_quote("BBB", Decimal::from(dec!(20)), "USD").await;
    // CCC has no quote: its ISIN must fail in the quote stage.

    let repo = Arc::new(InMemoryPortfolioRepository::new());
    let service = PortfolioService::new(repo, Arc::new(provider)).await.unwrap();

    let outcome = service
        .add_positions_batch(vec![
            request("US1", dec!(100)),
            request("US2", dec!(200)),
            request("US3", dec!(300)),
            request("US4", dec!(400)),
        ])
        .await;

    let successful: HashSet<_> = outcome.successful.iter().map(|o| o.isin.clone()).collect();
    let failed: HashSet<_> = outcome.failed.iter().map(|o| o.isin.clone()).collect();

    assert_eq!(successful, HashSet::from(["US1".to_string(), "US2".to_string()]));
    assert_eq!(failed, HashSet::from(["US3".to_string(), "US4".to_string()]));

    let quote_failure = outcome.failed.iter().find(|o| o.isin == "US3").unwrap();
    assert!(quote_failure
        .error
        .as_deref()
        .unwrap()
        .contains("failed to get quote"));
}

#[tokio::test]
async fn test_every_isin_lands_in_exactly_one_bucket() {
    let provider = MockMarketDataProvider::new();
    provider.set_instrument(instrument("US1", "AAA")).await;
    provider.set_quote("AAA", Decimal::from(dec!(10)), "USD").await;

    let repo = Arc::new(InMemoryPortfolioRepository::new());
    let service = PortfolioService::new(repo, Arc::new(provider)).await.unwrap();

    let input = vec![
        request("US1", dec!(100)),
        request("US2", dec!(200)),
        request("US3", dec!(300)),
    ];
    let expected: HashSet<_> = input.iter().map(|r| r.isin.clone()).collect();

    let outcome = service.add_positions_batch(input).await;

    let successful: HashSet<_> = outcome.successful.iter().map(|o| o.isin.clone()).collect();
    let failed: HashSet<_> = outcome.failed.iter().map(|o| o.isin.clone()).collect();

    assert!(successful.is_disjoint(&failed));
    let union: HashSet<_> = successful.union(&failed).cloned().collect();
    assert_eq!(union, expected);
}

#[tokio::test]
async fn test_duplicate_isins_keep_the_last_request() {
    let provider = MockBatchMarketDataProvider::new();
    provider.set_instrument(instrument("US1", "AAA")).await;
    provider.set_quote("AAA", Decimal::from(dec!(10)), "USD").await;

    let repo = Arc::new(InMemoryPortfolioRepository::new());
    let service = PortfolioService::new(repo, Arc::new(provider)).await.unwrap();

    let outcome = service
        .add_positions_batch(vec![request("US1", dec!(100)), request("US1", dec!(250))])
        .await;

    assert_eq!(outcome.successful.len(), 1);
    assert!(outcome.failed.is_empty());

    let positions = service.list_positions().await;
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].invested_amount, Decimal::from(dec!(250)));
}

#[tokio::test]
async fn test_batch_merges_into_existing_position() {
    let provider = MockBatchMarketDataProvider::new();
    provider.set_instrument(instrument("US1", "AAA")).await;
    provider.set_quote("AAA", Decimal::from(dec!(10)), "USD").await;

    let repo = Arc::new(InMemoryPortfolioRepository::new());
    let service = PortfolioService::new(repo, Arc::new(provider)).await.unwrap();

    service
        .add_position("US1", Decimal::from(dec!(100)), "USD")
        .await
        .unwrap();
    let outcome = service
        .add_positions_batch(vec![request("US1", dec!(50))])
        .await;

    assert_eq!(outcome.successful.len(), 1);
    let positions = service.list_positions().await;
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].invested_amount, Decimal::from(dec!(150)));
    assert_eq!(positions[0].quantity, Decimal::from(dec!(15)));
}
