use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use rustfolio::application::{PortfolioService, PriceUpdater};
use rustfolio::domain::decimal::Decimal;
use rustfolio::domain::instrument::{Instrument, InstrumentType};
use rustfolio::domain::ports::MarketDataProvider;
use rustfolio::infrastructure::mock::MockMarketDataProvider;
use rustfolio::infrastructure::persistence::InMemoryPortfolioRepository;

async fn service_with_one_position() -> (Arc<PortfolioService>, Arc<MockMarketDataProvider>) {
    let provider = Arc::new(MockMarketDataProvider::new());
    provider
        .set_instrument(Instrument::new(
            "US0000000001",
            "TESTSYM",
            "Test Corp",
            InstrumentType::Stock,
            "USD",
            "NASDAQ",
        ))
        .await;
    provider
        .set_quote("TESTSYM", Decimal::from(dec!(100)), "USD")
        .await;

    let repo = Arc::new(InMemoryPortfolioRepository::new());
    let service = Arc::new(
        PortfolioService::new(repo, Arc::clone(&provider) as Arc<dyn MarketDataProvider>)
            .await
            .unwrap(),
    );
    service
        .add_position("US0000000001", Decimal::from(dec!(1000)), "USD")
        .await
        .unwrap();

    (service, provider)
}

#[tokio::test]
async fn test_stop_wakes_a_pending_tick() {
    let (service, _provider) = service_with_one_position().await;

    // One-hour interval: the loop sits in its tick wait the whole test.
    let handle = PriceUpdater::new(service, Duration::from_secs(3600)).start();

    tokio::time::timeout(Duration::from_secs(1), handle.stop())
        .await
        .expect("stop must interrupt the pending tick promptly");
}

#[tokio::test]
async fn test_periodic_refresh_updates_prices() {
    let (service, provider) = service_with_one_position().await;
    provider
        .set_quote("TESTSYM", Decimal::from(dec!(130)), "USD")
        .await;

    let handle = PriceUpdater::new(Arc::clone(&service), Duration::from_millis(20)).start();
    tokio::time::sleep(Duration::from_millis(120)).await;
    handle.stop().await;

    let positions = service.list_positions().await;
    assert_eq!(positions[0].current_price, Decimal::from(dec!(130)));
}

#[tokio::test]
async fn test_refresh_errors_do_not_stop_the_loop() {
    let (service, provider) = service_with_one_position().await;

    // Every refresh now fails.
    provider.remove_quote("TESTSYM").await;
    let calls_before = provider.quote_calls();

    let handle = PriceUpdater::new(Arc::clone(&service), Duration::from_millis(20)).start();
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.stop().await;

    // The loop kept ticking through the failures.
    assert!(provider.quote_calls() >= calls_before + 2);
}
