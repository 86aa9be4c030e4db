mod portfolio_service;
mod position_batch;
mod price_updater;

pub use portfolio_service::{PortfolioService, DEFAULT_PORTFOLIO_NAME};
pub use position_batch::{AddPositionBatchRequest, BatchOutcome, PositionOutcome};
pub use price_updater::{PriceUpdater, PriceUpdaterHandle};
