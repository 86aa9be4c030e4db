pub mod decimal;
pub mod errors;
pub mod instrument;
pub mod portfolio;
pub mod ports;
pub mod position;
pub mod repository;

pub use decimal::{Decimal, DecimalError};
pub use errors::PortfolioError;
pub use instrument::{Instrument, InstrumentType};
pub use portfolio::Portfolio;
pub use position::Position;
pub use repository::{PortfolioRepository, RepositoryError};
