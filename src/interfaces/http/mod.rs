mod error;
mod handlers;
mod routes;

pub use error::{ApiError, ApiJson, ApiResult};
pub use handlers::AppState;
pub use routes::router;
