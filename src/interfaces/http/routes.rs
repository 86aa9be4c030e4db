use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, AppState};

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/positions",
            post(handlers::add_position).get(handlers::list_positions),
        )
        .route("/positions/batch", post(handlers::add_positions_batch))
        .route(
            "/positions/{id}",
            get(handlers::get_position).delete(handlers::delete_position),
        )
        .route("/portfolio", get(handlers::get_portfolio))
        .route("/portfolio/refresh", post(handlers::refresh_prices));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(handlers::health))
        .with_state(state)
}
