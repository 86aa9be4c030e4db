use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::application::{AddPositionBatchRequest, BatchOutcome, PortfolioService};
use crate::domain::decimal::Decimal;
use crate::domain::position::Position;

use super::error::{ApiJson, ApiResult};

pub struct AppState {
    pub service: Arc<PortfolioService>,
}

#[derive(Debug, Deserialize)]
pub struct AddPositionRequest {
    pub isin: String,
    pub invested_amount: Decimal,
    pub currency: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    message: String,
}

pub async fn add_position(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<AddPositionRequest>,
) -> ApiResult<(StatusCode, Json<Position>)> {
    let position = state
        .service
        .add_position(&request.isin, request.invested_amount, &request.currency)
        .await
        .inspect_err(|err| error!(isin = %request.isin, error = %err, "Failed to add position"))?;
    Ok((StatusCode::CREATED, Json(position)))
}

pub async fn add_positions_batch(
    State(state): State<Arc<AppState>>,
    ApiJson(requests): ApiJson<Vec<AddPositionBatchRequest>>,
) -> (StatusCode, Json<BatchOutcome>) {
    let outcome = state.service.add_positions_batch(requests).await;
    let status = if outcome.failed.is_empty() {
        StatusCode::CREATED
    } else {
        StatusCode::MULTI_STATUS
    };
    (status, Json(outcome))
}

pub async fn list_positions(State(state): State<Arc<AppState>>) -> Json<Vec<Position>> {
    Json(state.service.list_positions().await)
}

pub async fn get_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Position>> {
    let position = state.service.get_position(&id).await?;
    Ok(Json(position))
}

pub async fn delete_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .service
        .remove_position(&id)
        .await
        .inspect_err(|err| error!(position_id = %id, error = %err, "Failed to delete position"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct PortfolioSummaryResponse {
    pub id: String,
    pub name: String,
    pub positions: Vec<Position>,
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub total_profit_loss: Decimal,
    pub total_profit_loss_percent: Decimal,
    pub created_at: DateTime<Utc>,
}

pub async fn get_portfolio(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<PortfolioSummaryResponse>> {
    let portfolio = state.service.portfolio_summary().await;

    let response = PortfolioSummaryResponse {
        total_value: portfolio.total_value()?,
        total_invested: portfolio.total_invested()?,
        total_profit_loss: portfolio.total_profit_loss()?,
        total_profit_loss_percent: portfolio.total_profit_loss_percent()?,
        id: portfolio.id,
        name: portfolio.name,
        positions: portfolio.positions,
        created_at: portfolio.created_at,
    };
    Ok(Json(response))
}

pub async fn refresh_prices(State(state): State<Arc<AppState>>) -> ApiResult<Json<MessageResponse>> {
    state
        .service
        .refresh_prices()
        .await
        .inspect_err(|err| error!(error = %err, "Failed to refresh prices"))?;
    Ok(Json(MessageResponse {
        message: "prices refreshed successfully".to_string(),
    }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
