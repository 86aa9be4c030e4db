use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::errors::PortfolioError;
use crate::domain::repository::RepositoryError;

/// Errors carried out to the wire. Status codes are derived by structural
/// inspection of the error chain; the kinds themselves are never rewritten
/// on the way up.
pub enum ApiError {
    /// The request body failed to bind.
    BadRequest(String),
    /// A service operation failed.
    Service(anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        ApiError::Service(err.into())
    }
}

fn status_for(err: &anyhow::Error) -> StatusCode {
    if let Some(PortfolioError::PositionNotFound { .. }) = err.downcast_ref::<PortfolioError>() {
        return StatusCode::NOT_FOUND;
    }
    if let Some(RepositoryError::PortfolioNotFound { .. }) = err.downcast_ref::<RepositoryError>() {
        return StatusCode::NOT_FOUND;
    }
    StatusCode::INTERNAL_SERVER_ERROR
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            // "{:#}" renders the whole context chain on one line.
            ApiError::Service(err) => (status_for(err), format!("{err:#}")),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// JSON body extractor whose rejection is a 400, not axum's default 422:
/// a body that fails to bind is a bad request regardless of whether it was
/// malformed JSON or the wrong shape.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}
