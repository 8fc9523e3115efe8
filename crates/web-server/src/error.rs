use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use core_types::ValidationError;
use optimizer::OptimizerError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// The body was not a well-formed optimization request.
    #[error("Malformed request body: {0}")]
    Body(#[from] JsonRejection),
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
    /// The blocking solve task panicked or was cancelled.
    #[error("Solver task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Optimizer(OptimizerError::Validation(err))
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Body(rejection) => {
                tracing::warn!(error = %rejection, "Rejected request body.");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": rejection.body_text() }),
                )
            }
            AppError::Optimizer(OptimizerError::Validation(err)) => {
                tracing::warn!(error = %err, field = %err.field(), "Invalid optimization request.");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": err.to_string(), "field": err.field() }),
                )
            }
            AppError::Optimizer(OptimizerError::Solver(err)) => {
                tracing::error!(error = ?err, "Solver failure.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "The LP solver failed to run" }),
                )
            }
            AppError::Optimizer(OptimizerError::Invariant(message)) => {
                tracing::error!(%message, "Internal invariant violated.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal error occurred while building the plan" }),
                )
            }
            AppError::Join(err) => {
                tracing::error!(error = ?err, "Solver task did not complete.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "The LP solver failed to run" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
