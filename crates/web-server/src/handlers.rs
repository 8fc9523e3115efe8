use crate::{AppState, error::AppError};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use core_types::OptimizationRequest;
use optimizer::PlanResponse;
use std::sync::Arc;

/// # GET /api/health
pub async fn health() -> &'static str {
    "OK"
}

/// # POST /api/run-model
/// Validates the request, then solves it on the blocking pool so the LP never
/// stalls the async workers.
pub async fn run_model(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OptimizationRequest>, JsonRejection>,
) -> Result<Json<PlanResponse>, AppError> {
    let Json(request) = payload?;
    let spec = state.optimizer.validate(&request)?;

    let optimizer = state.optimizer.clone();
    let plan = tokio::task::spawn_blocking(move || optimizer.run(&spec)).await??;
    Ok(Json(plan))
}
