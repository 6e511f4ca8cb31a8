//! Results endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use rateit_common::AppResult;
use rateit_core::PostResults;

use crate::{response::ApiResponse, state::AppState};

/// Get the aggregated results for a post.
async fn get_results(
    Path(post_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<PostResults>> {
    let results = state.results_service.compute_results(&post_id).await?;
    Ok(ApiResponse::ok(results))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/results", get(get_results))
}
