//! Vote endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use rateit_common::AppResult;
use rateit_core::VotePayload;
use serde::Serialize;

use crate::{
    extractors::{BrowserId, ClientIp},
    response::ApiResponse,
    state::AppState,
};

/// Vote response.
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub redirect_to: String,
}

/// Submit a ballot on a post.
async fn submit_vote(
    Path(post_id): Path<String>,
    ClientIp(client_ip): ClientIp,
    BrowserId(browser_id): BrowserId,
    State(state): State<AppState>,
    Json(payload): Json<VotePayload>,
) -> AppResult<ApiResponse<VoteResponse>> {
    let outcome = state
        .vote_service
        .submit_vote(&post_id, &client_ip, browser_id.as_deref(), payload)
        .await?;
    Ok(ApiResponse::ok(VoteResponse {
        redirect_to: outcome.redirect_to,
    }))
}

/// Vote status response.
#[derive(Debug, Serialize)]
pub struct VoteCheckResponse {
    pub has_voted: bool,
    pub voted_at: Option<DateTime<FixedOffset>>,
}

/// Check whether the caller has voted on a post.
async fn check_vote(
    Path(post_id): Path<String>,
    ClientIp(client_ip): ClientIp,
    BrowserId(browser_id): BrowserId,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<VoteCheckResponse>> {
    let status = state
        .vote_service
        .check_vote_status(&post_id, &client_ip, browser_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(VoteCheckResponse {
        has_voted: status.has_voted,
        voted_at: status.voted_at,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/vote", post(submit_vote))
        .route("/{id}/vote-check", get(check_vote))
}
